// src/core/signal.rs
//
// Immutable mono sample buffer shared by every detection stage.

/// Mono audio at a fixed sample rate.
///
/// A `Signal` is never mutated after construction. Stages that transform audio
/// (filtering, resampling, trimming) return a new `Signal`, so a single buffer
/// can be borrowed by both cue pipelines at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0 for a zero sample rate)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Number of whole samples covered by `seconds`, capped at the signal length
    pub fn samples_for(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        ((seconds * self.sample_rate as f64) as usize).min(self.samples.len())
    }

    /// Copy of the first `seconds` of audio
    pub fn head(&self, seconds: f64) -> Signal {
        let n = self.samples_for(seconds);
        Signal::new(self.samples[..n].to_vec(), self.sample_rate)
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_head() {
        let signal = Signal::new(vec![0.1; 22050], 22050);
        assert!((signal.duration_secs() - 1.0).abs() < 1e-12);

        let head = signal.head(0.25);
        assert_eq!(head.len(), 5512);
        assert_eq!(head.sample_rate(), 22050);

        // Longer than the signal: capped
        assert_eq!(signal.head(5.0).len(), 22050);
        assert!(signal.head(-1.0).is_empty());
    }

    #[test]
    fn test_zero_rate_duration() {
        let signal = Signal::new(vec![0.0; 10], 0);
        assert_eq!(signal.duration_secs(), 0.0);
    }
}
