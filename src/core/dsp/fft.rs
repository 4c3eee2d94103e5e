//! FFT processing with windowing

use realfft::RealFftPlanner;
use num_complex::Complex;
use rustfft::FftPlanner;
use super::windows::{WindowType, create_window};

/// Real-input FFT with a fixed window
pub struct FftProcessor {
    planner: RealFftPlanner<f64>,
    window: Vec<f64>,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(fft_size: usize, window_type: WindowType) -> Self {
        let window = create_window(fft_size, window_type);
        Self {
            planner: RealFftPlanner::new(),
            window,
            fft_size,
        }
    }

    /// Compute magnitude spectrum (`fft_size / 2 + 1` bins, DC to Nyquist)
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f64> {
        if self.fft_size == 0 {
            return Vec::new();
        }

        let r2c = self.planner.plan_fft_forward(self.fft_size);
        let mut input = r2c.make_input_vec();
        for (slot, (&s, &w)) in input.iter_mut().zip(samples.iter().zip(&self.window)) {
            *slot = s as f64 * w;
        }
        let mut spectrum = r2c.make_output_vec();

        // Buffers come from the plan itself, so lengths always match
        if r2c.process(&mut input, &mut spectrum).is_err() {
            return vec![0.0; self.fft_size / 2 + 1];
        }

        spectrum.iter().map(|c| c.norm()).collect()
    }

    /// Frequency in Hz of a bin
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f64 {
        bin as f64 * sample_rate as f64 / self.fft_size as f64
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

/// Analytic signal via the FFT method (DC and Nyquist kept, positive bins
/// doubled, negative bins zeroed)
pub fn analytic_signal(samples: &[f32]) -> Vec<Complex<f64>> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .collect();
    forward.process(&mut buffer);

    let half = n / 2;
    let last_positive = if n % 2 == 0 { half } else { half + 1 };
    for bin in buffer.iter_mut().take(last_positive).skip(1) {
        *bin *= 2.0;
    }
    for bin in buffer.iter_mut().skip(half + 1) {
        *bin = Complex::new(0.0, 0.0);
    }

    inverse.process(&mut buffer);

    let scale = 1.0 / n as f64;
    buffer.iter_mut().for_each(|c| *c *= scale);
    buffer
}

/// Instantaneous amplitude (Hilbert magnitude)
pub fn hilbert_envelope(samples: &[f32]) -> Vec<f64> {
    analytic_signal(samples).iter().map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_magnitude_peak_bin() {
        let rate = 8000;
        let n = 800;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 1000.0 * i as f64 / rate as f64).sin() as f32)
            .collect();

        let mut fft = FftProcessor::new(n, WindowType::Hann);
        let mags = fft.magnitude_spectrum(&samples);
        assert_eq!(mags.len(), n / 2 + 1);

        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((fft.bin_frequency(peak, rate) - 1000.0).abs() < 10.1);
    }

    #[test]
    fn test_envelope_of_steady_tone() {
        let samples: Vec<f32> = (0..2048)
            .map(|i| (0.5 * (2.0 * PI * 64.0 * i as f64 / 2048.0).sin()) as f32)
            .collect();
        let env = hilbert_envelope(&samples);

        // Away from the edges the envelope is the amplitude
        for &e in &env[256..1792] {
            assert!((e - 0.5).abs() < 0.01, "envelope {}", e);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(hilbert_envelope(&[]).is_empty());
    }
}
