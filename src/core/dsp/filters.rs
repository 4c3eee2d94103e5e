//! Butterworth band-pass filtering and smoothing utilities

use std::f64::consts::PI;

/// Second-order section (RBJ cookbook, normalized so a0 = 1)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn lowpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 - cos_w) / 2.0 / a0,
            b1: (1.0 - cos_w) / a0,
            b2: (1.0 - cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn highpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 + cos_w) / 2.0 / a0,
            b1: -(1.0 + cos_w) / a0,
            b2: (1.0 + cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Run in place (transposed direct form II, zero initial state)
    fn run(&self, data: &mut [f64]) {
        let mut z1 = 0.0;
        let mut z2 = 0.0;
        for x in data.iter_mut() {
            let input = *x;
            let output = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * output + z2;
            z2 = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// Q factors of the second-order sections of an even-order Butterworth filter
fn butterworth_qs(order: usize) -> Vec<f64> {
    let n = order as f64;
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2.0 * n);
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}

/// Butterworth band-pass built as a high-pass cascade followed by a
/// low-pass cascade, applied forward and backward for zero phase.
#[derive(Debug, Clone)]
pub struct BandPass {
    sections: Vec<Biquad>,
    low_hz: f64,
    high_hz: f64,
}

impl BandPass {
    /// Design a band-pass of the given even order per edge.
    ///
    /// Edges are clamped to (0.1%, 99.9%) of Nyquist. A collapsed band falls
    /// back to 5%..30% of Nyquist.
    pub fn butterworth(low_hz: f64, high_hz: f64, order: usize, sample_rate: u32) -> Self {
        let fs = sample_rate as f64;
        let nyquist = fs / 2.0;

        let mut low_norm = (low_hz / nyquist).clamp(0.001, 0.999);
        let mut high_norm = (high_hz / nyquist).clamp(0.001, 0.999);
        if !(low_norm < high_norm) {
            low_norm = 0.05;
            high_norm = 0.3;
        }

        let low = low_norm * nyquist;
        let high = high_norm * nyquist;
        let order = (order.max(2) / 2) * 2;

        let qs = butterworth_qs(order);
        let mut sections = Vec::with_capacity(qs.len() * 2);
        sections.extend(qs.iter().map(|&q| Biquad::highpass(low, q, fs)));
        sections.extend(qs.iter().map(|&q| Biquad::lowpass(high, q, fs)));

        Self {
            sections,
            low_hz: low,
            high_hz: high,
        }
    }

    /// Effective pass band after clamping
    pub fn band(&self) -> (f64, f64) {
        (self.low_hz, self.high_hz)
    }

    /// Zero-phase filtering with odd-extension padding at both ends.
    ///
    /// Returns `None` when the output is not finite.
    pub fn filtfilt(&self, samples: &[f32]) -> Option<Vec<f32>> {
        let n = samples.len();
        if n < 2 {
            return Some(samples.to_vec());
        }

        let pad = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let first = samples[0] as f64;
        let last = samples[n - 1] as f64;

        let mut data = Vec::with_capacity(n + 2 * pad);
        data.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i] as f64));
        data.extend(samples.iter().map(|&s| s as f64));
        data.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i] as f64));

        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();
        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();

        let out: Vec<f32> = data[pad..pad + n].iter().map(|&x| x as f32).collect();
        if out.iter().all(|x| x.is_finite()) {
            Some(out)
        } else {
            None
        }
    }
}

/// Centered moving average with a zero-padded boxcar (output length = input length)
pub fn moving_average(data: &[f64], window_size: usize) -> Vec<f64> {
    let n = data.len();
    if window_size <= 1 || n == 0 {
        return data.to_vec();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }

    let lead = (window_size - 1) / 2;
    (0..n)
        .map(|i| {
            let end = (i + lead + 1).min(n);
            let start = (i + lead + 1).saturating_sub(window_size);
            (prefix[end] - prefix[start]) / window_size as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / rate as f64).sin() as f32)
            .collect()
    }

    fn rms(x: &[f32]) -> f64 {
        (x.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_butterworth_qs() {
        let qs = butterworth_qs(2);
        assert!((qs[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert_eq!(butterworth_qs(6).len(), 3);
    }

    #[test]
    fn test_bandpass_passes_in_band_tone() {
        let rate = 22050;
        let filter = BandPass::butterworth(760.0, 1000.0, 6, rate);
        let input = tone(880.0, rate, rate as usize);
        let output = filter.filtfilt(&input).unwrap();

        let mid = &output[2000..20000];
        // Edges sit at the -3 dB points, the centre loses a little per pass
        assert!(rms(mid) > 0.4, "in-band rms {}", rms(mid));
    }

    #[test]
    fn test_bandpass_rejects_out_of_band_tone() {
        let rate = 22050;
        let filter = BandPass::butterworth(760.0, 1000.0, 6, rate);
        let input = tone(3000.0, rate, rate as usize);
        let output = filter.filtfilt(&input).unwrap();

        let mid = &output[2000..20000];
        assert!(rms(mid) < 0.01, "out-of-band rms {}", rms(mid));
    }

    #[test]
    fn test_collapsed_band_falls_back() {
        let filter = BandPass::butterworth(9000.0, 8000.0, 4, 22050);
        let (low, high) = filter.band();
        assert!((low - 551.25).abs() < 1e-6);
        assert!((high - 3307.5).abs() < 1e-6);
    }

    #[test]
    fn test_moving_average_same_length() {
        let data = vec![0.0, 0.0, 3.0, 0.0, 0.0];
        let smoothed = moving_average(&data, 3);
        assert_eq!(smoothed.len(), 5);
        assert!((smoothed[1] - 1.0).abs() < 1e-12);
        assert!((smoothed[2] - 1.0).abs() < 1e-12);
        assert!((smoothed[3] - 1.0).abs() < 1e-12);
        assert_eq!(smoothed[0], 0.0);
    }
}
