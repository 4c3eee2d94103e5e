// src/core/analysis/spectral.rs
//
// Spectral fingerprinting of templates and corroboration of correlation peaks

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{BandSettings, SpectralMethod};
use crate::core::dsp::{find_peaks, pearson, FftProcessor, PeakCriteria, WindowType};

/// Fraction of the spectral maximum a bin must reach to count as dominant
const DOMINANT_PEAK_FRACTION: f64 = 0.15;
/// Minimum bin separation between dominant peaks
const DOMINANT_PEAK_DISTANCE: usize = 5;
const MAX_DOMINANT: usize = 3;

/// Frequency band in Hz (low < high)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    /// Band used when a template has no usable spectral peak
    pub const FALLBACK: Self = Self {
        low_hz: 800.0,
        high_hz: 1300.0,
    };
    pub const FALLBACK_DOMINANT_HZ: f64 = 1000.0;

    /// Band of `±settings.range_hz` around `center_hz`, clamped to the
    /// configured limits. A band that collapses after clamping is the fallback.
    pub fn around(center_hz: f64, settings: &BandSettings) -> Self {
        let low_hz = settings.min_freq_hz.max(center_hz - settings.range_hz);
        let high_hz = settings.max_freq_hz.min(center_hz + settings.range_hz);
        if low_hz < high_hz {
            Self { low_hz, high_hz }
        } else {
            Self::FALLBACK
        }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    pub fn width(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// Frequency characterization of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralFingerprint {
    /// Up to three dominant frequencies in Hz, strongest last
    pub dominant_frequencies: Vec<f64>,
    pub band: FrequencyBand,
    /// Share of spectral energy inside `band`
    pub band_energy_ratio: f64,
    /// Magnitude spectrum (DC to Nyquist) scaled to a maximum of 1
    #[serde(skip)]
    pub spectrum: Vec<f64>,
}

impl SpectralFingerprint {
    /// Fingerprint a template clip
    pub fn analyze(samples: &[f32], sample_rate: u32, settings: &BandSettings) -> Self {
        let mut fft = FftProcessor::new(samples.len(), WindowType::Rectangular);
        let magnitudes = fft.magnitude_spectrum(samples);
        let max = magnitudes.iter().copied().fold(0.0f64, f64::max);

        // The Nyquist bin is excluded from the peak search
        let search = &magnitudes[..(samples.len() / 2).min(magnitudes.len())];
        let criteria = PeakCriteria {
            min_height: max * DOMINANT_PEAK_FRACTION,
            min_distance: DOMINANT_PEAK_DISTANCE,
            ..Default::default()
        };
        let mut peaks = if max > 0.0 {
            find_peaks(search, &criteria)
        } else {
            Vec::new()
        };

        let (dominant_frequencies, band) = if peaks.is_empty() {
            (
                vec![FrequencyBand::FALLBACK_DOMINANT_HZ],
                FrequencyBand::FALLBACK,
            )
        } else {
            // Stable sort keeps the lower bin first among equal magnitudes
            peaks.sort_by(|&a, &b| magnitudes[a].total_cmp(&magnitudes[b]));
            let top = &peaks[peaks.len().saturating_sub(MAX_DOMINANT)..];
            let freqs: Vec<f64> = top
                .iter()
                .map(|&bin| fft.bin_frequency(bin, sample_rate))
                .collect();
            let primary = freqs[freqs.len() - 1];
            (freqs, FrequencyBand::around(primary, settings))
        };

        let band_energy_ratio = band_energy_ratio(&magnitudes, &fft, sample_rate, &band);
        let spectrum = normalize(magnitudes, max);

        Self {
            dominant_frequencies,
            band,
            band_energy_ratio,
            spectrum,
        }
    }

    pub fn primary_frequency(&self) -> f64 {
        self.dominant_frequencies
            .last()
            .copied()
            .unwrap_or(FrequencyBand::FALLBACK_DOMINANT_HZ)
    }
}

fn normalize(mut magnitudes: Vec<f64>, max: f64) -> Vec<f64> {
    if max > 0.0 {
        magnitudes.iter_mut().for_each(|m| *m /= max);
    }
    magnitudes
}

fn band_energy_ratio(
    magnitudes: &[f64],
    fft: &FftProcessor,
    sample_rate: u32,
    band: &FrequencyBand,
) -> f64 {
    let mut total = 0.0;
    let mut inside = 0.0;
    for (bin, &m) in magnitudes.iter().enumerate() {
        let power = m * m;
        total += power;
        if band.contains(fft.bin_frequency(bin, sample_rate)) {
            inside += power;
        }
    }
    if total > 0.0 {
        inside / total
    } else {
        0.0
    }
}

/// Scores target segments against a template fingerprint
pub struct SpectralValidator<'a> {
    fingerprint: &'a SpectralFingerprint,
    segment_len: usize,
    sample_rate: u32,
    method: SpectralMethod,
}

impl<'a> SpectralValidator<'a> {
    /// `segment_len` is the template length; segments are analyzed with the
    /// same transform size as the template.
    pub fn new(
        fingerprint: &'a SpectralFingerprint,
        segment_len: usize,
        sample_rate: u32,
        method: SpectralMethod,
    ) -> Self {
        Self {
            fingerprint,
            segment_len,
            sample_rate,
            method,
        }
    }

    /// Segment of `target` aligned with a template placed at `start`,
    /// shifted inwards at the edges. `None` when the target is too short.
    pub fn segment<'t>(&self, target: &'t [f32], start: usize) -> Option<&'t [f32]> {
        if self.segment_len == 0 || target.len() < self.segment_len {
            return None;
        }
        let start = start.min(target.len() - self.segment_len);
        Some(&target[start..start + self.segment_len])
    }

    /// Similarity in [0, 1] of `segment` to the template
    pub fn score_with(&self, fft: &mut FftProcessor, segment: &[f32]) -> f64 {
        let magnitudes = fft.magnitude_spectrum(segment);
        let max = magnitudes.iter().copied().fold(0.0f64, f64::max);
        if max <= 0.0 {
            return 0.0;
        }

        let score = match self.method {
            SpectralMethod::MagnitudeCorrelation => {
                let spectrum = normalize(magnitudes, max);
                pearson(&spectrum, &self.fingerprint.spectrum)
            }
            SpectralMethod::BandEnergy => {
                let reference = self.fingerprint.band_energy_ratio;
                if reference <= 0.0 {
                    0.0
                } else {
                    band_energy_ratio(&magnitudes, fft, self.sample_rate, &self.fingerprint.band)
                        / reference
                }
            }
        };

        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn score(&self, segment: &[f32]) -> f64 {
        let mut fft = self.processor();
        self.score_with(&mut fft, segment)
    }

    /// Score many segment start offsets in parallel (output in input order)
    pub fn score_all(&self, target: &[f32], starts: &[usize]) -> Vec<f64> {
        starts
            .par_iter()
            .map_init(
                || self.processor(),
                |fft, &start| match self.segment(target, start) {
                    Some(segment) => self.score_with(fft, segment),
                    None => 0.0,
                },
            )
            .collect()
    }

    fn processor(&self) -> FftProcessor {
        FftProcessor::new(self.segment_len, WindowType::Rectangular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freqs: &[(f64, f64)], rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / rate as f64;
                freqs
                    .iter()
                    .map(|&(f, a)| a * (2.0 * PI * f * t).sin())
                    .sum::<f64>() as f32
            })
            .collect()
    }

    #[test]
    fn test_fingerprint_dominant_frequency_and_band() {
        let rate = 22050;
        let samples = tone(&[(880.0, 1.0), (1760.0, 0.4)], rate, 11025);
        let fp = SpectralFingerprint::analyze(&samples, rate, &BandSettings::default());

        assert!((fp.primary_frequency() - 880.0).abs() < 2.5);
        assert_eq!(fp.dominant_frequencies.len(), 2);
        assert!((fp.band.low_hz - 760.0).abs() < 2.5);
        assert!((fp.band.high_hz - 1000.0).abs() < 2.5);
        assert!(fp.band_energy_ratio > 0.7);
    }

    #[test]
    fn test_silent_template_uses_fallback() {
        let fp = SpectralFingerprint::analyze(&[0.0; 1024], 22050, &BandSettings::default());
        assert_eq!(fp.band, FrequencyBand::FALLBACK);
        assert_eq!(fp.dominant_frequencies, vec![1000.0]);
    }

    #[test]
    fn test_band_clamping() {
        let settings = BandSettings::default();
        let low = FrequencyBand::around(150.0, &settings);
        assert_eq!(low.low_hz, 100.0);
        assert_eq!(low.high_hz, 270.0);

        // Above the limit the band would invert
        assert_eq!(FrequencyBand::around(9000.0, &settings), FrequencyBand::FALLBACK);
    }

    #[test]
    fn test_validator_prefers_matching_spectrum() {
        let rate = 22050;
        let len = 4096;
        let template = tone(&[(1000.0, 1.0)], rate, len);
        let fp = SpectralFingerprint::analyze(&template, rate, &BandSettings::default());

        for method in [SpectralMethod::MagnitudeCorrelation, SpectralMethod::BandEnergy] {
            let validator = SpectralValidator::new(&fp, len, rate, method);
            let same = validator.score(&tone(&[(1000.0, 0.3)], rate, len));
            let other = validator.score(&tone(&[(3000.0, 0.3)], rate, len));
            assert!(same > 0.9, "{:?}: same {}", method, same);
            assert!(other < 0.2, "{:?}: other {}", method, other);
        }
    }

    #[test]
    fn test_segment_bounds() {
        let fp = SpectralFingerprint::analyze(&[0.0; 4], 8000, &BandSettings::default());
        let validator = SpectralValidator::new(&fp, 4, 8000, SpectralMethod::default());
        let target = [0.0f32; 10];
        assert_eq!(validator.segment(&target, 2).map(|s| s.len()), Some(4));
        // Clamped to the last full window
        assert!(validator.segment(&target, 9).is_some());
        assert!(validator.segment(&target[..3], 0).is_none());
    }

    #[test]
    fn test_score_all_matches_sequential() {
        let rate = 8000;
        let template = tone(&[(1000.0, 1.0)], rate, 256);
        let fp = SpectralFingerprint::analyze(&template, rate, &BandSettings::default());
        let validator = SpectralValidator::new(&fp, 256, rate, SpectralMethod::default());
        let target = tone(&[(1000.0, 0.5), (2200.0, 0.5)], rate, 2000);

        let starts = [0, 100, 700, 1744];
        let parallel = validator.score_all(&target, &starts);
        for (&start, &score) in starts.iter().zip(&parallel) {
            let segment = validator.segment(&target, start).unwrap();
            assert_eq!(score, validator.score(segment));
        }
    }
}
