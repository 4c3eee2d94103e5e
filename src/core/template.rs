// src/core/template.rs
//
// Turns a reference clip into a detection template: trim, strip silence,
// resample to the working rate and fingerprint the spectrum.

use thiserror::Error;

use super::analysis::{FrequencyBand, SpectralFingerprint};
use super::dsp::{hilbert_envelope, moving_average, resample, ResampleError};
use super::signal::Signal;
use crate::config::{BandSettings, DetectionConfig};
use crate::detection::CueClass;

/// Audio kept before the first sample above the silence threshold
const ONSET_BUFFER_SECONDS: f64 = 0.005;
/// The envelope is smoothed over `len / ENVELOPE_SMOOTHING_DIVISOR` samples
const ENVELOPE_SMOOTHING_DIVISOR: usize = 50;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template has no audio above {threshold} of its peak envelope")]
    Empty { threshold: f64 },

    #[error("invalid template duration: {0} s")]
    InvalidDuration(f64),

    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// Settings for [`build_template_with`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateSettings {
    pub duration_seconds: f64,
    pub silence_threshold: f64,
    pub working_sample_rate: u32,
    pub band: BandSettings,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            duration_seconds: 0.5,
            silence_threshold: 0.02,
            working_sample_rate: 22050,
            band: BandSettings::default(),
        }
    }
}

impl TemplateSettings {
    pub fn for_class(config: &DetectionConfig, class: CueClass) -> Self {
        let cue = match class {
            CueClass::Count => &config.count,
            CueClass::Go => &config.go,
        };
        Self {
            duration_seconds: cue.template_duration_seconds,
            silence_threshold: cue.silence_threshold,
            working_sample_rate: config.working_sample_rate,
            band: config.band,
        }
    }
}

/// Preprocessed reference clip at the working rate
#[derive(Debug, Clone)]
pub struct Template {
    signal: Signal,
    fingerprint: SpectralFingerprint,
    source_sample_rate: u32,
    onset_trim_samples: usize,
}

impl Template {
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn samples(&self) -> &[f32] {
        self.signal.samples()
    }

    pub fn sample_rate(&self) -> u32 {
        self.signal.sample_rate()
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.signal.duration_secs()
    }

    pub fn fingerprint(&self) -> &SpectralFingerprint {
        &self.fingerprint
    }

    pub fn band(&self) -> FrequencyBand {
        self.fingerprint.band
    }

    /// Rate of the clip the template was built from
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Leading samples (at the source rate) removed as silence
    pub fn onset_trim_samples(&self) -> usize {
        self.onset_trim_samples
    }
}

/// Build a template with default working rate and band settings
pub fn build_template(
    signal: &Signal,
    duration_seconds: f64,
    silence_threshold: f64,
) -> Result<Template, TemplateError> {
    let settings = TemplateSettings {
        duration_seconds,
        silence_threshold,
        ..Default::default()
    };
    build_template_with(signal, &settings)
}

pub fn build_template_with(
    signal: &Signal,
    settings: &TemplateSettings,
) -> Result<Template, TemplateError> {
    if !settings.duration_seconds.is_finite() || settings.duration_seconds <= 0.0 {
        return Err(TemplateError::InvalidDuration(settings.duration_seconds));
    }

    let head = signal.head(settings.duration_seconds);
    let (start, end) = active_region(&head, settings.silence_threshold).ok_or(
        TemplateError::Empty {
            threshold: settings.silence_threshold,
        },
    )?;

    let trimmed = Signal::new(head.samples()[start..end].to_vec(), head.sample_rate());
    let working = resample(&trimmed, settings.working_sample_rate)?;
    if working.is_empty() {
        return Err(TemplateError::Empty {
            threshold: settings.silence_threshold,
        });
    }

    let fingerprint =
        SpectralFingerprint::analyze(working.samples(), working.sample_rate(), &settings.band);

    Ok(Template {
        signal: working,
        fingerprint,
        source_sample_rate: signal.sample_rate(),
        onset_trim_samples: start,
    })
}

/// `[start, end)` of the non-silent part, including the onset buffer
fn active_region(signal: &Signal, threshold: f64) -> Option<(usize, usize)> {
    let samples = signal.samples();
    if samples.is_empty() {
        return None;
    }

    let envelope = hilbert_envelope(samples);
    let window = (envelope.len() / ENVELOPE_SMOOTHING_DIVISOR).max(1);
    let envelope = moving_average(&envelope, window);

    let peak = envelope.iter().copied().fold(0.0f64, f64::max);
    let level = peak * threshold;

    let first = envelope.iter().position(|&e| e > level)?;
    let last = envelope.iter().rposition(|&e| e > level)?;

    let buffer = (ONSET_BUFFER_SECONDS * signal.sample_rate() as f64) as usize;
    Some((first.saturating_sub(buffer), last + 1))
}
