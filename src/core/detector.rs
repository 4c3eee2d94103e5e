// src/core/detector.rs
//
// One cue pipeline: band-pass the target, correlate against the template,
// validate peaks spectrally and aggregate the survivors.

use std::borrow::Cow;

use thiserror::Error;

use super::analysis::{aggregate, AggregateParams, Correlator, PeakSearch, SpectralValidator};
use super::dsp::BandPass;
use super::signal::Signal;
use super::template::Template;
use crate::config::validation::{non_negative, unit_open_closed};
use crate::config::{
    ConfigError, CorrelationMethod, DetectionConfig, FilterSettings, PeakSettings, SpectralMethod,
};
use crate::detection::{Candidate, CueClass};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("template rate {template} Hz does not match target rate {target} Hz")]
    RateMismatch { template: u32, target: u32 },
}

/// Tunables of a single cue pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub correlation_threshold: f64,
    pub spectral_threshold: f64,
    pub min_distance_seconds: f64,
    pub peaks: PeakSettings,
    pub filter: FilterSettings,
    pub method: CorrelationMethod,
    pub spectral_method: SpectralMethod,
    pub correlation_weight: f64,
    pub min_confidence: f64,
    pub max_detections: Option<usize>,
}

impl DetectionParams {
    /// Validated parameters with default peak, filter and scoring options
    pub fn new(
        correlation_threshold: f64,
        spectral_threshold: f64,
        min_distance_seconds: f64,
    ) -> Result<Self, ConfigError> {
        unit_open_closed("correlation_threshold", correlation_threshold)?;
        unit_open_closed("spectral_threshold", spectral_threshold)?;
        non_negative("min_distance_seconds", min_distance_seconds)?;

        let defaults = DetectionConfig::default();
        Ok(Self {
            correlation_threshold,
            spectral_threshold,
            min_distance_seconds,
            ..Self::for_class(&defaults, CueClass::Go)
        })
    }

    pub fn for_class(config: &DetectionConfig, class: CueClass) -> Self {
        let cue = match class {
            CueClass::Count => &config.count,
            CueClass::Go => &config.go,
        };
        Self {
            correlation_threshold: cue.correlation_threshold,
            spectral_threshold: cue.spectral_threshold,
            min_distance_seconds: config.min_distance_seconds,
            peaks: config.peaks,
            filter: config.filter,
            method: config.method,
            spectral_method: config.spectral_method,
            correlation_weight: config.correlation_weight,
            min_confidence: config.min_confidence,
            max_detections: config.max_detections,
        }
    }

    fn aggregate_params(&self) -> AggregateParams {
        AggregateParams {
            min_distance_seconds: self.min_distance_seconds,
            min_confidence: self.min_confidence,
            max_detections: self.max_detections,
        }
    }
}

/// Spectrally validated peaks before aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScan {
    /// Correlation peaks above threshold
    pub raw_peaks: usize,
    /// Peaks that passed spectral validation, in time order
    pub validated: Vec<Candidate>,
}

/// Band-pass the target around the template band. Falls back to the
/// unfiltered target when the filter output is not finite.
pub fn prepare_target<'a>(target: &'a Signal, template: &Template, filter: &FilterSettings) -> Cow<'a, [f32]> {
    if !filter.enabled {
        return Cow::Borrowed(target.samples());
    }
    let band = template.band();
    let bandpass = BandPass::butterworth(band.low_hz, band.high_hz, filter.order, target.sample_rate());
    match bandpass.filtfilt(target.samples()) {
        Some(filtered) => Cow::Owned(filtered),
        None => Cow::Borrowed(target.samples()),
    }
}

/// Correlate and validate without aggregation
pub fn scan_candidates(
    target: &Signal,
    template: &Template,
    params: &DetectionParams,
) -> Result<CandidateScan, DetectError> {
    if template.sample_rate() != target.sample_rate() {
        return Err(DetectError::RateMismatch {
            template: template.sample_rate(),
            target: target.sample_rate(),
        });
    }

    let rate = target.sample_rate();
    let samples = prepare_target(target, template, &params.filter);

    let correlator = Correlator::new(template.samples());
    let curve = correlator.correlate(&samples, rate, params.method);

    let separation_samples = (params.peaks.separation_seconds * rate as f64).round() as usize;
    let search = PeakSearch {
        threshold: params.correlation_threshold,
        separation_samples,
        min_prominence: params.peaks.min_prominence,
        prominence_window: 2 * template.len() + 1,
        lobe_radius: separation_samples / 2,
    };
    let peaks: Vec<_> = curve.peaks(&search).collect();

    let validator = SpectralValidator::new(
        template.fingerprint(),
        template.len(),
        rate,
        params.spectral_method,
    );
    let starts: Vec<usize> = peaks
        .iter()
        .map(|p| p.refined_index.round().max(0.0) as usize)
        .collect();
    let spectral_scores = validator.score_all(&samples, &starts);

    let validated = peaks
        .iter()
        .zip(spectral_scores)
        .filter(|(_, spectral)| *spectral > params.spectral_threshold)
        .map(|(peak, spectral)| {
            Candidate::new(
                peak.time_seconds(rate),
                peak.score,
                spectral,
                params.correlation_weight,
            )
        })
        .collect();

    Ok(CandidateScan {
        raw_peaks: peaks.len(),
        validated,
    })
}

/// Spectrally validated candidates before duplicate suppression
pub fn detect_raw_candidates(
    target: &Signal,
    template: &Template,
    params: &DetectionParams,
) -> Result<Vec<Candidate>, DetectError> {
    Ok(scan_candidates(target, template, params)?.validated)
}

/// Full single-class detection: one candidate per local time window,
/// in time order.
pub fn detect_candidates(
    target: &Signal,
    template: &Template,
    params: &DetectionParams,
) -> Result<Vec<Candidate>, DetectError> {
    let raw = detect_raw_candidates(target, template, params)?;
    Ok(aggregate(&raw, &params.aggregate_params()))
}

/// Aggregate an existing scan with the same parameters
pub fn aggregate_scan(scan: &CandidateScan, params: &DetectionParams) -> Vec<Candidate> {
    aggregate(&scan.validated, &params.aggregate_params())
}
