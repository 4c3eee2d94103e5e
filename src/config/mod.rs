//! Detection configuration and presets
//!
//! Every tunable of the pipeline lives in [`DetectionConfig`]. A config is
//! validated once (on construction through a preset, builder or file) and is
//! then passed read-only to each stage.

mod profiles;
pub(crate) mod validation;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

pub use profiles::{ProfileBuilder, ProfilePreset};
pub use validation::ConfigError;

use validation::{non_negative, positive, unit_closed, unit_open, unit_open_closed};

/// Per-class detection settings (one for the count cue, one for the go cue)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueConfig {
    /// Minimum normalized correlation for a raw peak (exclusive)
    pub correlation_threshold: f64,
    /// Minimum spectral similarity for a candidate (exclusive)
    pub spectral_threshold: f64,
    /// Length of the reference clip used as template
    pub template_duration_seconds: f64,
    /// Envelope fraction below which template edges count as silence
    pub silence_threshold: f64,
}

impl CueConfig {
    pub fn count() -> Self {
        Self {
            correlation_threshold: 0.32,
            spectral_threshold: 0.12,
            template_duration_seconds: 2.5,
            silence_threshold: 0.02,
        }
    }

    pub fn go() -> Self {
        Self {
            correlation_threshold: 0.32,
            spectral_threshold: 0.18,
            template_duration_seconds: 0.5,
            silence_threshold: 0.02,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        unit_open_closed("correlation_threshold", self.correlation_threshold)?;
        unit_open_closed("spectral_threshold", self.spectral_threshold)?;
        positive("template_duration_seconds", self.template_duration_seconds)?;
        unit_open("silence_threshold", self.silence_threshold)?;
        Ok(())
    }
}

/// Partially specified cue settings from a config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CueOverrides {
    correlation_threshold: Option<f64>,
    spectral_threshold: Option<f64>,
    template_duration_seconds: Option<f64>,
    silence_threshold: Option<f64>,
}

impl CueOverrides {
    fn apply(self, base: CueConfig) -> CueConfig {
        CueConfig {
            correlation_threshold: self.correlation_threshold.unwrap_or(base.correlation_threshold),
            spectral_threshold: self.spectral_threshold.unwrap_or(base.spectral_threshold),
            template_duration_seconds: self
                .template_duration_seconds
                .unwrap_or(base.template_duration_seconds),
            silence_threshold: self.silence_threshold.unwrap_or(base.silence_threshold),
        }
    }
}

fn count_cue<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CueConfig, D::Error> {
    Ok(CueOverrides::deserialize(deserializer)?.apply(CueConfig::count()))
}

fn go_cue<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CueConfig, D::Error> {
    Ok(CueOverrides::deserialize(deserializer)?.apply(CueConfig::go()))
}

/// Frequency band derived around a template's dominant frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandSettings {
    /// Half-width of the band around the dominant frequency
    pub range_hz: f64,
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
}

impl Default for BandSettings {
    fn default() -> Self {
        Self {
            range_hz: 120.0,
            min_freq_hz: 100.0,
            max_freq_hz: 8000.0,
        }
    }
}

impl BandSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("band.range_hz", self.range_hz)?;
        positive("band.min_freq_hz", self.min_freq_hz)?;
        positive("band.max_freq_hz", self.max_freq_hz)?;
        if self.min_freq_hz >= self.max_freq_hz {
            return Err(ConfigError::BandOrder {
                min: self.min_freq_hz,
                max: self.max_freq_hz,
            });
        }
        Ok(())
    }
}

/// Band-pass applied to the target before correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub enabled: bool,
    /// Butterworth order per band edge
    pub order: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 6,
        }
    }
}

impl FilterSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.order % 2 != 0 || !(2..=12).contains(&self.order) {
            return Err(ConfigError::FilterOrder(self.order));
        }
        Ok(())
    }
}

/// Coarse peak picking on the correlation curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSettings {
    /// Minimum separation between raw peaks
    pub separation_seconds: f64,
    pub min_prominence: f64,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            separation_seconds: 0.05,
            min_prominence: 0.02,
        }
    }
}

impl PeakSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("peaks.separation_seconds", self.separation_seconds)?;
        non_negative("peaks.min_prominence", self.min_prominence)?;
        Ok(())
    }
}

/// Gap and overlap constraints of the pattern matcher
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub min_gap_seconds: f64,
    pub max_gap_seconds: f64,
    pub overlap_window_seconds: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            min_gap_seconds: 2.0,
            max_gap_seconds: 10.0,
            overlap_window_seconds: 15.0,
        }
    }
}

impl PatternParams {
    pub fn new(
        min_gap_seconds: f64,
        max_gap_seconds: f64,
        overlap_window_seconds: f64,
    ) -> Result<Self, ConfigError> {
        let params = Self {
            min_gap_seconds,
            max_gap_seconds,
            overlap_window_seconds,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("min_gap_seconds", self.min_gap_seconds)?;
        non_negative("max_gap_seconds", self.max_gap_seconds)?;
        non_negative("overlap_window_seconds", self.overlap_window_seconds)?;
        if self.max_gap_seconds < self.min_gap_seconds {
            return Err(ConfigError::GapOrder {
                min: self.min_gap_seconds,
                max: self.max_gap_seconds,
            });
        }
        Ok(())
    }
}

/// How the correlation curve is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Direct for small problems, FFT otherwise
    #[default]
    Auto,
    Direct,
    Fft,
}

/// How a segment's spectrum is compared with the template's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralMethod {
    /// Pearson correlation of max-normalized magnitude spectra
    #[default]
    MagnitudeCorrelation,
    /// In-band energy fraction relative to the template's
    BandEnergy,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Profile name (informational)
    pub name: String,
    pub preset: ProfilePreset,
    #[serde(deserialize_with = "count_cue")]
    pub count: CueConfig,
    #[serde(deserialize_with = "go_cue")]
    pub go: CueConfig,
    pub pattern: PatternParams,
    /// Candidates of one class closer than this are duplicates
    pub min_distance_seconds: f64,
    /// Rate every template and target is resampled to
    pub working_sample_rate: u32,
    pub band: BandSettings,
    pub filter: FilterSettings,
    pub peaks: PeakSettings,
    /// Weight of the correlation score in candidate confidence
    pub correlation_weight: f64,
    pub method: CorrelationMethod,
    pub spectral_method: SpectralMethod,
    /// Candidates below this confidence are dropped
    pub min_confidence: f64,
    /// Keep at most this many candidates per class (most confident first)
    pub max_detections: Option<usize>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::from_preset(ProfilePreset::Standard)
    }
}

impl DetectionConfig {
    /// Check every field; the first violation is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.count.validate()?;
        self.go.validate()?;
        self.pattern.validate()?;
        non_negative("min_distance_seconds", self.min_distance_seconds)?;
        if self.working_sample_rate == 0 {
            return Err(ConfigError::OutOfRange {
                field: "working_sample_rate",
                value: 0.0,
                expected: "x > 0",
            });
        }
        self.band.validate()?;
        self.filter.validate()?;
        self.peaks.validate()?;
        unit_closed("correlation_weight", self.correlation_weight)?;
        unit_closed("min_confidence", self.min_confidence)?;
        Ok(())
    }

    /// Read and validate a JSON config; missing fields take their defaults
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
