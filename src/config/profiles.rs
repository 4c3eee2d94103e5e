// src/config/profiles.rs
//
// Named detection presets for common recording conditions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    BandSettings, ConfigError, CorrelationMethod, CueConfig, DetectionConfig, FilterSettings,
    PatternParams, PeakSettings, SpectralMethod,
};

/// Preset profiles for common use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    /// Balanced defaults for long recordings with background noise
    Standard,
    /// Strict single-cue thresholds, short templates
    Original,
    /// High thresholds, few detections
    Conservative,
    /// Lower thresholds, closer spacing
    Sensitive,
    /// Lowest thresholds, catches faint cues
    Aggressive,
    /// Clean recordings, tight frequency band
    StudioQuality,
    /// Live recordings with crowd noise, wide band
    NoisyLive,
    /// User-defined settings
    Custom,
}

impl ProfilePreset {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Standard,
            Self::Original,
            Self::Conservative,
            Self::Sensitive,
            Self::Aggressive,
            Self::StudioQuality,
            Self::NoisyLive,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Original => "original",
            Self::Conservative => "conservative",
            Self::Sensitive => "sensitive",
            Self::Aggressive => "aggressive",
            Self::StudioQuality => "studio_quality",
            Self::NoisyLive => "noisy_live",
            Self::Custom => "custom",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Balanced defaults for long, noisy recordings",
            Self::Original => "Strict thresholds with short templates",
            Self::Conservative => "Higher thresholds, at most 15 detections per cue",
            Self::Sensitive => "Lower thresholds, at most 25 detections per cue",
            Self::Aggressive => "Lowest thresholds, at most 30 detections per cue",
            Self::StudioQuality => "Clean audio, strong spectral match, narrow band",
            Self::NoisyLive => "Background noise tolerance, wider band",
            Self::Custom => "User-defined settings",
        }
    }
}

impl fmt::Display for ProfilePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfilePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .into_iter()
            .chain(std::iter::once(Self::Custom))
            .find(|p| p.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownProfile(s.to_string()))
    }
}

impl DetectionConfig {
    /// Create configuration from preset
    pub fn from_preset(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::Standard | ProfilePreset::Custom => Self::standard(preset),
            ProfilePreset::Original => Self::standard(preset).single_cue(0.8, 0.6, 0.5, 0.5),
            ProfilePreset::Conservative => {
                let mut config = Self::standard(preset).single_cue(0.85, 0.65, 1.0, 0.5);
                config.max_detections = Some(15);
                config
            }
            ProfilePreset::Sensitive => {
                let mut config = Self::standard(preset).single_cue(0.7, 0.5, 0.3, 0.5);
                config.max_detections = Some(25);
                config
            }
            ProfilePreset::Aggressive => {
                let mut config = Self::standard(preset).single_cue(0.6, 0.4, 0.2, 0.5);
                config.max_detections = Some(30);
                config
            }
            ProfilePreset::StudioQuality => {
                let mut config = Self::standard(preset).single_cue(0.85, 0.7, 0.8, 0.4);
                config.band.range_hz = 100.0;
                config
            }
            ProfilePreset::NoisyLive => {
                let mut config = Self::standard(preset).single_cue(0.65, 0.45, 0.4, 0.6);
                config.band.range_hz = 150.0;
                config
            }
        }
    }

    fn standard(preset: ProfilePreset) -> Self {
        Self {
            name: preset.name().to_string(),
            preset,
            count: CueConfig::count(),
            go: CueConfig::go(),
            pattern: PatternParams::default(),
            min_distance_seconds: 3.0,
            working_sample_rate: 22050,
            band: BandSettings::default(),
            filter: FilterSettings::default(),
            peaks: PeakSettings::default(),
            correlation_weight: 0.7,
            method: CorrelationMethod::Auto,
            spectral_method: SpectralMethod::MagnitudeCorrelation,
            min_confidence: 0.0,
            max_detections: None,
        }
    }

    /// Apply single-cue thresholds to both classes. The go template takes
    /// the preset duration; the longer count template keeps its default.
    fn single_cue(
        mut self,
        correlation_threshold: f64,
        spectral_threshold: f64,
        min_distance_seconds: f64,
        go_duration_seconds: f64,
    ) -> Self {
        for cue in [&mut self.count, &mut self.go] {
            cue.correlation_threshold = correlation_threshold;
            cue.spectral_threshold = spectral_threshold;
        }
        self.go.template_duration_seconds = go_duration_seconds;
        self.min_distance_seconds = min_distance_seconds;
        self
    }
}

/// Builder for custom configurations
pub struct ProfileBuilder {
    config: DetectionConfig,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }

    pub fn from_preset(preset: ProfilePreset) -> Self {
        Self {
            config: DetectionConfig::from_preset(preset),
        }
    }

    pub fn from_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Correlation threshold for both cue classes
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.config.count.correlation_threshold = threshold;
        self.config.go.correlation_threshold = threshold;
        self
    }

    /// Spectral threshold for both cue classes
    pub fn spectral_threshold(mut self, threshold: f64) -> Self {
        self.config.count.spectral_threshold = threshold;
        self.config.go.spectral_threshold = threshold;
        self
    }

    pub fn count(mut self, cue: CueConfig) -> Self {
        self.config.count = cue;
        self
    }

    pub fn go(mut self, cue: CueConfig) -> Self {
        self.config.go = cue;
        self
    }

    pub fn count_template_duration(mut self, seconds: f64) -> Self {
        self.config.count.template_duration_seconds = seconds;
        self
    }

    pub fn go_template_duration(mut self, seconds: f64) -> Self {
        self.config.go.template_duration_seconds = seconds;
        self
    }

    pub fn min_distance(mut self, seconds: f64) -> Self {
        self.config.min_distance_seconds = seconds;
        self
    }

    pub fn gap_range(mut self, min_seconds: f64, max_seconds: f64) -> Self {
        self.config.pattern.min_gap_seconds = min_seconds;
        self.config.pattern.max_gap_seconds = max_seconds;
        self
    }

    pub fn min_gap(mut self, seconds: f64) -> Self {
        self.config.pattern.min_gap_seconds = seconds;
        self
    }

    pub fn max_gap(mut self, seconds: f64) -> Self {
        self.config.pattern.max_gap_seconds = seconds;
        self
    }

    pub fn overlap_window(mut self, seconds: f64) -> Self {
        self.config.pattern.overlap_window_seconds = seconds;
        self
    }

    pub fn working_sample_rate(mut self, rate: u32) -> Self {
        self.config.working_sample_rate = rate;
        self
    }

    pub fn band_range(mut self, range_hz: f64) -> Self {
        self.config.band.range_hz = range_hz;
        self
    }

    pub fn band_filter(mut self, enabled: bool) -> Self {
        self.config.filter.enabled = enabled;
        self
    }

    pub fn filter_order(mut self, order: usize) -> Self {
        self.config.filter.order = order;
        self
    }

    pub fn method(mut self, method: CorrelationMethod) -> Self {
        self.config.method = method;
        self
    }

    pub fn spectral_method(mut self, method: SpectralMethod) -> Self {
        self.config.spectral_method = method;
        self
    }

    pub fn correlation_weight(mut self, weight: f64) -> Self {
        self.config.correlation_weight = weight;
        self
    }

    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.config.min_confidence = threshold;
        self
    }

    pub fn max_detections(mut self, limit: Option<usize>) -> Self {
        self.config.max_detections = limit;
        self
    }

    /// Validate and return the configuration
    pub fn build(mut self) -> Result<DetectionConfig, ConfigError> {
        self.config.preset = ProfilePreset::Custom;
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
