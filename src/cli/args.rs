//! CLI argument parsing with profile support

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{
    ConfigError, CorrelationMethod, DetectionConfig, ProfileBuilder, ProfilePreset, SpectralMethod,
};

/// Report format
#[derive(ValueEnum, Clone, Debug, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// One row per pattern
    Csv,
    /// Full report, machine readable
    Json,
    /// Summary plus one section per pattern
    Markdown,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum MethodArg {
    Auto,
    Direct,
    Fft,
}

impl From<MethodArg> for CorrelationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Auto => Self::Auto,
            MethodArg::Direct => Self::Direct,
            MethodArg::Fft => Self::Fft,
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum SpectralArg {
    /// Correlate normalized magnitude spectra
    Correlation,
    /// Compare in-band energy ratios
    BandEnergy,
}

impl From<SpectralArg> for SpectralMethod {
    fn from(arg: SpectralArg) -> Self {
        match arg {
            SpectralArg::Correlation => Self::MagnitudeCorrelation,
            SpectralArg::BandEnergy => Self::BandEnergy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cuewatch")]
#[command(version)]
#[command(about = "Find count→go cue sequences in long audio recordings")]
pub struct Args {
    /// Target audio files or directories (searched recursively)
    #[arg(required_unless_present = "list_profiles")]
    pub targets: Vec<PathBuf>,

    /// Reference clip of the "count" cue
    #[arg(short, long, env = "CUEWATCH_COUNT_TEMPLATE", required_unless_present = "list_profiles")]
    pub count_template: Option<PathBuf>,

    /// Reference clip of the "go" cue
    #[arg(short, long, env = "CUEWATCH_GO_TEMPLATE", required_unless_present = "list_profiles")]
    pub go_template: Option<PathBuf>,

    /// Detection profile
    #[arg(short, long, env = "CUEWATCH_PROFILE", default_value = "standard")]
    pub profile: ProfilePreset,

    /// JSON configuration file (replaces the profile). Defaults to
    /// `cuewatch/config.json` in the user config directory when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Ignore the user configuration file
    #[arg(long)]
    pub no_user_config: bool,

    /// Correlation threshold for both cues
    #[arg(long)]
    pub correlation_threshold: Option<f64>,

    /// Spectral threshold for both cues
    #[arg(long)]
    pub spectral_threshold: Option<f64>,

    /// Seconds of the count clip used as template
    #[arg(long)]
    pub count_duration: Option<f64>,

    /// Seconds of the go clip used as template
    #[arg(long)]
    pub go_duration: Option<f64>,

    /// Minimum count→go gap in seconds
    #[arg(long)]
    pub min_gap: Option<f64>,

    /// Maximum count→go gap in seconds
    #[arg(long)]
    pub max_gap: Option<f64>,

    /// Detections of one cue closer than this are merged
    #[arg(long)]
    pub min_distance: Option<f64>,

    /// Patterns starting within this many seconds compete
    #[arg(long)]
    pub overlap_window: Option<f64>,

    /// Keep at most N detections per cue
    #[arg(long)]
    pub max_detections: Option<usize>,

    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    #[arg(long, value_enum)]
    pub spectral_method: Option<SpectralArg>,

    /// Disable the band-pass prefilter
    #[arg(long)]
    pub no_filter: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write one report per target into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Known count cue times for evaluation, e.g. --expect 10.0,42.5
    #[arg(long, value_delimiter = ',')]
    pub expect: Vec<f64>,

    /// Match tolerance for --expect, in seconds
    #[arg(long, default_value_t = 0.5)]
    pub tolerance: f64,

    /// Write the effective configuration as JSON and continue
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// List available profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Verbose output (per-candidate detail, debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Profile or config file, then individual overrides
    pub fn detection_config(&self) -> Result<DetectionConfig, ConfigError> {
        let base = match self.config_path() {
            Some(path) => DetectionConfig::load_json(&path)?,
            None => DetectionConfig::from_preset(self.profile),
        };
        if !self.has_overrides() {
            base.validate()?;
            return Ok(base);
        }

        let mut builder = ProfileBuilder::from_config(base);
        if let Some(v) = self.correlation_threshold {
            builder = builder.correlation_threshold(v);
        }
        if let Some(v) = self.spectral_threshold {
            builder = builder.spectral_threshold(v);
        }
        if let Some(v) = self.count_duration {
            builder = builder.count_template_duration(v);
        }
        if let Some(v) = self.go_duration {
            builder = builder.go_template_duration(v);
        }
        if let Some(v) = self.min_gap {
            builder = builder.min_gap(v);
        }
        if let Some(v) = self.max_gap {
            builder = builder.max_gap(v);
        }
        if let Some(v) = self.min_distance {
            builder = builder.min_distance(v);
        }
        if let Some(v) = self.overlap_window {
            builder = builder.overlap_window(v);
        }
        if self.max_detections.is_some() {
            builder = builder.max_detections(self.max_detections);
        }
        if let Some(m) = self.method {
            builder = builder.method(m.into());
        }
        if let Some(m) = self.spectral_method {
            builder = builder.spectral_method(m.into());
        }
        if self.no_filter {
            builder = builder.band_filter(false);
        }

        builder.build()
    }

    /// Explicit `--config`, else the user config file if it exists
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        if self.no_user_config {
            return None;
        }
        user_config_path().filter(|p| p.is_file())
    }

    fn has_overrides(&self) -> bool {
        self.correlation_threshold.is_some()
            || self.spectral_threshold.is_some()
            || self.count_duration.is_some()
            || self.go_duration.is_some()
            || self.min_gap.is_some()
            || self.max_gap.is_some()
            || self.min_distance.is_some()
            || self.overlap_window.is_some()
            || self.max_detections.is_some()
            || self.method.is_some()
            || self.spectral_method.is_some()
            || self.no_filter
    }
}

/// `<config dir>/cuewatch/config.json`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cuewatch").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("cuewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_minimal() {
        let args = parse(&["-c", "count.wav", "-g", "go.wav", "--no-user-config", "show.wav"]);
        assert_eq!(args.targets, vec![PathBuf::from("show.wav")]);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.profile, ProfilePreset::Standard);

        let config = args.detection_config().unwrap();
        assert_eq!(config, DetectionConfig::default());
    }

    #[test]
    fn test_list_profiles_needs_nothing_else() {
        let args = parse(&["--list-profiles"]);
        assert!(args.list_profiles);
        assert!(args.targets.is_empty());
    }

    #[test]
    fn test_templates_required() {
        assert!(Args::try_parse_from(["cuewatch", "show.wav"]).is_err());
    }

    #[test]
    fn test_profile_and_overrides() {
        let args = parse(&[
            "-c", "c.wav", "-g", "g.wav",
            "--profile", "noisy-live",
            "--correlation-threshold", "0.5",
            "--min-gap", "1.5",
            "--no-filter",
            "--format", "csv",
            "--expect", "10.0,42.5",
            "t.wav",
        ]);
        assert_eq!(args.profile, ProfilePreset::NoisyLive);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.expect, vec![10.0, 42.5]);

        let config = args.detection_config().unwrap();
        assert_eq!(config.preset, ProfilePreset::Custom);
        assert_eq!(config.count.correlation_threshold, 0.5);
        assert_eq!(config.go.correlation_threshold, 0.5);
        assert_eq!(config.pattern.min_gap_seconds, 1.5);
        assert!(!config.filter.enabled);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = parse(&["-c", "c.wav", "-g", "g.wav", "--correlation-threshold", "1.5", "t.wav"]);
        assert!(matches!(
            args.detection_config(),
            Err(ConfigError::OutOfRange { field: "correlation_threshold", .. })
        ));

        let args = parse(&["-c", "c.wav", "-g", "g.wav", "--min-gap", "12", "t.wav"]);
        assert!(matches!(args.detection_config(), Err(ConfigError::GapOrder { .. })));
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, r#"{"min_distance_seconds": 1.5, "go": {"spectral_threshold": 0.3}}"#).unwrap();

        let path_arg = path.display().to_string();
        let args = parse(&["-c", "c.wav", "-g", "g.wav", "--config", path_arg.as_str(), "t.wav"]);
        assert_eq!(args.config_path(), Some(path.clone()));
        let config = args.detection_config().unwrap();
        assert_eq!(config.min_distance_seconds, 1.5);
        assert_eq!(config.go.spectral_threshold, 0.3);
        assert_eq!(config.count.spectral_threshold, 0.12);
    }

    #[test]
    fn test_unknown_profile() {
        assert!(Args::try_parse_from(["cuewatch", "-c", "c", "-g", "g", "--profile", "loud", "t"]).is_err());
    }
}
