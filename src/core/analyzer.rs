// src/core/analyzer.rs
//
// High-level detection API with builder pattern. Loads both templates once,
// then runs the count and go pipelines over any number of targets.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use super::decoder::load_signal;
use super::detector::{aggregate_scan, scan_candidates, DetectError, DetectionParams};
use super::dsp::resample;
use super::signal::Signal;
use super::template::{build_template_with, Template, TemplateSettings};
use crate::config::{DetectionConfig, PatternParams, ProfilePreset};
use crate::core::analysis::match_patterns;
use crate::detection::{ClassOutcome, CueClass, DetectionReport, StageFailure, TargetInfo};

/// Builder for [`CueAnalyzer`]
pub struct AnalyzerBuilder {
    config: DetectionConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }

    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn profile(mut self, preset: ProfilePreset) -> Self {
        self.config = DetectionConfig::from_preset(preset);
        self
    }

    pub fn pattern(mut self, pattern: PatternParams) -> Self {
        self.config.pattern = pattern;
        self
    }

    pub fn working_sample_rate(mut self, rate: u32) -> Self {
        self.config.working_sample_rate = rate;
        self
    }

    /// Build from in-memory template clips
    pub fn build_from_signals(self, count: &Signal, go: &Signal) -> Result<CueAnalyzer> {
        self.config.validate().context("Invalid detection configuration")?;
        let count = prepare_class(&self.config, CueClass::Count, count);
        let go = prepare_class(&self.config, CueClass::Go, go);
        Ok(CueAnalyzer {
            config: self.config,
            count,
            go,
        })
    }

    /// Build from template files. A template that fails to load or build is
    /// recorded as a stage failure for its class; only configuration errors
    /// are fatal.
    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(self, count: P, go: Q) -> Result<CueAnalyzer> {
        self.config.validate().context("Invalid detection configuration")?;

        let load = |path: &Path| {
            load_signal(path).map_err(|e| {
                log::warn!("Template {} could not be loaded: {}", path.display(), e);
                StageFailure::TemplateLoad {
                    message: format!("{}: {}", path.display(), e),
                }
            })
        };
        let count = load(count.as_ref())
            .and_then(|clip| prepare_class(&self.config, CueClass::Count, &clip));
        let go = load(go.as_ref()).and_then(|clip| prepare_class(&self.config, CueClass::Go, &clip));
        Ok(CueAnalyzer {
            config: self.config,
            count,
            go,
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn prepare_class(
    config: &DetectionConfig,
    class: CueClass,
    clip: &Signal,
) -> Result<Template, StageFailure> {
    let settings = TemplateSettings::for_class(config, class);
    let template = build_template_with(clip, &settings).map_err(|e| {
        log::warn!("{} template rejected: {}", class, e);
        StageFailure::Template {
            message: e.to_string(),
        }
    })?;

    let band = template.band();
    log::info!(
        "{} template: {:.3} s at {} Hz, band {:.0}-{:.0} Hz, dominant {:?}",
        class,
        template.duration_secs(),
        template.sample_rate(),
        band.low_hz,
        band.high_hz,
        template.fingerprint().dominant_frequencies
    );
    Ok(template)
}

/// Both cue templates plus the configuration that built them
pub struct CueAnalyzer {
    config: DetectionConfig,
    count: Result<Template, StageFailure>,
    go: Result<Template, StageFailure>,
}

impl CueAnalyzer {
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Analyzer with the default configuration
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(count: P, go: Q) -> Result<Self> {
        AnalyzerBuilder::new().build(count, go)
    }

    pub fn from_signals(count: &Signal, go: &Signal) -> Result<Self> {
        AnalyzerBuilder::new().build_from_signals(count, go)
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn template(&self, class: CueClass) -> Result<&Template, &StageFailure> {
        match class {
            CueClass::Count => self.count.as_ref(),
            CueClass::Go => self.go.as_ref(),
        }
    }

    /// Decode and analyze one target file
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<DetectionReport> {
        let path = path.as_ref();
        let signal = load_signal(path)
            .with_context(|| format!("Failed to decode target {}", path.display()))?;
        self.analyze(&signal, Some(path.to_path_buf()))
    }

    pub fn analyze_signal(&self, target: &Signal) -> Result<DetectionReport> {
        self.analyze(target, None)
    }

    fn analyze(&self, target: &Signal, path: Option<PathBuf>) -> Result<DetectionReport> {
        let started = Instant::now();
        let info = TargetInfo {
            path,
            duration_seconds: target.duration_secs(),
            sample_rate: target.sample_rate(),
        };

        let working = resample(target, self.config.working_sample_rate)
            .context("Failed to resample target to the working rate")?;
        log::debug!(
            "Target: {:.2} s at {} Hz, working at {} Hz",
            info.duration_seconds,
            info.sample_rate,
            working.sample_rate()
        );

        let (count, go) = rayon::join(
            || self.run_class(CueClass::Count, &working),
            || self.run_class(CueClass::Go, &working),
        );

        let patterns = match_patterns(&count.candidates, &go.candidates, &self.config.pattern);
        let elapsed = started.elapsed().as_secs_f64();
        log::info!(
            "{} count / {} go candidates, {} patterns in {:.2} s",
            count.candidates.len(),
            go.candidates.len(),
            patterns.len(),
            elapsed
        );

        Ok(DetectionReport::new(
            info,
            count,
            go,
            patterns,
            self.config.clone(),
            elapsed,
        ))
    }

    fn run_class(&self, class: CueClass, target: &Signal) -> ClassOutcome {
        let template = match self.template(class) {
            Ok(t) => t,
            Err(failure) => return ClassOutcome::failed(class, failure.clone()),
        };

        if template.len() > target.len() {
            let failure = StageFailure::TemplateLongerThanTarget {
                template_seconds: template.duration_secs(),
                target_seconds: target.duration_secs(),
            };
            log::warn!("{}: {}", class, failure);
            return ClassOutcome::failed(class, failure);
        }

        let params = DetectionParams::for_class(&self.config, class);
        let scan = match scan_candidates(target, template, &params) {
            Ok(scan) => scan,
            Err(DetectError::RateMismatch { template, target }) => {
                let failure = StageFailure::RateMismatch { template, target };
                log::warn!("{}: {}", class, failure);
                return ClassOutcome::failed(class, failure);
            }
        };
        let candidates = aggregate_scan(&scan, &params);

        log::debug!(
            "{}: {} correlation peaks, {} spectrally valid, {} after aggregation",
            class,
            scan.raw_peaks,
            scan.validated.len(),
            candidates.len()
        );
        for c in &candidates {
            log::debug!(
                "{} at {:.3} s: corr {:.3}, spectral {:.3}, confidence {:.3}",
                class,
                c.time_offset,
                c.correlation_score,
                c.spectral_score,
                c.confidence
            );
        }

        ClassOutcome {
            class,
            candidates,
            raw_peaks: scan.raw_peaks,
            template_seconds: Some(template.duration_secs()),
            band: Some(template.band()),
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileBuilder;
    use crate::testgen::{count_cue, go_cue, write_wav, SceneBuilder};

    fn analyzer() -> CueAnalyzer {
        let config = ProfileBuilder::new()
            .correlation_threshold(0.35)
            .count_template_duration(1.0)
            .build()
            .unwrap();
        AnalyzerBuilder::new()
            .config(config)
            .build_from_signals(&count_cue().render(22050), &go_cue().render(22050))
            .unwrap()
    }

    #[test]
    fn test_single_pattern() {
        let target = SceneBuilder::new(22050, 30.0)
            .seed(7)
            .noise(0.02)
            .cue(&count_cue(), 10.0)
            .cue(&go_cue(), 14.2)
            .build();

        let report = analyzer().analyze_signal(&target).unwrap();
        assert_eq!(report.patterns.len(), 1, "{:?}", report.patterns);
        let p = &report.patterns[0];
        assert_eq!(p.sequence, 1);
        assert!((p.pattern.start() - 10.0).abs() < 0.02);
        assert!((p.pattern.gap_seconds - 4.2).abs() < 0.02);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_target_at_other_rate_is_resampled() {
        let target = SceneBuilder::new(44100, 20.0)
            .seed(3)
            .noise(0.01)
            .cue(&count_cue(), 4.0)
            .cue(&go_cue(), 8.0)
            .build();

        let report = analyzer().analyze_signal(&target).unwrap();
        assert_eq!(report.target.sample_rate, 44100);
        assert_eq!(report.patterns.len(), 1);
        assert!((report.patterns[0].pattern.start() - 4.0).abs() < 0.02);
    }

    #[test]
    fn test_short_target_reports_failure() {
        let target = SceneBuilder::new(22050, 0.3).noise(0.01).build();
        let report = analyzer().analyze_signal(&target).unwrap();
        assert!(report.patterns.is_empty());
        assert!(matches!(
            report.count.failure,
            Some(StageFailure::TemplateLongerThanTarget { .. })
        ));
        assert!(matches!(
            report.go.failure,
            Some(StageFailure::TemplateLongerThanTarget { .. })
        ));
    }

    #[test]
    fn test_silent_template_is_stage_failure() {
        let silent = Signal::new(vec![0.0; 22050], 22050);
        let analyzer = CueAnalyzer::from_signals(&silent, &go_cue().render(22050)).unwrap();
        assert!(matches!(
            analyzer.template(CueClass::Count),
            Err(StageFailure::Template { .. })
        ));

        let target = SceneBuilder::new(22050, 10.0).cue(&go_cue(), 5.0).build();
        let report = analyzer.analyze_signal(&target).unwrap();
        assert!(report.count.is_failed());
        assert!(!report.go.is_failed());
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let go = dir.path().join("go.wav");
        write_wav(&go, &go_cue().render(22050)).unwrap();

        let analyzer = CueAnalyzer::from_files(dir.path().join("missing.wav"), &go).unwrap();
        assert!(matches!(
            analyzer.template(CueClass::Count),
            Err(StageFailure::TemplateLoad { .. })
        ));
        assert!(analyzer.template(CueClass::Go).is_ok());
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = DetectionConfig::default();
        config.count.correlation_threshold = 0.0;
        let result = AnalyzerBuilder::new()
            .config(config)
            .build_from_signals(&count_cue().render(22050), &go_cue().render(22050));
        assert!(result.is_err());
    }
}
