//! Detection result types: candidates, patterns and the per-file report

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::evaluation::{evaluate, EvaluationSummary};
use crate::config::DetectionConfig;
use crate::core::analysis::FrequencyBand;
use crate::core::dsp::Summary;

/// The two cue types a recording is searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueClass {
    Count,
    Go,
}

impl CueClass {
    pub fn all() -> [Self; 2] {
        [Self::Count, Self::Go]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Go => "go",
        }
    }
}

impl fmt::Display for CueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse confidence rating used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 0.7 => ConfidenceLevel::High,
            c if c >= 0.45 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "●",
            ConfidenceLevel::Medium => "◐",
            ConfidenceLevel::Low => "○",
        }
    }
}

/// One detected occurrence of a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Seconds from the start of the target (sub-sample refined, >= 0)
    pub time_offset: f64,
    pub correlation_score: f64,
    pub spectral_score: f64,
    pub confidence: f64,
}

impl Candidate {
    /// Confidence is the weighted geometric mean
    /// `correlation^w * spectral^(1 - w)`.
    pub fn new(
        time_offset: f64,
        correlation_score: f64,
        spectral_score: f64,
        correlation_weight: f64,
    ) -> Self {
        let correlation_score = correlation_score.clamp(0.0, 1.0);
        let spectral_score = spectral_score.clamp(0.0, 1.0);
        let w = correlation_weight.clamp(0.0, 1.0);
        let confidence = correlation_score.powf(w) * spectral_score.powf(1.0 - w);
        Self {
            time_offset: time_offset.max(0.0),
            correlation_score,
            spectral_score,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A count cue paired with a following go cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub count: Candidate,
    pub go: Candidate,
    pub gap_seconds: f64,
    pub confidence: f64,
}

impl Pattern {
    /// Gap is `go - count`; confidence is the geometric mean of both.
    pub fn new(count: Candidate, go: Candidate) -> Self {
        Self {
            count,
            go,
            gap_seconds: go.time_offset - count.time_offset,
            confidence: (count.confidence * go.confidence).sqrt(),
        }
    }

    pub fn start(&self) -> f64 {
        self.count.time_offset
    }
}

/// A pattern with its 1-based position in the report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencedPattern {
    pub sequence: usize,
    #[serde(flatten)]
    pub pattern: Pattern,
}

/// Why a cue class produced no candidates
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    #[error("template could not be loaded: {message}")]
    TemplateLoad { message: String },

    #[error("template could not be built: {message}")]
    Template { message: String },

    #[error("template ({template_seconds:.3} s) is longer than the target ({target_seconds:.3} s)")]
    TemplateLongerThanTarget {
        template_seconds: f64,
        target_seconds: f64,
    },

    #[error("template rate {template} Hz does not match target rate {target} Hz")]
    RateMismatch { template: u32, target: u32 },
}

/// Result of one cue pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOutcome {
    pub class: CueClass,
    pub candidates: Vec<Candidate>,
    /// Correlation peaks above threshold before spectral validation
    pub raw_peaks: usize,
    pub template_seconds: Option<f64>,
    pub band: Option<FrequencyBand>,
    pub failure: Option<StageFailure>,
}

impl ClassOutcome {
    pub fn failed(class: CueClass, failure: StageFailure) -> Self {
        Self {
            class,
            candidates: Vec::new(),
            raw_peaks: 0,
            template_seconds: None,
            band: None,
            failure: Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// How regular the count-to-go gaps are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapConsistency {
    /// Spread under 4 s
    Excellent,
    /// Spread under 6 s
    Good,
    Variable,
}

impl GapConsistency {
    pub fn from_spread(spread_seconds: f64) -> Self {
        if spread_seconds < 4.0 {
            Self::Excellent
        } else if spread_seconds < 6.0 {
            Self::Good
        } else {
            Self::Variable
        }
    }
}

impl fmt::Display for GapConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Variable => "Variable",
        };
        f.write_str(s)
    }
}

/// Timing statistics over the final patterns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternStatistics {
    pub patterns: usize,
    /// Time between successive pattern starts
    pub intervals: Option<Summary>,
    pub gaps: Option<Summary>,
    pub consistency: Option<GapConsistency>,
}

impl PatternStatistics {
    /// `patterns` must be in time order
    pub fn from_patterns(patterns: &[Pattern]) -> Self {
        let intervals: Vec<f64> = patterns
            .windows(2)
            .map(|w| w[1].start() - w[0].start())
            .collect();
        let gaps: Vec<f64> = patterns.iter().map(|p| p.gap_seconds).collect();
        let gaps = Summary::of(&gaps);

        Self {
            patterns: patterns.len(),
            intervals: Summary::of(&intervals),
            gaps,
            consistency: gaps.map(|g| GapConsistency::from_spread(g.spread())),
        }
    }
}

/// What was analyzed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub path: Option<PathBuf>,
    pub duration_seconds: f64,
    pub sample_rate: u32,
}

/// Complete result for one target recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub target: TargetInfo,
    pub count: ClassOutcome,
    pub go: ClassOutcome,
    pub patterns: Vec<SequencedPattern>,
    pub statistics: PatternStatistics,
    pub config: DetectionConfig,
    pub generated_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSummary>,
}

impl DetectionReport {
    pub fn new(
        target: TargetInfo,
        count: ClassOutcome,
        go: ClassOutcome,
        patterns: Vec<Pattern>,
        config: DetectionConfig,
        elapsed_seconds: f64,
    ) -> Self {
        let statistics = PatternStatistics::from_patterns(&patterns);
        let patterns = patterns
            .into_iter()
            .enumerate()
            .map(|(i, pattern)| SequencedPattern {
                sequence: i + 1,
                pattern,
            })
            .collect();

        Self {
            target,
            count,
            go,
            patterns,
            statistics,
            config,
            generated_at: Utc::now(),
            elapsed_seconds,
            evaluation: None,
        }
    }

    pub fn outcome(&self, class: CueClass) -> &ClassOutcome {
        match class {
            CueClass::Count => &self.count,
            CueClass::Go => &self.go,
        }
    }

    /// Count cue times of the reported patterns
    pub fn pattern_starts(&self) -> Vec<f64> {
        self.patterns.iter().map(|p| p.pattern.start()).collect()
    }

    /// Score the pattern starts against known count cue times
    pub fn evaluate_against(&mut self, expected: &[f64], tolerance_seconds: f64) -> &EvaluationSummary {
        let summary = evaluate(&self.pattern_starts(), expected, tolerance_seconds);
        self.evaluation.insert(summary)
    }

    pub fn failures(&self) -> impl Iterator<Item = (CueClass, &StageFailure)> {
        [&self.count, &self.go]
            .into_iter()
            .filter_map(|o| o.failure.as_ref().map(|f| (o.class, f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(t: f64, confidence: f64) -> Candidate {
        Candidate {
            time_offset: t,
            correlation_score: confidence,
            spectral_score: confidence,
            confidence,
        }
    }

    #[test]
    fn test_candidate_confidence_is_weighted_geometric_mean() {
        let c = Candidate::new(1.0, 0.64, 0.25, 0.5);
        assert!((c.confidence - 0.4).abs() < 1e-12);

        let only_corr = Candidate::new(1.0, 0.6, 0.1, 1.0);
        assert!((only_corr.confidence - 0.6).abs() < 1e-12);

        assert_eq!(Candidate::new(-0.001, 0.5, 0.5, 0.7).time_offset, 0.0);
    }

    #[test]
    fn test_pattern_gap_and_confidence() {
        let p = Pattern::new(candidate(10.0, 0.9), candidate(14.2, 0.4));
        assert!((p.gap_seconds - 4.2).abs() < 1e-12);
        assert!((p.confidence - 0.6).abs() < 1e-12);
        assert_eq!(p.start(), 10.0);
    }

    #[test]
    fn test_statistics() {
        let patterns = vec![
            Pattern::new(candidate(10.0, 0.8), candidate(14.0, 0.8)),
            Pattern::new(candidate(40.0, 0.8), candidate(45.0, 0.8)),
            Pattern::new(candidate(80.0, 0.8), candidate(83.0, 0.8)),
        ];
        let stats = PatternStatistics::from_patterns(&patterns);
        assert_eq!(stats.patterns, 3);

        let intervals = stats.intervals.unwrap();
        assert_eq!(intervals.min, 30.0);
        assert_eq!(intervals.max, 40.0);

        let gaps = stats.gaps.unwrap();
        assert!((gaps.mean - 4.0).abs() < 1e-12);
        assert_eq!(stats.consistency, Some(GapConsistency::Excellent));
    }

    #[test]
    fn test_statistics_of_nothing() {
        let stats = PatternStatistics::from_patterns(&[]);
        assert_eq!(stats.patterns, 0);
        assert!(stats.gaps.is_none());
        assert!(stats.consistency.is_none());
    }

    #[test]
    fn test_consistency_thresholds() {
        assert_eq!(GapConsistency::from_spread(3.9), GapConsistency::Excellent);
        assert_eq!(GapConsistency::from_spread(4.0), GapConsistency::Good);
        assert_eq!(GapConsistency::from_spread(6.0), GapConsistency::Variable);
    }

    #[test]
    fn test_stage_failure_serializes_with_kind() {
        let failure = StageFailure::RateMismatch {
            template: 22050,
            target: 44100,
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"rate_mismatch\""));
    }

    #[test]
    fn test_report_numbers_patterns_from_one() {
        let outcome = |class| ClassOutcome {
            class,
            candidates: Vec::new(),
            raw_peaks: 0,
            template_seconds: None,
            band: None,
            failure: None,
        };
        let patterns = vec![
            Pattern::new(candidate(10.0, 0.8), candidate(14.0, 0.8)),
            Pattern::new(candidate(40.0, 0.8), candidate(45.0, 0.8)),
        ];
        let report = DetectionReport::new(
            TargetInfo {
                path: None,
                duration_seconds: 60.0,
                sample_rate: 22050,
            },
            outcome(CueClass::Count),
            outcome(CueClass::Go),
            patterns,
            DetectionConfig::default(),
            0.5,
        );
        assert_eq!(report.patterns[0].sequence, 1);
        assert_eq!(report.patterns[1].sequence, 2);
        assert_eq!(report.pattern_starts(), vec![10.0, 40.0]);
        assert_eq!(report.failures().count(), 0);

        let mut report = report;
        let summary = report.evaluate_against(&[10.02, 70.0], 0.5);
        assert_eq!(summary.hits(), 1);
        assert_eq!(summary.missed, vec![70.0]);
        assert_eq!(summary.false_alarms, vec![40.0]);
        assert!(report.evaluation.is_some());
    }
}
