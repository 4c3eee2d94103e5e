//! Detection result types and ground-truth evaluation

pub mod evaluation;
mod result;

pub use evaluation::{evaluate, EvaluationMatch, EvaluationSummary, TimingRating};
pub use result::{
    Candidate, ClassOutcome, ConfidenceLevel, CueClass, DetectionReport, GapConsistency, Pattern,
    PatternStatistics, SequencedPattern, StageFailure, TargetInfo,
};
