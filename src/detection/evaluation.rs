//! Ground-truth scoring of detected event times

use serde::{Deserialize, Serialize};

/// Timing quality of a matched detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimingRating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl TimingRating {
    pub fn from_error(error_seconds: f64) -> Self {
        let ms = error_seconds.abs() * 1000.0;
        if ms < 50.0 {
            Self::Excellent
        } else if ms < 100.0 {
            Self::VeryGood
        } else if ms < 200.0 {
            Self::Good
        } else if ms < 300.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// One expected event paired with a detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMatch {
    pub expected: f64,
    pub detected: f64,
    /// `detected - expected`
    pub error_seconds: f64,
    pub rating: TimingRating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub tolerance_seconds: f64,
    pub matches: Vec<EvaluationMatch>,
    /// Expected events with no detection within tolerance
    pub missed: Vec<f64>,
    /// Detections with no expected event within tolerance
    pub false_alarms: Vec<f64>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mean_abs_error_seconds: Option<f64>,
}

impl EvaluationSummary {
    pub fn hits(&self) -> usize {
        self.matches.len()
    }

    pub fn is_perfect(&self) -> bool {
        self.missed.is_empty() && self.false_alarms.is_empty()
    }
}

/// Match detections to expected events one-to-one.
///
/// Pairs within `tolerance_seconds` are assigned closest first (ties to the
/// earlier expected event, then the earlier detection).
pub fn evaluate(detected: &[f64], expected: &[f64], tolerance_seconds: f64) -> EvaluationSummary {
    let tolerance = tolerance_seconds.max(0.0);

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (e, &exp) in expected.iter().enumerate() {
        for (d, &det) in detected.iter().enumerate() {
            let error = (det - exp).abs();
            if error <= tolerance {
                pairs.push((error, e, d));
            }
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut expected_used = vec![false; expected.len()];
    let mut detected_used = vec![false; detected.len()];
    let mut matches = Vec::new();
    for (_, e, d) in pairs {
        if expected_used[e] || detected_used[d] {
            continue;
        }
        expected_used[e] = true;
        detected_used[d] = true;
        let error_seconds = detected[d] - expected[e];
        matches.push(EvaluationMatch {
            expected: expected[e],
            detected: detected[d],
            error_seconds,
            rating: TimingRating::from_error(error_seconds),
        });
    }
    matches.sort_by(|a, b| a.expected.total_cmp(&b.expected));

    let missed: Vec<f64> = expected
        .iter()
        .zip(&expected_used)
        .filter(|(_, &used)| !used)
        .map(|(&t, _)| t)
        .collect();
    let false_alarms: Vec<f64> = detected
        .iter()
        .zip(&detected_used)
        .filter(|(_, &used)| !used)
        .map(|(&t, _)| t)
        .collect();

    let hits = matches.len() as f64;
    let precision = if detected.is_empty() {
        if expected.is_empty() { 1.0 } else { 0.0 }
    } else {
        hits / detected.len() as f64
    };
    let recall = if expected.is_empty() {
        1.0
    } else {
        hits / expected.len() as f64
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let mean_abs_error_seconds = if matches.is_empty() {
        None
    } else {
        Some(matches.iter().map(|m| m.error_seconds.abs()).sum::<f64>() / hits)
    };

    EvaluationSummary {
        tolerance_seconds: tolerance,
        matches,
        missed,
        false_alarms,
        precision,
        recall,
        f1,
        mean_abs_error_seconds,
    }
}
