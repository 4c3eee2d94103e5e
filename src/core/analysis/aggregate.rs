// src/core/analysis/aggregate.rs
//
// Collapses near-duplicate candidates of one cue class

use std::cmp::Ordering;

use crate::detection::Candidate;

/// Filters applied by [`aggregate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateParams {
    /// Candidates closer than this are duplicates
    pub min_distance_seconds: f64,
    pub min_confidence: f64,
    pub max_detections: Option<usize>,
}

impl AggregateParams {
    pub fn new(min_distance_seconds: f64) -> Self {
        Self {
            min_distance_seconds,
            min_confidence: 0.0,
            max_detections: None,
        }
    }
}

/// Most confident first, earlier first among equals
fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.time_offset.total_cmp(&b.time_offset))
}

/// Keep the best candidate of every cluster closer than
/// `min_distance_seconds`. Output is in time order.
pub fn deduplicate(candidates: &[Candidate], min_distance_seconds: f64) -> Vec<Candidate> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(by_rank);

    let mut kept: Vec<Candidate> = Vec::with_capacity(ranked.len());
    for candidate in ranked {
        let t = candidate.time_offset;
        let at = kept.partition_point(|k| k.time_offset < t);
        let clashes = |k: &Candidate| (k.time_offset - t).abs() < min_distance_seconds;
        let before = at.checked_sub(1).map(|i| &kept[i]).is_some_and(clashes);
        let after = kept.get(at).is_some_and(clashes);
        if !before && !after {
            kept.insert(at, candidate);
        }
    }

    kept
}

/// Deduplicate, then apply the confidence floor and detection cap.
///
/// Suppression is greedy, so the output size is not monotonic in its input:
/// dropping a strong candidate can release two weaker neighbours it was
/// suppressing. A higher correlation threshold only ever shrinks the
/// validated scan that feeds this stage.
pub fn aggregate(candidates: &[Candidate], params: &AggregateParams) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = deduplicate(candidates, params.min_distance_seconds)
        .into_iter()
        .filter(|c| c.confidence >= params.min_confidence)
        .collect();

    if let Some(limit) = params.max_detections {
        if kept.len() > limit {
            kept.sort_by(by_rank);
            kept.truncate(limit);
            kept.sort_by(|a, b| a.time_offset.total_cmp(&b.time_offset));
        }
    }

    kept
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
    fn test_close_pair_keeps_more_confident() {
        let input = [candidate(14.200, 0.6), candidate(14.250, 0.8)];
        let out = deduplicate(&input, 3.0);
        assert_eq!(out, vec![candidate(14.250, 0.8)]);
    }

    #[test]
    fn test_ties_keep_earliest() {
        let input = [candidate(5.1, 0.7), candidate(5.0, 0.7)];
        assert_eq!(deduplicate(&input, 1.0), vec![candidate(5.0, 0.7)]);
    }

    #[test]
    fn test_distance_is_exclusive() {
        let input = [candidate(1.0, 0.9), candidate(4.0, 0.5)];
        assert_eq!(deduplicate(&input, 3.0).len(), 2);
    }

    #[test]
    fn test_output_sorted_and_idempotent() {
        let input = [
            candidate(30.0, 0.5),
            candidate(10.0, 0.9),
            candidate(11.0, 0.95),
            candidate(20.0, 0.4),
            candidate(31.5, 0.6),
        ];
        let once = deduplicate(&input, 2.0);
        let times: Vec<f64> = once.iter().map(|c| c.time_offset).collect();
        assert_eq!(times, vec![11.0, 20.0, 31.5]);
        assert_eq!(deduplicate(&once, 2.0), once);
    }

    #[test]
    fn test_removing_a_candidate_can_release_neighbours() {
        let left = candidate(0.0, 0.6);
        let middle = candidate(2.0, 0.9);
        let right = candidate(4.0, 0.6);
        let params = AggregateParams::new(3.0);

        assert_eq!(aggregate(&[left, middle, right], &params), vec![middle]);
        assert_eq!(aggregate(&[left, right], &params), vec![left, right]);
    }

    #[test]
    fn test_filters() {
        let input = [
            candidate(1.0, 0.9),
            candidate(10.0, 0.3),
            candidate(20.0, 0.6),
            candidate(30.0, 0.7),
        ];
        let params = AggregateParams {
            min_distance_seconds: 1.0,
            min_confidence: 0.5,
            max_detections: Some(2),
        };
        let out = aggregate(&input, &params);
        let times: Vec<f64> = out.iter().map(|c| c.time_offset).collect();
        assert_eq!(times, vec![1.0, 30.0]);
        assert_eq!(aggregate(&out, &params), out);
    }

    #[test]
    fn test_empty() {
        assert!(deduplicate(&[], 1.0).is_empty());
    }
}
