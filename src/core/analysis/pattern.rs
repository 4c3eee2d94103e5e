// src/core/analysis/pattern.rs
//
// Pairs count cues with following go cues and resolves competing pairings

use std::cmp::Ordering;

use crate::config::PatternParams;
use crate::detection::{Candidate, Pattern};

fn by_time(a: &Candidate, b: &Candidate) -> Ordering {
    a.time_offset.total_cmp(&b.time_offset)
}

fn is_time_sorted(candidates: &[Candidate]) -> bool {
    candidates
        .windows(2)
        .all(|w| by_time(&w[0], &w[1]) != Ordering::Greater)
}

/// Every (count, go) pair with `min_gap <= go - count <= max_gap`.
///
/// Both inputs must be in time order. A go cue may pair with several counts.
pub fn pair_candidates(count: &[Candidate], go: &[Candidate], params: &PatternParams) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    let mut first = 0;

    for c in count {
        while first < go.len() && go[first].time_offset - c.time_offset < params.min_gap_seconds {
            first += 1;
        }
        for g in &go[first..] {
            let gap = g.time_offset - c.time_offset;
            if gap > params.max_gap_seconds {
                break;
            }
            if gap >= params.min_gap_seconds {
                patterns.push(Pattern::new(*c, *g));
            }
        }
    }

    patterns
}

/// Ranking among overlapping patterns: confidence, then the tighter gap,
/// then the earlier start, then the earlier go cue.
///
/// The gap tie-break is domain policy: a tighter count-to-go gap is the
/// typical cue cadence, so among equally confident pairings it is taken as
/// the more plausible one.
fn by_preference(a: &Pattern, b: &Pattern) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.gap_seconds.total_cmp(&b.gap_seconds))
        .then(a.start().total_cmp(&b.start()))
        .then(a.go.time_offset.total_cmp(&b.go.time_offset))
}

/// Keep the preferred pattern among any whose starts lie within
/// `window_seconds` of each other (inclusive). Output is in time order.
pub fn resolve_overlaps(mut patterns: Vec<Pattern>, window_seconds: f64) -> Vec<Pattern> {
    patterns.sort_by(by_preference);

    let mut kept: Vec<Pattern> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let start = pattern.start();
        let at = kept.partition_point(|k| k.start() < start);
        let overlaps = |k: &Pattern| (k.start() - start).abs() <= window_seconds;
        let before = at.checked_sub(1).map(|i| &kept[i]).is_some_and(overlaps);
        let after = kept.get(at).is_some_and(overlaps);
        if !before && !after {
            kept.insert(at, pattern);
        }
    }

    kept
}

/// Pair and resolve. Inputs need not be sorted.
pub fn match_patterns(count: &[Candidate], go: &[Candidate], params: &PatternParams) -> Vec<Pattern> {
    let sorted = |candidates: &[Candidate]| {
        let mut v = candidates.to_vec();
        if !is_time_sorted(&v) {
            v.sort_by(by_time);
        }
        v
    };
    let count = sorted(count);
    let go = sorted(go);

    let pairs = pair_candidates(&count, &go, params);
    resolve_overlaps(pairs, params.overlap_window_seconds)
}
