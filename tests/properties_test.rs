// tests/properties_test.rs
//
// Property tests for the pairing, aggregation and thresholding invariants.

use std::sync::OnceLock;

use cuewatch::config::PatternParams;
use cuewatch::core::analysis::{deduplicate, match_patterns};
use cuewatch::core::detector::scan_candidates;
use cuewatch::core::{build_template_with, DetectionParams, Template, TemplateSettings};
use cuewatch::testgen::{count_cue, SceneBuilder};
use cuewatch::Candidate;
use proptest::prelude::*;

const RATE: u32 = 8000;

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
    (0.0f64..120.0, 0.01f64..1.0, 0.01f64..1.0)
        .prop_map(|(t, corr, spec)| Candidate::new(t, corr, spec, 0.7))
}

fn candidates() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec(candidate_strategy(), 0..40)
}

fn pattern_params() -> impl Strategy<Value = PatternParams> {
    (0.0f64..5.0, 0.0f64..10.0, 0.0f64..20.0)
        .prop_map(|(min, extra, window)| PatternParams::new(min, min + extra, window).unwrap())
}

fn template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        let settings = TemplateSettings {
            duration_seconds: 1.0,
            working_sample_rate: RATE,
            ..Default::default()
        };
        build_template_with(&count_cue().render(RATE), &settings).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_every_pattern_respects_gap_bounds(
        count in candidates(),
        go in candidates(),
        params in pattern_params(),
    ) {
        for p in match_patterns(&count, &go, &params) {
            prop_assert!(p.gap_seconds >= params.min_gap_seconds);
            prop_assert!(p.gap_seconds <= params.max_gap_seconds);
            prop_assert_eq!(p.gap_seconds, p.go.time_offset - p.count.time_offset);
            prop_assert!(count.contains(&p.count));
            prop_assert!(go.contains(&p.go));
        }
    }

    #[test]
    fn prop_final_patterns_do_not_overlap(
        count in candidates(),
        go in candidates(),
        params in pattern_params(),
    ) {
        let patterns = match_patterns(&count, &go, &params);
        for (i, a) in patterns.iter().enumerate() {
            for b in &patterns[i + 1..] {
                prop_assert!((a.start() - b.start()).abs() > params.overlap_window_seconds);
            }
        }
        prop_assert!(patterns.windows(2).all(|w| w[0].start() <= w[1].start()));
    }

    #[test]
    fn prop_deduplicate_is_idempotent(input in candidates(), distance in 0.0f64..10.0) {
        let once = deduplicate(&input, distance);
        prop_assert_eq!(deduplicate(&once, distance), once.clone());
        for w in once.windows(2) {
            prop_assert!(w[1].time_offset - w[0].time_offset >= distance);
        }
    }

    #[test]
    fn prop_deduplicate_keeps_the_best(input in candidates(), distance in 0.0f64..10.0) {
        let kept = deduplicate(&input, distance);
        if let Some(best) = input.iter().map(|c| c.confidence).reduce(f64::max) {
            prop_assert!(kept.iter().any(|c| c.confidence == best));
        } else {
            prop_assert!(kept.is_empty());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_raising_threshold_never_adds_candidates(
        seed in any::<u64>(),
        at in 0.5f64..4.0,
        noise in 0.0f64..0.3,
        low in 0.05f64..0.6,
        step in 0.0f64..0.4,
    ) {
        let target = SceneBuilder::new(RATE, 6.0)
            .seed(seed)
            .noise(noise)
            .cue(&count_cue(), at)
            .build();
        let scan = |threshold: f64| {
            let params = DetectionParams::new(threshold, 0.1, 1.0).unwrap();
            scan_candidates(&target, template(), &params).unwrap()
        };

        let loose = scan(low);
        let strict = scan((low + step).min(1.0));
        prop_assert!(strict.raw_peaks <= loose.raw_peaks);
        prop_assert!(strict.validated.len() <= loose.validated.len());
        for c in &strict.validated {
            prop_assert!(loose.validated.contains(c));
        }
    }
}
