/// Property-based tests using proptest
/// Tests invariants that should hold for every well-formed company record
mod common;

use common::{load_context, raw};
use proptest::prelude::*;
use serde_json::json;
use territory_scoring_api::features::build_features;
use territory_scoring_api::models::{Identity, RecordOutcome};
use territory_scoring_api::processor::process_record;
use territory_scoring_api::scorer::{assign_segment, Segment};

fn identity() -> Identity {
    Identity {
        company_name: "prop".to_string(),
        domain: String::new(),
    }
}

// Property: every real number lands in exactly one band
proptest! {
    #[test]
    fn segment_is_total(score in proptest::num::f64::ANY) {
        let segment = assign_segment(score);
        if score.is_nan() || score < 0.30 {
            prop_assert_eq!(segment, Segment::LowPriority);
        }
    }

    #[test]
    fn segment_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(assign_segment(low) <= assign_segment(high));
    }
}

// Property: scores stay in range and are reproducible
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scores_are_bounded_and_idempotent(
        marketing_headcount in 0.01f64..5_000.0,
        people_count in 0.0f64..100_000.0,
        company_revenue in 0.0f64..5e10,
        prompt_volume in 0.0f64..1e6,
        is_b2b in 0u8..=1,
        industry in prop_oneof![
            Just("Software"), Just("Retail"), Just("Aerospace"), Just("")
        ],
    ) {
        let ctx = load_context("full");
        let input = raw(json!({
            "marketing_headcount": marketing_headcount,
            "people_count": people_count,
            "company_revenue": company_revenue,
            "prompt_volume": prompt_volume,
            "is_b2b": is_b2b,
            "industry": industry,
        }));

        let first = process_record(&ctx, &input, identity()).unwrap();
        let second = process_record(&ctx, &input, identity()).unwrap();
        prop_assert_eq!(&first, &second);

        match first {
            RecordOutcome::Scored(record) => {
                prop_assert!((0.0..=1.0).contains(&record.score.close_score));
                prop_assert!(record.score.predicted_acv >= 0.0);
                prop_assert!(record.score.expected_value >= 0.0);
                prop_assert_eq!(record.segment, assign_segment(record.score.close_score));
            }
            RecordOutcome::NotApplicable(_) => prop_assert!(false, "positive headcount must score"),
        }
    }

    #[test]
    fn ratio_is_always_finite(
        marketing_headcount in 0.0f64..1e6,
        people_count in prop_oneof![Just(0.0f64), 0.0f64..1e6],
    ) {
        let ctx = load_context("full");
        let built = build_features(
            &raw(json!({
                "marketing_headcount": marketing_headcount,
                "people_count": people_count,
            })),
            ctx.schema(),
        )
        .unwrap();

        let ratio = built.inputs.marketing_to_headcount_ratio;
        prop_assert!(ratio.is_finite());
        if people_count == 0.0 {
            prop_assert_eq!(ratio, 0.0);
        }
        prop_assert!(built.vector.as_slice().iter().all(|v| v.is_finite()));
    }
}
