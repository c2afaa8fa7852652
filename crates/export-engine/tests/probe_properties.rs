use std::sync::Arc;

use framepress_export_engine::testing::{CandidateBehavior, ScriptedPlatform};
use framepress_export_engine::{CodecProber, ProbeOutcome};
use framepress_frame_model::{CapabilityResult, UnsupportedReason, DEFAULT_CANDIDATES};
use proptest::prelude::*;

fn behavior() -> impl Strategy<Value = CandidateBehavior> {
    prop_oneof![
        Just(CandidateBehavior::Supported),
        Just(CandidateBehavior::Rejected),
        "[a-z ]{1,12}".prop_map(CandidateBehavior::Fails),
        Just(CandidateBehavior::Panics),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn probe_picks_first_supported_candidate(behaviors in proptest::collection::vec(behavior(), 3)) {
        let mut platform = ScriptedPlatform::new();
        for (candidate, behavior) in DEFAULT_CANDIDATES.iter().zip(&behaviors) {
            platform = platform.with(candidate.id, behavior.clone());
        }

        let report = runtime().block_on(CodecProber::new(Arc::new(platform)).probe_report());

        let expected = behaviors
            .iter()
            .position(|b| *b == CandidateBehavior::Supported)
            .map(|i| DEFAULT_CANDIDATES[i].id);
        prop_assert_eq!(report.result.descriptor().map(|d| d.id), expected);
        if expected.is_none() {
            prop_assert_eq!(
                report.result,
                CapabilityResult::Unsupported(UnsupportedReason::NoCandidateSupported)
            );
        }

        // Nothing after the winner is asked.
        if let Some(winner) = behaviors.iter().position(|b| *b == CandidateBehavior::Supported) {
            prop_assert!(report.attempts[winner + 1..]
                .iter()
                .all(|a| a.outcome == ProbeOutcome::NotProbed));
        }
    }

    #[test]
    fn probe_is_stable_across_calls(behaviors in proptest::collection::vec(behavior(), 3)) {
        let mut platform = ScriptedPlatform::new();
        for (candidate, behavior) in DEFAULT_CANDIDATES.iter().zip(&behaviors) {
            platform = platform.with(candidate.id, behavior.clone());
        }
        let prober = CodecProber::new(Arc::new(platform.clone()));

        let rt = runtime();
        let first = rt.block_on(prober.probe());
        let second = rt.block_on(prober.probe());
        prop_assert_eq!(first, second);

        // Probing is not cached: the second call asks the platform again.
        let checked = platform.checked();
        prop_assert_eq!(checked.len() % 2, 0);
        let (a, b) = checked.split_at(checked.len() / 2);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn absent_api_never_asks_about_candidates() {
    let platform = ScriptedPlatform::without_api().with("vp08.0.1", CandidateBehavior::Supported);
    let result = runtime().block_on(CodecProber::new(Arc::new(platform.clone())).probe());
    assert_eq!(
        result,
        CapabilityResult::Unsupported(UnsupportedReason::ApiUnavailable)
    );
    assert!(platform.checked().is_empty());
}
