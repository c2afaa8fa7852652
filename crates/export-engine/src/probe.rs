//! Codec capability probing.
//!
//! Walks a static, priority-ordered candidate list and asks the platform
//! whether it can run each configuration. The first supported candidate
//! wins. A failing check only disqualifies that candidate; probing itself
//! never fails. Results are computed fresh on every call.

use std::sync::Arc;

use framepress_frame_model::{
    CapabilityResult, CodecDescriptor, UnsupportedReason, DEFAULT_CANDIDATES,
};
use serde::Serialize;

use crate::backend::EncoderPlatform;

/// What happened to one candidate during probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Supported,
    /// The platform answered "no".
    Rejected,
    /// The check itself errored or panicked.
    CheckFailed(String),
    /// Not asked: an earlier candidate won or the API is absent.
    NotProbed,
}

/// One candidate's probe record.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeAttempt {
    pub codec: &'static str,
    pub label: &'static str,
    pub rank: u8,
    pub outcome: ProbeOutcome,
}

/// Full probe outcome, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub platform: String,
    pub result: CapabilityResult,
    pub attempts: Vec<ProbeAttempt>,
}

/// Probes an [`EncoderPlatform`] against an ordered candidate list.
pub struct CodecProber {
    platform: Arc<dyn EncoderPlatform>,
    candidates: Vec<CodecDescriptor>,
}

impl CodecProber {
    /// Probe the built-in candidates.
    pub fn new(platform: Arc<dyn EncoderPlatform>) -> Self {
        Self::with_candidates(platform, DEFAULT_CANDIDATES.to_vec())
    }

    /// Probe a custom list. Candidates are tried by ascending rank; equal
    /// ranks keep their list order.
    pub fn with_candidates(
        platform: Arc<dyn EncoderPlatform>,
        mut candidates: Vec<CodecDescriptor>,
    ) -> Self {
        candidates.sort_by_key(|c| c.rank);
        Self {
            platform,
            candidates,
        }
    }

    pub fn candidates(&self) -> &[CodecDescriptor] {
        &self.candidates
    }

    /// Find the best supported candidate.
    pub async fn probe(&self) -> CapabilityResult {
        self.probe_report().await.result
    }

    /// Probe and keep a record of every candidate.
    pub async fn probe_report(&self) -> ProbeReport {
        let platform_name = self.platform.name().to_string();
        let mut attempts: Vec<ProbeAttempt> = self
            .candidates
            .iter()
            .map(|c| ProbeAttempt {
                codec: c.id,
                label: c.label,
                rank: c.rank,
                outcome: ProbeOutcome::NotProbed,
            })
            .collect();

        if !self.platform.is_available() {
            tracing::info!(
                platform = %platform_name,
                "Encoder API unavailable; skipping codec probe"
            );
            return ProbeReport {
                platform: platform_name,
                result: CapabilityResult::Unsupported(UnsupportedReason::ApiUnavailable),
                attempts,
            };
        }

        for (candidate, attempt) in self.candidates.iter().zip(attempts.iter_mut()) {
            let outcome = self.check(candidate).await;
            attempt.outcome = outcome.clone();
            match outcome {
                ProbeOutcome::Supported => {
                    tracing::info!(
                        codec = candidate.id,
                        label = candidate.label,
                        "Codec supported"
                    );
                    return ProbeReport {
                        platform: platform_name,
                        result: CapabilityResult::Supported(*candidate),
                        attempts,
                    };
                }
                ProbeOutcome::Rejected => {
                    tracing::debug!(codec = candidate.id, "Codec not supported by platform");
                }
                ProbeOutcome::CheckFailed(reason) => {
                    tracing::warn!(codec = candidate.id, %reason, "Codec support check failed");
                }
                ProbeOutcome::NotProbed => {}
            }
        }

        tracing::info!(platform = %platform_name, "No codec candidate supported");
        ProbeReport {
            platform: platform_name,
            result: CapabilityResult::Unsupported(UnsupportedReason::NoCandidateSupported),
            attempts,
        }
    }

    /// Run one support check on its own task so a panicking platform check
    /// is contained like any other failure.
    async fn check(&self, candidate: &CodecDescriptor) -> ProbeOutcome {
        let platform = Arc::clone(&self.platform);
        let descriptor = *candidate;
        let handle = tokio::spawn(async move { platform.is_config_supported(&descriptor).await });

        match handle.await {
            Ok(Ok(true)) => ProbeOutcome::Supported,
            Ok(Ok(false)) => ProbeOutcome::Rejected,
            Ok(Err(e)) => ProbeOutcome::CheckFailed(e.to_string()),
            Err(join_err) => {
                ProbeOutcome::CheckFailed(format!("support check aborted: {join_err}"))
            }
        }
    }
}
