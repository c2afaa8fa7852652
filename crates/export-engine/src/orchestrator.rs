//! Export orchestration: probe, pick a path, run it.

use std::sync::Arc;

use framepress_common::clock::{ExportClock, SystemClock};
use framepress_common::config::{AppConfig, FallbackConfig};
use framepress_common::error::FramepressResult;
use framepress_frame_model::{CapabilityResult, EncodeResult, FrameBuffer, TimingParams};

use crate::backend::{default_backends, PlatformBackends};
use crate::cancel::CancellationFlag;
use crate::fallback::FallbackEncoder;
use crate::fast::FastEncoder;
use crate::probe::CodecProber;
use crate::progress::{monotonic, ExportProgress, ExportStage, ProgressCallback};

/// Runs one export attempt per call.
///
/// Each attempt probes afresh, then encodes on exactly one path: the fast
/// path when a codec is supported, the paced fallback otherwise. A failing
/// path is never retried on the other one; the error is returned as-is.
pub struct Exporter {
    backends: PlatformBackends,
    clock: Arc<dyn ExportClock>,
    fallback: FallbackConfig,
    cancel: Option<CancellationFlag>,
}

impl Exporter {
    pub fn new(backends: PlatformBackends) -> Self {
        Self {
            backends,
            clock: Arc::new(SystemClock::start()),
            fallback: FallbackConfig::default(),
            cancel: None,
        }
    }

    /// Exporter on the backends compiled into this build.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(default_backends(config)).with_fallback_config(config.fallback.clone())
    }

    pub fn with_clock(mut self, clock: Arc<dyn ExportClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fallback_config(mut self, config: FallbackConfig) -> Self {
        self.fallback = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Encode `frames` into a container playing for `timing.duration_ms`.
    ///
    /// `frames.len()` must equal `timing.frame_count()`.
    pub async fn export(
        &self,
        frames: &FrameBuffer,
        timing: TimingParams,
        progress: Option<ProgressCallback>,
    ) -> FramepressResult<EncodeResult> {
        timing.validate_against(frames.len())?;
        let progress = progress.map(monotonic);

        if let Some(cb) = &progress {
            cb(ExportProgress {
                percent: 0,
                stage: ExportStage::Probing,
                label: "Probing codecs".to_string(),
            });
        }

        let capability = CodecProber::new(Arc::clone(&self.backends.encoder)).probe().await;
        match capability {
            CapabilityResult::Supported(descriptor) => {
                tracing::info!(
                    codec = descriptor.id,
                    label = descriptor.label,
                    frames = frames.len(),
                    "Exporting on fast path"
                );
                let mut encoder = FastEncoder::new(Arc::clone(&self.backends.muxer));
                if let Some(cancel) = &self.cancel {
                    encoder = encoder.with_cancellation(cancel.clone());
                }
                encoder.encode(frames, &descriptor, timing.fps, progress).await
            }
            CapabilityResult::Unsupported(reason) => {
                tracing::info!(?reason, frames = frames.len(), "Exporting on paced fallback path");
                let mut encoder = FallbackEncoder::new(Arc::clone(&self.backends.stream))
                    .with_clock(Arc::clone(&self.clock))
                    .with_config(self.fallback.clone());
                if let Some(cancel) = &self.cancel {
                    encoder = encoder.with_cancellation(cancel.clone());
                }
                encoder.encode(frames, timing.fps, progress).await
            }
        }
    }

    /// [`export`](Self::export) with the timing given as plain numbers.
    pub async fn export_with_duration(
        &self,
        frames: &FrameBuffer,
        fps: u32,
        duration_ms: u64,
        progress: Option<ProgressCallback>,
    ) -> FramepressResult<EncodeResult> {
        let timing = TimingParams::new(fps, duration_ms)?;
        self.export(frames, timing, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fake_backends, CandidateBehavior, FakeStreamBackend, RecordingMuxer, ScriptedPlatform,
    };
    use framepress_common::clock::ManualClock;
    use framepress_common::error::FramepressError;
    use framepress_frame_model::{EncodeMethod, Frame};

    fn buffer(n: usize) -> FrameBuffer {
        let frame = Frame::solid(2, 2, [0, 0, 0, 255]).unwrap();
        FrameBuffer::from_frames(vec![frame; n]).unwrap()
    }

    #[tokio::test]
    async fn test_mismatched_timing_is_rejected_before_probing() {
        let platform = ScriptedPlatform::new();
        let clock = Arc::new(ManualClock::new());
        let exporter = Exporter::new(fake_backends(
            platform.clone(),
            RecordingMuxer::new(),
            FakeStreamBackend::new(clock.clone()),
        ))
        .with_clock(clock);

        let err = exporter
            .export_with_duration(&buffer(59), 60, 1000, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FramepressError::TimingMismatch {
                expected: 60,
                actual: 59
            }
        ));
        assert!(platform.checked().is_empty());
    }

    #[tokio::test]
    async fn test_supported_codec_takes_fast_path() {
        let clock = Arc::new(ManualClock::new());
        let stream = FakeStreamBackend::new(clock.clone());
        let exporter = Exporter::new(fake_backends(
            ScriptedPlatform::new().with("vp09.00.50.08", CandidateBehavior::Supported),
            RecordingMuxer::new(),
            stream.clone(),
        ))
        .with_clock(clock);

        let result = exporter
            .export_with_duration(&buffer(3), 30, 100, None)
            .await
            .unwrap();
        assert_eq!(result.method, EncodeMethod::Fast);
        assert!(stream.log().opened.is_none());
    }

    #[tokio::test]
    async fn test_no_supported_codec_takes_fallback_path() {
        let clock = Arc::new(ManualClock::new());
        let muxer = RecordingMuxer::new();
        let exporter = Exporter::new(fake_backends(
            ScriptedPlatform::new(),
            muxer.clone(),
            FakeStreamBackend::new(clock.clone()),
        ))
        .with_clock(clock);

        let result = exporter
            .export_with_duration(&buffer(3), 30, 100, None)
            .await
            .unwrap();
        assert_eq!(result.method, EncodeMethod::Fallback);
        assert!(muxer.log().opened.is_empty());
    }
}
