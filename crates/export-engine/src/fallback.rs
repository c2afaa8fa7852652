//! Fallback encode path: a live stream recorder fed at wall-clock pace.
//!
//! The recorder stamps each frame with the time it arrives, so the only way
//! to get correct timing is to deliver frame `i` at `start + i / fps` and hold
//! the last frame until `start + N / fps` before stopping. Encoding therefore
//! takes at least as long as the content plays.

use std::sync::Arc;
use std::time::Instant;

use framepress_common::clock::{DriftMeasurement, ExportClock, PacingSchedule, SystemClock};
use framepress_common::config::FallbackConfig;
use framepress_common::error::{FramepressError, FramepressResult};
use framepress_frame_model::{
    EncodeDurations, EncodeMethod, EncodeResult, FrameBuffer, RecorderConfig,
    FALLBACK_MIME_CANDIDATES, LAST_RESORT_MIME,
};
use tokio::sync::mpsc;

use crate::backend::{StreamBackend, StreamRecorder};
use crate::cancel::CancellationFlag;
use crate::progress::{ExportStage, ProgressCallback, ProgressReporter};

/// Pick the recorder format: the first supported mime candidate at the
/// configured bitrate, else the bare container at the last-resort bitrate.
pub fn select_recorder_config(
    backend: &dyn StreamBackend,
    config: &FallbackConfig,
) -> RecorderConfig {
    FALLBACK_MIME_CANDIDATES
        .iter()
        .find(|mime| backend.is_type_supported(mime))
        .map(|mime| RecorderConfig::new(mime, config.bitrate_bps))
        .unwrap_or_else(|| RecorderConfig::new(LAST_RESORT_MIME, config.last_resort_bitrate_bps))
}

/// Reassembles the recorder's chunk stream in emission order.
pub struct ChunkCollector {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    bytes: Vec<u8>,
    chunks: usize,
}

impl ChunkCollector {
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            rx,
            bytes: Vec::new(),
            chunks: 0,
        }
    }

    /// Append every chunk received so far. Empty chunks are skipped.
    pub fn drain(&mut self) {
        while let Ok(chunk) = self.rx.try_recv() {
            if chunk.is_empty() {
                continue;
            }
            self.chunks += 1;
            self.bytes.extend_from_slice(&chunk);
        }
    }

    /// Number of non-empty chunks collected.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encodes a frame buffer through a [`StreamBackend`], pacing delivery with
/// an [`ExportClock`].
pub struct FallbackEncoder {
    stream: Arc<dyn StreamBackend>,
    clock: Arc<dyn ExportClock>,
    config: FallbackConfig,
    cancel: Option<CancellationFlag>,
}

impl FallbackEncoder {
    pub fn new(stream: Arc<dyn StreamBackend>) -> Self {
        Self {
            stream,
            clock: Arc::new(SystemClock::start()),
            config: FallbackConfig::default(),
            cancel: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn ExportClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: FallbackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        matches!(&self.cancel, Some(flag) if flag.is_cancelled())
    }

    /// Record every frame at `fps` and return the finished container.
    pub async fn encode(
        &self,
        frames: &FrameBuffer,
        fps: u32,
        progress: Option<ProgressCallback>,
    ) -> FramepressResult<EncodeResult> {
        let (width, height) = frames.dimensions().ok_or(FramepressError::NoFrames)?;
        let format = frames.format().ok_or(FramepressError::NoFrames)?;
        if fps == 0 {
            return Err(FramepressError::invalid_timing(
                "fps must be greater than zero",
            ));
        }
        if !self.stream.is_available() {
            return Err(FramepressError::recorder_unavailable(format!(
                "{} backend cannot record streams",
                self.stream.name()
            )));
        }

        let total = frames.len();
        let started = Instant::now();
        let config = select_recorder_config(self.stream.as_ref(), &self.config);
        let label = format!("Stream recorder ({})", config.mime_type);
        let mut reporter = ProgressReporter::new(0, 100, label.clone(), progress);

        tracing::info!(
            mime = %config.mime_type,
            bitrate_bps = config.bitrate_bps,
            frames = total,
            fps,
            "Starting paced stream recording"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let mut collector = ChunkCollector::new(rx);
        let mut recorder = self.stream.open(width, height, format, fps, &config, tx)?;
        if let Err(e) = recorder.start().await {
            recorder.abort().await;
            return Err(e);
        }

        let schedule = PacingSchedule::new(fps);
        let start = self.clock.now();
        reporter.advance(0, total, ExportStage::Encoding);

        for (index, frame) in frames.iter().enumerate() {
            if self.is_cancelled() {
                return Err(self.cancelled(recorder, index).await);
            }

            let target = schedule.target_for(start, index as u64);
            if schedule
                .wait_before(start, index as u64, self.clock.now())
                .is_some()
            {
                self.clock.sleep_until(target).await;
            }
            // Sleeping is a suspension point; honor a cancel raised during it.
            if self.is_cancelled() {
                return Err(self.cancelled(recorder, index).await);
            }

            if let Err(e) = deliver(recorder.as_mut(), frame, index) {
                tracing::warn!(index, error = %e, "Frame delivery failed");
                recorder.abort().await;
                return Err(e);
            }
            tracing::trace!(
                index,
                late_ns = DriftMeasurement::new(target, self.clock.now()).drift_ns(),
                "Frame delivered"
            );
            reporter.advance(index + 1, total, ExportStage::Encoding);
        }

        // The stream's last frame lasts until the recorder stops.
        let end = schedule.target_for(start, total as u64);
        self.clock.sleep_until(end).await;
        if self.is_cancelled() {
            return Err(self.cancelled(recorder, total).await);
        }
        let drift = DriftMeasurement::new(end, self.clock.now());
        if drift.exceeds_threshold_ms(schedule.interval().as_secs_f64() * 1000.0) {
            tracing::warn!(
                drift_ms = drift.drift_ms(),
                "Stream recording fell behind schedule"
            );
        } else {
            tracing::debug!(drift_ms = drift.drift_ms(), "Stream recording on schedule");
        }

        reporter.stage(ExportStage::Finalizing);
        recorder.stop().await.map_err(|e| match e {
            FramepressError::FinalizeFailed { .. } => e,
            other => FramepressError::finalize(other.to_string()),
        })?;

        collector.drain();
        let chunks = collector.chunk_count();
        let bytes = collector.into_bytes();
        if bytes.is_empty() {
            return Err(FramepressError::empty_output(format!(
                "recorder emitted no data for {total} frames"
            )));
        }

        let elapsed = started.elapsed().as_secs_f64();
        reporter.complete();
        tracing::info!(
            codec = config.codec_label(),
            chunks,
            bytes = bytes.len(),
            elapsed_secs = elapsed,
            "Stream recording complete"
        );

        Ok(EncodeResult {
            bytes,
            frame_count: total,
            codec: config.codec_label().to_string(),
            method: EncodeMethod::Fallback,
            label,
            mime_type: config.mime_type,
            durations: EncodeDurations { encode: elapsed },
        })
    }

    async fn cancelled(
        &self,
        recorder: Box<dyn StreamRecorder>,
        frames_submitted: usize,
    ) -> FramepressError {
        tracing::info!(frames_submitted, "Stream recording cancelled");
        recorder.abort().await;
        FramepressError::Cancelled { frames_submitted }
    }
}

fn deliver(
    recorder: &mut dyn StreamRecorder,
    frame: &framepress_frame_model::Frame,
    index: usize,
) -> FramepressResult<()> {
    recorder
        .draw(frame)
        .and_then(|()| recorder.request_frame())
        .map_err(|e| match e {
            FramepressError::FrameSubmitFailed { .. } => e,
            other => FramepressError::frame_submit(index, other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStreamBackend;
    use framepress_common::clock::ManualClock;
    use framepress_frame_model::Frame;
    use std::time::Duration;

    fn buffer(n: usize) -> FrameBuffer {
        let frame = Frame::solid(4, 4, [59, 130, 246, 255]).unwrap();
        FrameBuffer::from_frames(vec![frame; n]).unwrap()
    }

    #[test]
    fn test_recorder_config_priority() {
        let clock: Arc<dyn ExportClock> = Arc::new(ManualClock::new());
        let config = FallbackConfig::default();

        let all = FakeStreamBackend::new(clock.clone());
        let picked = select_recorder_config(&all, &config);
        assert_eq!(picked.mime_type, "video/webm;codecs=vp9");
        assert_eq!(picked.bitrate_bps, 8_000_000);

        let vp8_only =
            FakeStreamBackend::new(clock.clone()).supporting(&["video/webm;codecs=vp8"]);
        assert_eq!(
            select_recorder_config(&vp8_only, &config).codec_label(),
            "vp8"
        );

        let none = FakeStreamBackend::new(clock).supporting(&[]);
        let last = select_recorder_config(&none, &config);
        assert_eq!(last.mime_type, "video/webm");
        assert_eq!(last.bitrate_bps, 6_000_000);
        assert_eq!(last.codec_label(), "webm");
    }

    #[tokio::test]
    async fn test_frames_are_paced_at_interval() {
        let clock = ManualClock::new();
        let stream = FakeStreamBackend::new(Arc::new(clock.clone()));
        let encoder =
            FallbackEncoder::new(Arc::new(stream.clone())).with_clock(Arc::new(clock.clone()));

        let result = encoder.encode(&buffer(4), 10, None).await.unwrap();

        let log = stream.log();
        let times: Vec<u64> = log
            .frame_times
            .iter()
            .map(|t| t.as_millis() as u64)
            .collect();
        assert_eq!(times, vec![0, 100, 200, 300]);
        assert_eq!(log.fps, Some(10));
        assert_eq!(log.container_duration(), Some(Duration::from_millis(400)));
        assert_eq!(result.method, EncodeMethod::Fallback);
        assert_eq!(result.codec, "vp9");
        assert_eq!(result.label, "Stream recorder (video/webm;codecs=vp9)");
    }

    #[tokio::test]
    async fn test_unavailable_recorder_is_an_error() {
        let clock: Arc<dyn ExportClock> = Arc::new(ManualClock::new());
        let stream = FakeStreamBackend::new(clock.clone()).unavailable();
        let encoder = FallbackEncoder::new(Arc::new(stream)).with_clock(clock);
        let err = encoder.encode(&buffer(2), 30, None).await.unwrap_err();
        assert!(matches!(err, FramepressError::RecorderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_no_chunks_is_empty_output() {
        let clock: Arc<dyn ExportClock> = Arc::new(ManualClock::new());
        let stream = FakeStreamBackend::new(clock.clone()).emit_nothing();
        let encoder = FallbackEncoder::new(Arc::new(stream)).with_clock(clock);
        let err = encoder.encode(&buffer(3), 30, None).await.unwrap_err();
        assert!(matches!(err, FramepressError::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn test_stop_failure_is_finalize_failure() {
        let clock: Arc<dyn ExportClock> = Arc::new(ManualClock::new());
        let stream = FakeStreamBackend::new(clock.clone()).fail_stop();
        let encoder = FallbackEncoder::new(Arc::new(stream)).with_clock(clock);
        let err = encoder.encode(&buffer(3), 30, None).await.unwrap_err();
        assert!(matches!(err, FramepressError::FinalizeFailed { .. }));
    }

    #[tokio::test]
    async fn test_late_frames_are_not_delayed_further() {
        let clock = ManualClock::new();
        let stream = FakeStreamBackend::new(Arc::new(clock.clone()))
            .slow_draw(clock.clone(), Duration::from_millis(150));
        let encoder =
            FallbackEncoder::new(Arc::new(stream.clone())).with_clock(Arc::new(clock.clone()));

        encoder.encode(&buffer(3), 10, None).await.unwrap();

        // Each draw costs 150ms against a 100ms interval: no frame ever waits.
        let times: Vec<u64> = stream
            .log()
            .frame_times
            .iter()
            .map(|t| t.as_millis() as u64)
            .collect();
        assert_eq!(times, vec![150, 300, 450]);
        assert!(clock.sleeps().is_empty());
    }

    /// Raises `cancel` once a sleep reaches `at`.
    struct CancelAt {
        inner: ManualClock,
        at: Duration,
        cancel: CancellationFlag,
    }

    #[async_trait::async_trait]
    impl ExportClock for CancelAt {
        fn now(&self) -> Duration {
            self.inner.now()
        }

        async fn sleep_until(&self, deadline: Duration) {
            self.inner.sleep_until(deadline).await;
            if deadline >= self.at {
                self.cancel.cancel();
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_during_final_hold_aborts() {
        let cancel = CancellationFlag::new();
        let clock = ManualClock::new();
        let stream = FakeStreamBackend::new(Arc::new(clock.clone()));
        let pacer = CancelAt {
            inner: clock,
            at: Duration::from_millis(300),
            cancel: cancel.clone(),
        };
        let encoder = FallbackEncoder::new(Arc::new(stream.clone()))
            .with_clock(Arc::new(pacer))
            .with_cancellation(cancel);

        let err = encoder.encode(&buffer(3), 10, None).await.unwrap_err();

        assert!(matches!(
            err,
            FramepressError::Cancelled {
                frames_submitted: 3
            }
        ));
        let log = stream.log();
        assert_eq!(log.frame_times.len(), 3);
        assert!(log.aborted);
        assert_eq!(log.stopped_at, None);
    }
}
