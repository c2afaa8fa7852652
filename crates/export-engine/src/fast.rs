//! Fast encode path: direct encoder + in-memory muxer, unpaced.
//!
//! Every frame is submitted with an explicit timestamp of `index / fps`, so
//! the container's timing is exact no matter how fast (or slow) encoding
//! runs. Progress maps onto 50..=100%; the lower half of the range belongs
//! to rendering.

use std::sync::Arc;
use std::time::Instant;

use framepress_common::error::{FramepressError, FramepressResult};
use framepress_frame_model::{
    CodecDescriptor, EncodeDurations, EncodeMethod, EncodeResult, FrameBuffer, FrameTiming,
    TrackConfig,
};

use crate::backend::{MuxerBackend, VideoTrackSink};
use crate::cancel::CancellationFlag;
use crate::progress::{ExportStage, ProgressCallback, ProgressReporter};

/// Container mime type the fast path produces.
pub const FAST_PATH_MIME: &str = "video/webm";

/// Lower bound of the fast path's progress band.
pub const FAST_PATH_PROGRESS_START: u8 = 50;

/// Encodes a frame buffer through a [`MuxerBackend`].
pub struct FastEncoder {
    muxer: Arc<dyn MuxerBackend>,
    cancel: Option<CancellationFlag>,
}

impl FastEncoder {
    pub fn new(muxer: Arc<dyn MuxerBackend>) -> Self {
        Self {
            muxer,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Encode every frame with `descriptor` at `fps` and return the finished
    /// container.
    pub async fn encode(
        &self,
        frames: &FrameBuffer,
        descriptor: &CodecDescriptor,
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

        let total = frames.len();
        let started = Instant::now();
        let track = TrackConfig::from_descriptor(descriptor, width, height, fps);
        let mut reporter =
            ProgressReporter::new(FAST_PATH_PROGRESS_START, 100, descriptor.label, progress);

        tracing::info!(
            codec = descriptor.id,
            muxer = self.muxer.name(),
            frames = total,
            fps,
            width,
            height,
            "Starting fast encode"
        );

        let mut sink = self.muxer.open(&track, format).map_err(as_init_error)?;
        if let Err(e) = sink.start().await {
            sink.abort().await;
            return Err(as_init_error(e));
        }
        reporter.advance(0, total, ExportStage::Encoding);

        for (index, frame) in frames.iter().enumerate() {
            if matches!(&self.cancel, Some(flag) if flag.is_cancelled()) {
                tracing::info!(frames_submitted = index, "Fast encode cancelled");
                sink.abort().await;
                return Err(FramepressError::Cancelled {
                    frames_submitted: index,
                });
            }

            let timing = FrameTiming::new(index as u64, fps);
            if let Err(e) = submit(sink.as_mut(), frame, timing).await {
                tracing::warn!(index, error = %e, "Frame submission failed");
                sink.abort().await;
                return Err(e);
            }
            reporter.advance(index + 1, total, ExportStage::Encoding);
        }

        reporter.stage(ExportStage::Finalizing);
        let bytes = sink.finalize().await.map_err(|e| match e {
            FramepressError::FinalizeFailed { .. } => e,
            other => FramepressError::finalize(other.to_string()),
        })?;
        if bytes.is_empty() {
            return Err(FramepressError::finalize(
                "muxer produced an empty container",
            ));
        }

        let elapsed = started.elapsed().as_secs_f64();
        reporter.complete();
        tracing::info!(
            codec = descriptor.id,
            bytes = bytes.len(),
            elapsed_secs = elapsed,
            "Fast encode complete"
        );

        Ok(EncodeResult {
            bytes,
            frame_count: total,
            codec: descriptor.id.to_string(),
            method: EncodeMethod::Fast,
            label: descriptor.label.to_string(),
            mime_type: FAST_PATH_MIME.to_string(),
            durations: EncodeDurations { encode: elapsed },
        })
    }
}

fn as_init_error(e: FramepressError) -> FramepressError {
    match e {
        FramepressError::EncoderInitFailed { .. } => e,
        other => FramepressError::encoder_init(other.to_string()),
    }
}

async fn submit(
    sink: &mut dyn VideoTrackSink,
    frame: &framepress_frame_model::Frame,
    timing: FrameTiming,
) -> FramepressResult<()> {
    let index = timing.index as usize;
    let as_submit_error = |e: FramepressError| match e {
        FramepressError::FrameSubmitFailed { .. } => e,
        other => FramepressError::frame_submit(index, other.to_string()),
    };
    sink.draw(frame).map_err(as_submit_error)?;
    sink.add(timing).await.map_err(as_submit_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ExportProgress;
    use crate::testing::RecordingMuxer;
    use framepress_frame_model::{Frame, DEFAULT_CANDIDATES};
    use std::sync::Mutex;

    fn buffer(n: usize) -> FrameBuffer {
        let frame = Frame::solid(8, 8, [26, 26, 26, 255]).unwrap();
        FrameBuffer::from_frames(vec![frame; n]).unwrap()
    }

    #[tokio::test]
    async fn test_timestamps_are_index_over_fps() {
        let muxer = RecordingMuxer::new();
        let encoder = FastEncoder::new(Arc::new(muxer.clone()));
        let result = encoder
            .encode(&buffer(4), &DEFAULT_CANDIDATES[1], 4, None)
            .await
            .unwrap();

        let log = muxer.log();
        let pts: Vec<u64> = log
            .timestamps
            .iter()
            .map(|t| t.pts().as_millis() as u64)
            .collect();
        assert_eq!(pts, vec![0, 250, 500, 750]);
        assert_eq!(result.frame_count, 4);
        assert_eq!(result.method, EncodeMethod::Fast);
        assert_eq!(result.codec, "vp09.00.50.08");
        assert!(log.finalized);
    }

    #[tokio::test]
    async fn test_track_uses_actual_frame_size() {
        let muxer = RecordingMuxer::new();
        let encoder = FastEncoder::new(Arc::new(muxer.clone()));
        encoder
            .encode(&buffer(1), &DEFAULT_CANDIDATES[0], 30, None)
            .await
            .unwrap();
        let log = muxer.log();
        let track = &log.opened[0];
        assert_eq!((track.width, track.height, track.fps), (8, 8, 30));
    }

    #[tokio::test]
    async fn test_progress_band_starts_at_fifty() {
        let seen = Arc::new(Mutex::new(Vec::<ExportProgress>::new()));
        let sink = seen.clone();
        let cb: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));

        let encoder = FastEncoder::new(Arc::new(RecordingMuxer::new()));
        encoder
            .encode(&buffer(2), &DEFAULT_CANDIDATES[2], 60, Some(cb))
            .await
            .unwrap();

        let percents: Vec<u8> = seen.lock().unwrap().iter().map(|p| p.percent).collect();
        assert_eq!(percents.first(), Some(&50));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents[..percents.len() - 1].iter().all(|p| *p <= 99));
    }

    #[tokio::test]
    async fn test_empty_buffer_is_rejected() {
        let encoder = FastEncoder::new(Arc::new(RecordingMuxer::new()));
        let err = encoder
            .encode(&FrameBuffer::new(), &DEFAULT_CANDIDATES[1], 60, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FramepressError::NoFrames));
    }

    #[tokio::test]
    async fn test_submit_failure_names_frame_and_aborts() {
        let muxer = RecordingMuxer::new().fail_at_frame(2);
        let encoder = FastEncoder::new(Arc::new(muxer.clone()));
        let err = encoder
            .encode(&buffer(5), &DEFAULT_CANDIDATES[1], 60, None)
            .await
            .unwrap_err();
        let FramepressError::FrameSubmitFailed { index, .. } = err else {
            panic!("expected a submit failure, got {err:?}");
        };
        assert_eq!(index, 2);
        let log = muxer.log();
        assert!(log.aborted);
        assert!(!log.finalized);
    }

    #[tokio::test]
    async fn test_empty_container_is_a_finalize_failure() {
        let encoder = FastEncoder::new(Arc::new(RecordingMuxer::new().empty_output()));
        let err = encoder
            .encode(&buffer(1), &DEFAULT_CANDIDATES[1], 60, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FramepressError::FinalizeFailed { .. }));
    }
}
