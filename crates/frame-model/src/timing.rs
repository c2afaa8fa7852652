//! Export timing: frame rate, intended duration, and per-frame timestamps.

use std::time::Duration;

use framepress_common::error::{FramepressError, FramepressResult};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Frame rate and intended duration of one export.
///
/// The caller establishes `frame_count() == frames.len()` before encoding;
/// encode paths never alter either value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingParams {
    /// Frames per second (> 0).
    pub fps: u32,

    /// Intended total duration in milliseconds (> 0).
    pub duration_ms: u64,
}

impl TimingParams {
    pub fn new(fps: u32, duration_ms: u64) -> FramepressResult<Self> {
        if fps == 0 {
            return Err(FramepressError::invalid_timing(
                "fps must be greater than zero",
            ));
        }
        if duration_ms == 0 {
            return Err(FramepressError::invalid_timing(
                "duration must be greater than zero",
            ));
        }
        Ok(Self { fps, duration_ms })
    }

    /// `round(duration_ms / 1000 * fps)`, half rounding up.
    pub fn frame_count(&self) -> u64 {
        let scaled = self.duration_ms as u128 * self.fps as u128;
        ((scaled + 500) / 1000) as u64
    }

    /// Intended duration.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Check that a frame buffer of `len` frames matches these parameters.
    pub fn validate_against(&self, len: usize) -> FramepressResult<()> {
        let expected = self.frame_count();
        if expected != len as u64 {
            return Err(FramepressError::TimingMismatch {
                expected,
                actual: len as u64,
            });
        }
        Ok(())
    }
}

/// Exact presentation time of one frame: `index / fps` seconds.
///
/// Times are derived from the index, never from elapsed wall-clock time, so
/// consecutive frames are contiguous regardless of how long encoding took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameTiming {
    /// Position in the frame buffer.
    pub index: u64,

    /// Frames per second.
    pub fps: u32,
}

impl FrameTiming {
    /// `fps` is clamped to 1.
    pub fn new(index: u64, fps: u32) -> Self {
        Self {
            index,
            fps: fps.max(1),
        }
    }

    /// Presentation timestamp, floored to the nanosecond.
    pub fn pts(&self) -> Duration {
        nanos_at(self.index, self.fps)
    }

    /// Time until the next frame's timestamp.
    ///
    /// Computed as the difference of two floored timestamps, so
    /// `pts(i) + duration(i) == pts(i + 1)` holds exactly in nanoseconds.
    pub fn duration(&self) -> Duration {
        self.next().pts() - self.pts()
    }

    /// Exact presentation time as `(numerator, denominator)` seconds.
    pub fn pts_rational(&self) -> (u64, u32) {
        (self.index, self.fps)
    }

    /// Presentation timestamp in seconds.
    pub fn pts_secs(&self) -> f64 {
        self.index as f64 / self.fps as f64
    }

    /// Nominal frame duration in seconds (`1 / fps`).
    pub fn duration_secs(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Timing of the following frame.
    pub fn next(&self) -> Self {
        Self::new(self.index + 1, self.fps)
    }
}

fn nanos_at(index: u64, fps: u32) -> Duration {
    let nanos = index as u128 * NANOS_PER_SEC / fps.max(1) as u128;
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frame_count_rounds() {
        assert_eq!(TimingParams::new(60, 10_000).unwrap().frame_count(), 600);
        assert_eq!(TimingParams::new(30, 1_000).unwrap().frame_count(), 30);
        // 0.35s at 30fps = 10.5 frames
        assert_eq!(TimingParams::new(30, 350).unwrap().frame_count(), 11);
        // 0.34s at 30fps = 10.2 frames
        assert_eq!(TimingParams::new(30, 340).unwrap().frame_count(), 10);
    }

    #[test]
    fn test_rejects_zero_fps_and_duration() {
        assert!(TimingParams::new(0, 1000).is_err());
        assert!(TimingParams::new(30, 0).is_err());
    }

    #[test]
    fn test_validate_against_buffer_length() {
        let timing = TimingParams::new(60, 10_000).unwrap();
        assert!(timing.validate_against(600).is_ok());
        let err = timing.validate_against(599).unwrap_err();
        assert!(matches!(
            err,
            FramepressError::TimingMismatch {
                expected: 600,
                actual: 599
            }
        ));
    }

    #[test]
    fn test_frame_timing_at_60fps() {
        let first = FrameTiming::new(0, 60);
        assert_eq!(first.pts(), Duration::ZERO);
        assert_eq!(first.duration(), Duration::from_nanos(16_666_666));
        assert_eq!(FrameTiming::new(60, 60).pts(), Duration::from_secs(1));
        assert_eq!(FrameTiming::new(61, 60).pts_rational(), (61, 60));
        assert!((FrameTiming::new(599, 60).pts_secs() - 9.983_333).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_timestamps_are_contiguous(fps in 1u32..=240, index in 0u64..1_000_000) {
            let frame = FrameTiming::new(index, fps);
            prop_assert_eq!(frame.pts() + frame.duration(), frame.next().pts());
            prop_assert!(frame.next().pts() > frame.pts());
        }

        #[test]
        fn prop_frame_count_matches_rate(fps in 1u32..=240, secs in 1u64..=600) {
            let timing = TimingParams::new(fps, secs * 1000).unwrap();
            prop_assert_eq!(timing.frame_count(), secs * fps as u64);
        }
    }
}
