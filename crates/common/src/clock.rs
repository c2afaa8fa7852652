//! Clock and pacing utilities for real-time frame delivery.
//!
//! Offline encoding never looks at the wall clock. The fallback path, however,
//! feeds a live stream recorder that timestamps frames on arrival, so its
//! frames must be delivered on schedule. This module provides:
//! - The [`ExportClock`] capability (monotonic `now` + suspend-until)
//! - A tokio-backed [`SystemClock`] and a deterministic [`ManualClock`]
//! - [`PacingSchedule`] for per-frame delivery targets
//! - [`DriftMeasurement`] for reporting how far delivery fell behind

use std::sync::{Arc, Mutex};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Monotonic clock with a cooperative sleep, measured from the clock's epoch.
#[async_trait::async_trait]
pub trait ExportClock: Send + Sync {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;

    /// Suspend until `now() >= deadline`. Returns immediately if the
    /// deadline already passed.
    async fn sleep_until(&self, deadline: Duration);
}

/// Wall-clock implementation backed by the tokio timer.
#[derive(Debug, Clone)]
pub struct SystemClock {
    /// The instant the clock was created.
    epoch: tokio::time::Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl SystemClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at the clock's epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

#[async_trait::async_trait]
impl ExportClock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep_until(&self, deadline: Duration) {
        tokio::time::sleep_until(self.epoch + deadline).await;
    }
}

/// A clock that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so paced loops run instantly
/// while every timestamp they observe stays exact. `advance` simulates work
/// that takes time (a slow draw, a stalled encoder).
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    now: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without a sleep being requested.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now += by;
    }

    /// Deadlines of every sleep that actually had to wait, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClockState> {
        // The state is plain data; a poisoned lock still holds a valid time.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl ExportClock for ManualClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    async fn sleep_until(&self, deadline: Duration) {
        {
            let mut state = self.lock();
            if deadline > state.now {
                state.now = deadline;
                state.sleeps.push(deadline);
            }
        }
        tokio::task::yield_now().await;
    }
}

/// Delivery schedule for frames paced at a fixed rate.
///
/// Frame `i` is due at `i / fps` seconds after the schedule's start. Targets
/// are computed from the index rather than accumulated, so rounding never
/// drifts over long exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingSchedule {
    fps: u32,
}

impl PacingSchedule {
    /// Create a schedule for `fps` frames per second. `fps` is clamped to 1.
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Nominal interval between two frames.
    pub fn interval(&self) -> Duration {
        self.offset_of(1)
    }

    /// Offset from the schedule start at which frame `index` is due.
    pub fn offset_of(&self, index: u64) -> Duration {
        let nanos = index as u128 * NANOS_PER_SEC / self.fps as u128;
        Duration::from_nanos(nanos as u64)
    }

    /// Absolute clock time at which frame `index` is due.
    pub fn target_for(&self, start: Duration, index: u64) -> Duration {
        start + self.offset_of(index)
    }

    /// How long to wait before delivering frame `index`, or `None` when the
    /// frame is already due (or overdue).
    pub fn wait_before(&self, start: Duration, index: u64, now: Duration) -> Option<Duration> {
        let target = self.target_for(start, index);
        target.checked_sub(now).filter(|d| !d.is_zero())
    }
}

/// Drift between when something should have happened and when it did.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Scheduled timestamp (ns).
    pub reference_ns: u64,
    /// Observed timestamp (ns).
    pub measured_ns: u64,
}

impl DriftMeasurement {
    pub fn new(reference: Duration, measured: Duration) -> Self {
        Self {
            reference_ns: reference.as_nanos() as u64,
            measured_ns: measured.as_nanos() as u64,
        }
    }

    /// Drift in nanoseconds (positive = measured is late).
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_schedule_targets_are_index_based() {
        let schedule = PacingSchedule::new(60);
        assert_eq!(schedule.offset_of(0), Duration::ZERO);
        assert_eq!(schedule.offset_of(60), Duration::from_secs(1));
        assert_eq!(schedule.offset_of(600), Duration::from_secs(10));
        assert_eq!(schedule.interval(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_schedule_zero_fps_is_clamped() {
        assert_eq!(PacingSchedule::new(0).fps(), 1);
    }

    #[test]
    fn test_wait_before_only_when_early() {
        let schedule = PacingSchedule::new(10);
        let start = Duration::from_millis(500);
        assert_eq!(
            schedule.wait_before(start, 2, Duration::from_millis(600)),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            schedule.wait_before(start, 2, Duration::from_millis(700)),
            None
        );
        assert_eq!(
            schedule.wait_before(start, 2, Duration::from_millis(900)),
            None
        );
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            reference_ns: 1_000_000_000,
            measured_ns: 1_050_000_000,
        };
        assert_eq!(drift.drift_ns(), 50_000_000);
        assert!((drift.drift_ms() - 50.0).abs() < 1e-9);
        assert!(drift.exceeds_threshold_ms(10.0));
        assert!(!drift.exceeds_threshold_ms(100.0));
    }

    #[tokio::test]
    async fn test_manual_clock_jumps_to_deadline() {
        let clock = ManualClock::new();
        clock.sleep_until(Duration::from_millis(250)).await;
        assert_eq!(clock.now(), Duration::from_millis(250));

        // A deadline in the past neither waits nor rewinds.
        clock.sleep_until(Duration::from_millis(100)).await;
        assert_eq!(clock.now(), Duration::from_millis(250));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }

    #[tokio::test]
    async fn test_system_clock_sleep_reaches_deadline() {
        let clock = SystemClock::start();
        clock.sleep_until(Duration::from_millis(5)).await;
        assert!(clock.now() >= Duration::from_millis(5));
        assert!(!clock.epoch_wall().is_empty());
    }

    proptest! {
        #[test]
        fn prop_offsets_are_monotonic_and_contiguous(fps in 1u32..=240, index in 0u64..100_000) {
            let schedule = PacingSchedule::new(fps);
            let a = schedule.offset_of(index);
            let b = schedule.offset_of(index + 1);
            prop_assert!(b > a);
            // Floor rounding keeps every step within 1ns of the exact interval.
            let step = (b - a).as_nanos() as i128;
            let exact = 1_000_000_000i128 / fps as i128;
            prop_assert!((step - exact).abs() <= 1);
        }
    }
}
