//! Export progress reporting.
//!
//! Callers see integer percentages on `[0, 100]` that never decrease within
//! one export attempt and reach 100 only once the container is complete.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Stages of an export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Probing,
    Encoding,
    Finalizing,
    Complete,
}

/// Export progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    /// Overall progress in percent.
    pub percent: u8,

    /// Current stage.
    pub stage: ExportStage,

    /// Codec or method in use (e.g. "VP9 (Balanced)").
    pub label: String,
}

/// Progress callback for exports.
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Highest percentage reported before completion.
const MAX_INCOMPLETE_PERCENT: u8 = 99;

/// Maps path-local progress onto a band of the caller-visible range.
///
/// Reports are capped at 99 until [`complete`](Self::complete) and never go
/// backwards. Repeated identical reports are suppressed.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    low: u8,
    high: u8,
    label: String,
    last: Option<(u8, ExportStage)>,
}

impl ProgressReporter {
    /// Report into `[low, high]` percent.
    pub fn new(
        low: u8,
        high: u8,
        label: impl Into<String>,
        callback: Option<ProgressCallback>,
    ) -> Self {
        let high = high.min(100);
        Self {
            callback,
            low: low.min(high),
            high,
            label: label.into(),
            last: None,
        }
    }

    /// Report `done` of `total` units of work.
    pub fn advance(&mut self, done: usize, total: usize, stage: ExportStage) {
        let fraction = if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };
        let span = (self.high - self.low) as f64;
        let percent = self.low + (fraction * span).round() as u8;
        self.emit(percent.min(MAX_INCOMPLETE_PERCENT), stage);
    }

    /// Report a stage change without new work done.
    pub fn stage(&mut self, stage: ExportStage) {
        let percent = self.last.map(|(p, _)| p).unwrap_or(self.low);
        self.emit(percent.min(MAX_INCOMPLETE_PERCENT), stage);
    }

    /// Report 100%. Call only after the output is final.
    pub fn complete(&mut self) {
        self.emit(100, ExportStage::Complete);
    }

    /// Last reported percentage.
    pub fn last_percent(&self) -> Option<u8> {
        self.last.map(|(p, _)| p)
    }

    fn emit(&mut self, percent: u8, stage: ExportStage) {
        let percent = match self.last {
            Some((last, _)) => percent.max(last),
            None => percent,
        };
        if self.last == Some((percent, stage)) {
            return;
        }
        self.last = Some((percent, stage));
        if let Some(cb) = &self.callback {
            cb(ExportProgress {
                percent,
                stage,
                label: self.label.clone(),
            });
        }
    }
}

/// Wrap a callback so the values it receives never decrease, whichever
/// path produces them.
pub fn monotonic(callback: ProgressCallback) -> ProgressCallback {
    let high_water = AtomicU8::new(0);
    Arc::new(move |progress: ExportProgress| {
        let previous = high_water.fetch_max(progress.percent, Ordering::SeqCst);
        callback(ExportProgress {
            percent: progress.percent.max(previous),
            ..progress
        });
    })
}
