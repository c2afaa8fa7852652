//! Error types shared across FramePress crates.

/// Top-level error type for FramePress operations.
///
/// Capability routing signals (no encoder API, a rejected probe candidate)
/// are deliberately absent: they are reported through the prober's result
/// types and never abort an export.
#[derive(Debug, thiserror::Error)]
pub enum FramepressError {
    #[error("Encoder initialization failed: {message}")]
    EncoderInitFailed { message: String },

    #[error("Failed to submit frame {index}: {message}")]
    FrameSubmitFailed { index: usize, message: String },

    #[error("Failed to finalize output: {message}")]
    FinalizeFailed { message: String },

    #[error("Encoder produced no output: {message}")]
    EmptyOutput { message: String },

    #[error("Frame buffer is empty; nothing to encode")]
    NoFrames,

    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Frame count mismatch: timing expects {expected} frames, buffer holds {actual}")]
    TimingMismatch { expected: u64, actual: u64 },

    #[error("Invalid timing: {message}")]
    InvalidTiming { message: String },

    #[error("Stream recorder unavailable: {message}")]
    RecorderUnavailable { message: String },

    #[error("Export cancelled after {frames_submitted} frames")]
    Cancelled { frames_submitted: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramepressError.
pub type FramepressResult<T> = Result<T, FramepressError>;

impl FramepressError {
    pub fn encoder_init(msg: impl Into<String>) -> Self {
        Self::EncoderInitFailed {
            message: msg.into(),
        }
    }

    pub fn frame_submit(index: usize, msg: impl Into<String>) -> Self {
        Self::FrameSubmitFailed {
            index,
            message: msg.into(),
        }
    }

    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::FinalizeFailed {
            message: msg.into(),
        }
    }

    pub fn empty_output(msg: impl Into<String>) -> Self {
        Self::EmptyOutput {
            message: msg.into(),
        }
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: msg.into(),
        }
    }

    pub fn invalid_timing(msg: impl Into<String>) -> Self {
        Self::InvalidTiming {
            message: msg.into(),
        }
    }

    pub fn recorder_unavailable(msg: impl Into<String>) -> Self {
        Self::RecorderUnavailable {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_submit_message_names_index() {
        let err = FramepressError::frame_submit(42, "encoder queue closed");
        assert_eq!(
            err.to_string(),
            "Failed to submit frame 42: encoder queue closed"
        );
    }

    #[test]
    fn test_timing_mismatch_message() {
        let err = FramepressError::TimingMismatch {
            expected: 600,
            actual: 599,
        };
        assert!(err.to_string().contains("600"));
        assert!(err.to_string().contains("599"));
    }
}
