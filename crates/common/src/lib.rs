//! FramePress Common Utilities
//!
//! Shared infrastructure for all FramePress crates:
//! - Error types and result aliases
//! - Export clocks and real-time pacing schedules
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
