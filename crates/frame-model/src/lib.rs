//! FramePress Frame Model
//!
//! Defines the core data contracts of an export attempt:
//! - **Frames:** Immutable pre-rendered raster images and the ordered buffer holding them
//! - **Timing:** Frame rate, intended duration, and exact per-frame presentation times
//! - **Codecs:** Static encoder candidates, probe results, and recorder formats
//! - **Results:** The encoded container and its metadata
//!
//! Frames arrive at final output resolution; nothing in FramePress resamples.

pub mod codec;
pub mod frame;
pub mod result;
pub mod timing;

pub use codec::*;
pub use frame::*;
pub use result::*;
pub use timing::*;
