//! FramePress Export Engine
//!
//! Turns a buffer of pre-rendered frames into a playable WebM container whose
//! timing matches the intended frame rate exactly. The engine probes the host
//! for a usable encoder and takes one of two paths:
//!
//! - **Fast path**: direct encoder + muxer with explicit per-frame timestamps.
//!   No pacing; runs as fast as the encoder allows.
//! - **Fallback path**: a live stream recorder fed at wall-clock pace. Slower
//!   than real time by construction, but needs no encoder API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Exporter                        │
//! │  ┌──────────────┐                                    │
//! │  │ CodecProber  │── Supported(codec) ──┐             │
//! │  └──────┬───────┘                      ▼             │
//! │         │ Unsupported         ┌─────────────────┐    │
//! │         ▼                     │   FastEncoder   │    │
//! │  ┌──────────────────┐         │ MuxerBackend    │    │
//! │  │ FallbackEncoder  │         │ pts = i / fps   │    │
//! │  │ StreamBackend    │         └────────┬────────┘    │
//! │  │ paced by clock   │                  │             │
//! │  └────────┬─────────┘                  │             │
//! │           ▼                            ▼             │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │        EncodeResult (WebM bytes + metadata)    │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod cancel;
pub mod fallback;
pub mod fast;
pub mod orchestrator;
pub mod probe;
pub mod progress;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use cancel::CancellationFlag;
pub use fallback::{select_recorder_config, FallbackEncoder};
pub use fast::FastEncoder;
pub use orchestrator::Exporter;
pub use probe::{CodecProber, ProbeAttempt, ProbeOutcome, ProbeReport};
pub use progress::{ExportProgress, ExportStage, ProgressCallback};
