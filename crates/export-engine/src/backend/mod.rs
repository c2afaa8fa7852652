//! Platform seams for probing, direct encoding, and stream recording.
//!
//! The encode paths only talk to these traits. The GStreamer implementation
//! lives in [`gst_backend`]; in-memory fakes live in the `testing` module.

use std::sync::Arc;

use framepress_common::config::AppConfig;
use framepress_common::error::{FramepressError, FramepressResult};
use framepress_frame_model::{
    CodecDescriptor, Frame, FrameTiming, PixelFormat, RecorderConfig, TrackConfig,
};
use tokio::sync::mpsc;

#[cfg(feature = "gstreamer")]
pub mod gst_backend;

/// The host's encoder capability API.
#[async_trait::async_trait]
pub trait EncoderPlatform: Send + Sync {
    /// Whether the encoder API exists at all on this host.
    fn is_available(&self) -> bool;

    /// Whether the platform can run exactly this candidate's configuration.
    /// An error means the check itself failed; the prober treats that as
    /// "unsupported" and moves on.
    async fn is_config_supported(&self, descriptor: &CodecDescriptor) -> FramepressResult<bool>;

    /// Platform name for logs.
    fn name(&self) -> &str;
}

/// Opens direct encoder + muxer tracks that write a container in memory.
pub trait MuxerBackend: Send + Sync {
    /// Create a single-track output bound to `track`.
    fn open(
        &self,
        track: &TrackConfig,
        format: PixelFormat,
    ) -> FramepressResult<Box<dyn VideoTrackSink>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// One video track of an in-memory container.
///
/// Frames reach the encoder through a drawing surface: `draw` puts pixels on
/// the surface, `add` encodes whatever the surface holds at the given time.
#[async_trait::async_trait]
pub trait VideoTrackSink: Send {
    /// Start the muxer. Called once, before any frame.
    async fn start(&mut self) -> FramepressResult<()>;

    /// Write a frame's pixels onto the drawing surface.
    fn draw(&mut self, frame: &Frame) -> FramepressResult<()>;

    /// Encode the surface with an explicit timestamp and duration. May wait
    /// for the encoder to accept input, never for wall-clock time.
    async fn add(&mut self, timing: FrameTiming) -> FramepressResult<()>;

    /// Close the track, flush the encoder, write the container trailer, and
    /// return the complete container bytes.
    async fn finalize(self: Box<Self>) -> FramepressResult<Vec<u8>>;

    /// Release encoder and muxer resources after a failure or cancellation.
    async fn abort(self: Box<Self>);
}

/// Sender half of the chunk channel a recorder emits container data on.
pub type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

/// A generic capture-and-record facility fed from a live virtual stream.
pub trait StreamBackend: Send + Sync {
    /// Whether stream recording exists on this host.
    fn is_available(&self) -> bool;

    /// Whether the recorder can produce `mime` (e.g. `video/webm;codecs=vp9`).
    fn is_type_supported(&self, mime: &str) -> bool;

    /// Create a surface of the given size bound to a live stream, and a
    /// recorder on that stream emitting container chunks on `chunks`.
    /// `fps` is the rate frames will be requested at.
    fn open(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        fps: u32,
        config: &RecorderConfig,
        chunks: ChunkSender,
    ) -> FramepressResult<Box<dyn StreamRecorder>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// A running stream recorder.
///
/// The stream only samples the surface when asked: `draw` followed by
/// `request_frame` captures one frame at the current wall-clock time.
#[async_trait::async_trait]
pub trait StreamRecorder: Send {
    /// Start recording.
    async fn start(&mut self) -> FramepressResult<()>;

    /// Draw a frame's pixels onto the bound surface.
    fn draw(&mut self, frame: &Frame) -> FramepressResult<()>;

    /// Capture the current surface into the stream.
    fn request_frame(&mut self) -> FramepressResult<()>;

    /// Stop recording. Resolves once the recorder's final flush is done and
    /// every chunk has been sent.
    async fn stop(self: Box<Self>) -> FramepressResult<()>;

    /// Tear down without waiting for a flush.
    async fn abort(self: Box<Self>);
}

/// An encoder platform without an encoder API. Probing it short-circuits to
/// "unsupported", which routes every export to the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncoderApi;

#[async_trait::async_trait]
impl EncoderPlatform for NoEncoderApi {
    fn is_available(&self) -> bool {
        false
    }

    async fn is_config_supported(&self, _descriptor: &CodecDescriptor) -> FramepressResult<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Placeholder backends for builds without any media framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl MuxerBackend for Unavailable {
    fn open(
        &self,
        track: &TrackConfig,
        _format: PixelFormat,
    ) -> FramepressResult<Box<dyn VideoTrackSink>> {
        Err(FramepressError::encoder_init(format!(
            "no muxer backend compiled in for {}",
            track.codec_id
        )))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

impl StreamBackend for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn is_type_supported(&self, _mime: &str) -> bool {
        false
    }

    fn open(
        &self,
        _width: u32,
        _height: u32,
        _format: PixelFormat,
        _fps: u32,
        _config: &RecorderConfig,
        _chunks: ChunkSender,
    ) -> FramepressResult<Box<dyn StreamRecorder>> {
        Err(FramepressError::recorder_unavailable(
            "no stream recorder compiled in",
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// The three platform seams an export needs.
#[derive(Clone)]
pub struct PlatformBackends {
    pub encoder: Arc<dyn EncoderPlatform>,
    pub muxer: Arc<dyn MuxerBackend>,
    pub stream: Arc<dyn StreamBackend>,
}

impl PlatformBackends {
    /// Same backends, but with the encoder API reported as absent so every
    /// export takes the fallback path.
    pub fn without_encoder_api(mut self) -> Self {
        self.encoder = Arc::new(NoEncoderApi);
        self
    }
}

/// Get the backends compiled into this build.
pub fn default_backends(config: &AppConfig) -> PlatformBackends {
    #[cfg(feature = "gstreamer")]
    {
        gst_backend::backends(config)
    }
    #[cfg(not(feature = "gstreamer"))]
    {
        let _ = config;
        PlatformBackends {
            encoder: Arc::new(NoEncoderApi),
            muxer: Arc::new(Unavailable),
            stream: Arc::new(Unavailable),
        }
    }
}
