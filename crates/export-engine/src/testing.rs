//! In-memory backends for exercising the export paths without a media
//! framework.
//!
//! Every fake records what it was asked to do behind a shared handle, so a
//! test can keep a clone, run an export, and inspect the calls afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use framepress_common::clock::{ExportClock, ManualClock};
use framepress_common::error::{FramepressError, FramepressResult};
use framepress_frame_model::{
    CodecDescriptor, Frame, FrameTiming, PixelFormat, RecorderConfig, TrackConfig,
    FALLBACK_MIME_CANDIDATES,
};

use crate::backend::{
    ChunkSender, EncoderPlatform, MuxerBackend, PlatformBackends, StreamBackend, StreamRecorder,
    VideoTrackSink,
};

/// EBML magic that opens every Matroska/WebM file.
pub const EBML_MAGIC: [u8; 4] = [0x1a, 0x45, 0xdf, 0xa3];

/// Install a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// How the scripted platform answers a support check for one codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateBehavior {
    Supported,
    Rejected,
    /// The check returns an error.
    Fails(String),
    /// The check panics.
    Panics,
}

#[derive(Debug)]
struct ScriptedState {
    available: bool,
    behaviors: HashMap<String, CandidateBehavior>,
    checked: Vec<String>,
}

/// An [`EncoderPlatform`] with per-codec scripted answers. Codecs without a
/// script are rejected.
#[derive(Debug, Clone)]
pub struct ScriptedPlatform {
    state: Arc<Mutex<ScriptedState>>,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                available: true,
                behaviors: HashMap::new(),
                checked: Vec::new(),
            })),
        }
    }

    /// A host without the encoder API.
    pub fn without_api() -> Self {
        let platform = Self::new();
        lock(&platform.state).available = false;
        platform
    }

    pub fn with(self, codec_id: &str, behavior: CandidateBehavior) -> Self {
        lock(&self.state)
            .behaviors
            .insert(codec_id.to_string(), behavior);
        self
    }

    /// Codec ids the platform was asked about, in order.
    pub fn checked(&self) -> Vec<String> {
        lock(&self.state).checked.clone()
    }
}

#[async_trait::async_trait]
impl EncoderPlatform for ScriptedPlatform {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    async fn is_config_supported(&self, descriptor: &CodecDescriptor) -> FramepressResult<bool> {
        let behavior = {
            let mut state = lock(&self.state);
            state.checked.push(descriptor.id.to_string());
            state
                .behaviors
                .get(descriptor.id)
                .cloned()
                .unwrap_or(CandidateBehavior::Rejected)
        };
        match behavior {
            CandidateBehavior::Supported => Ok(true),
            CandidateBehavior::Rejected => Ok(false),
            CandidateBehavior::Fails(msg) => Err(FramepressError::encoder_init(msg)),
            CandidateBehavior::Panics => panic!("support check for {} panicked", descriptor.id),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Everything a [`RecordingMuxer`] saw.
#[derive(Debug, Clone, Default)]
pub struct MuxLog {
    pub opened: Vec<TrackConfig>,
    pub format: Option<PixelFormat>,
    pub started: bool,
    pub draws: usize,
    pub timestamps: Vec<FrameTiming>,
    pub finalized: bool,
    pub aborted: bool,
}

#[derive(Debug, Clone, Default)]
struct MuxFailures {
    open: Option<String>,
    at_frame: Option<u64>,
    finalize: Option<String>,
    empty_output: bool,
}

/// A [`MuxerBackend`] that writes a deterministic fake container: the EBML
/// magic followed by each frame's timestamp in nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct RecordingMuxer {
    log: Arc<Mutex<MuxLog>>,
    failures: MuxFailures,
}

impl RecordingMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(mut self, message: &str) -> Self {
        self.failures.open = Some(message.to_string());
        self
    }

    /// Reject the frame submitted with timestamp index `index`.
    pub fn fail_at_frame(mut self, index: u64) -> Self {
        self.failures.at_frame = Some(index);
        self
    }

    pub fn fail_finalize(mut self, message: &str) -> Self {
        self.failures.finalize = Some(message.to_string());
        self
    }

    /// Finalize successfully but return no bytes.
    pub fn empty_output(mut self) -> Self {
        self.failures.empty_output = true;
        self
    }

    pub fn log(&self) -> MuxLog {
        lock(&self.log).clone()
    }
}

impl MuxerBackend for RecordingMuxer {
    fn open(
        &self,
        track: &TrackConfig,
        format: PixelFormat,
    ) -> FramepressResult<Box<dyn VideoTrackSink>> {
        if let Some(msg) = &self.failures.open {
            return Err(FramepressError::encoder_init(msg.clone()));
        }
        {
            let mut log = lock(&self.log);
            log.opened.push(track.clone());
            log.format = Some(format);
        }
        Ok(Box::new(RecordingSink {
            log: Arc::clone(&self.log),
            failures: self.failures.clone(),
            drawn: false,
        }))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct RecordingSink {
    log: Arc<Mutex<MuxLog>>,
    failures: MuxFailures,
    drawn: bool,
}

#[async_trait::async_trait]
impl VideoTrackSink for RecordingSink {
    async fn start(&mut self) -> FramepressResult<()> {
        lock(&self.log).started = true;
        Ok(())
    }

    fn draw(&mut self, _frame: &Frame) -> FramepressResult<()> {
        lock(&self.log).draws += 1;
        self.drawn = true;
        Ok(())
    }

    async fn add(&mut self, timing: FrameTiming) -> FramepressResult<()> {
        let index = timing.index as usize;
        if self.failures.at_frame == Some(timing.index) {
            return Err(FramepressError::frame_submit(
                index,
                "scripted encoder failure",
            ));
        }
        if !std::mem::take(&mut self.drawn) {
            return Err(FramepressError::frame_submit(index, "nothing drawn"));
        }
        lock(&self.log).timestamps.push(timing);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> FramepressResult<Vec<u8>> {
        if let Some(msg) = &self.failures.finalize {
            return Err(FramepressError::finalize(msg.clone()));
        }
        let mut log = lock(&self.log);
        log.finalized = true;
        if self.failures.empty_output {
            return Ok(Vec::new());
        }
        let mut bytes = EBML_MAGIC.to_vec();
        for timing in &log.timestamps {
            bytes.extend_from_slice(&(timing.pts().as_nanos() as u64).to_le_bytes());
        }
        Ok(bytes)
    }

    async fn abort(self: Box<Self>) {
        lock(&self.log).aborted = true;
    }
}

/// Everything a [`FakeStreamBackend`] saw, with clock times.
#[derive(Debug, Clone, Default)]
pub struct StreamLog {
    pub opened: Option<RecorderConfig>,
    /// Rate the recorder was told frames arrive at.
    pub fps: Option<u32>,
    pub started_at: Option<Duration>,
    pub draws: usize,
    /// Clock time of every `request_frame`.
    pub frame_times: Vec<Duration>,
    pub stopped_at: Option<Duration>,
    pub aborted: bool,
}

impl StreamLog {
    /// Length of the recorded stream: first captured frame to stop.
    pub fn container_duration(&self) -> Option<Duration> {
        let first = *self.frame_times.first()?;
        Some(self.stopped_at?.saturating_sub(first))
    }

    /// Gaps between consecutive captured frames.
    pub fn frame_gaps(&self) -> Vec<Duration> {
        self.frame_times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// A [`StreamBackend`] that timestamps frames with the injected clock, the
/// way a live recorder timestamps them on arrival.
#[derive(Clone)]
pub struct FakeStreamBackend {
    clock: Arc<dyn ExportClock>,
    available: bool,
    supported: Vec<String>,
    fail_stop: bool,
    emit_nothing: bool,
    slow_draw: Option<(ManualClock, Duration)>,
    log: Arc<Mutex<StreamLog>>,
}

impl FakeStreamBackend {
    /// A recorder supporting every built-in mime candidate.
    pub fn new(clock: Arc<dyn ExportClock>) -> Self {
        Self {
            clock,
            available: true,
            supported: FALLBACK_MIME_CANDIDATES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            fail_stop: false,
            emit_nothing: false,
            slow_draw: None,
            log: Arc::default(),
        }
    }

    pub fn supporting(mut self, mimes: &[&str]) -> Self {
        self.supported = mimes.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Record without ever emitting a chunk.
    pub fn emit_nothing(mut self) -> Self {
        self.emit_nothing = true;
        self
    }

    /// Make each `draw` take `cost` on `clock`.
    pub fn slow_draw(mut self, clock: ManualClock, cost: Duration) -> Self {
        self.slow_draw = Some((clock, cost));
        self
    }

    pub fn log(&self) -> StreamLog {
        lock(&self.log).clone()
    }
}

impl StreamBackend for FakeStreamBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        self.supported.iter().any(|m| m == mime)
    }

    fn open(
        &self,
        _width: u32,
        _height: u32,
        _format: PixelFormat,
        fps: u32,
        config: &RecorderConfig,
        chunks: ChunkSender,
    ) -> FramepressResult<Box<dyn StreamRecorder>> {
        if !self.available {
            return Err(FramepressError::recorder_unavailable(
                "fake recorder disabled",
            ));
        }
        {
            let mut log = lock(&self.log);
            log.opened = Some(config.clone());
            log.fps = Some(fps);
        }
        Ok(Box::new(FakeRecorder {
            backend: self.clone(),
            chunks,
            requested: 0,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeRecorder {
    backend: FakeStreamBackend,
    chunks: ChunkSender,
    requested: u32,
}

impl FakeRecorder {
    fn emit(&self, bytes: Vec<u8>) {
        if !self.backend.emit_nothing {
            let _ = self.chunks.send(bytes);
        }
    }
}

#[async_trait::async_trait]
impl StreamRecorder for FakeRecorder {
    async fn start(&mut self) -> FramepressResult<()> {
        lock(&self.backend.log).started_at = Some(self.backend.clock.now());
        self.emit(EBML_MAGIC.to_vec());
        Ok(())
    }

    fn draw(&mut self, _frame: &Frame) -> FramepressResult<()> {
        if let Some((clock, cost)) = &self.backend.slow_draw {
            clock.advance(*cost);
        }
        lock(&self.backend.log).draws += 1;
        Ok(())
    }

    fn request_frame(&mut self) -> FramepressResult<()> {
        let now = self.backend.clock.now();
        lock(&self.backend.log).frame_times.push(now);
        self.emit(self.requested.to_le_bytes().to_vec());
        self.requested += 1;
        Ok(())
    }

    async fn stop(self: Box<Self>) -> FramepressResult<()> {
        if self.backend.fail_stop {
            return Err(FramepressError::Other(anyhow::anyhow!(
                "recorder stopped with an error"
            )));
        }
        lock(&self.backend.log).stopped_at = Some(self.backend.clock.now());
        self.emit(b"cues".to_vec());
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        lock(&self.backend.log).aborted = true;
    }
}

/// Backends wired from the given fakes.
pub fn fake_backends(
    platform: ScriptedPlatform,
    muxer: RecordingMuxer,
    stream: FakeStreamBackend,
) -> PlatformBackends {
    PlatformBackends {
        encoder: Arc::new(platform),
        muxer: Arc::new(muxer),
        stream: Arc::new(stream),
    }
}
