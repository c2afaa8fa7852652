//! GStreamer implementation of the export backends.
//!
//! - Probing asks the element registry for a WebM-compatible encoder.
//! - The fast path runs `appsrc ! videoconvert ! <encoder> ! webmmux ! filesink`
//!   with explicit buffer timestamps and no clock sync, so it runs as fast as
//!   the encoder allows. The muxer writes into a seekable temp file so it can
//!   go back and fill in the duration, seek head and cues at EOS.
//! - The stream recorder runs `appsrc ! queue ! ... ! webmmux ! appsink` with a
//!   live `appsrc` that stamps buffers on arrival; its output is only correct
//!   when frames are pushed at wall-clock pace.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use framepress_common::config::AppConfig;
use framepress_common::error::{FramepressError, FramepressResult};
use framepress_frame_model::{
    codec_from_mime, CodecDescriptor, ContainerCodec, Frame, FrameTiming, LatencyMode,
    PixelFormat, RecorderConfig, TrackConfig,
};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;

use super::{
    ChunkSender, EncoderPlatform, MuxerBackend, PlatformBackends, StreamBackend, StreamRecorder,
    VideoTrackSink,
};

const EOS_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue limit of the fast-path source; `push_buffer` blocks beyond it.
const APPSRC_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// Elements every pipeline here needs besides the encoder.
const BASE_ELEMENTS: [&str; 4] = ["appsrc", "videoconvert", "webmmux", "appsink"];

/// GStreamer backends configured from `config`.
pub fn backends(config: &AppConfig) -> PlatformBackends {
    let allow_software = config.fast_path.allow_software_encoders;
    PlatformBackends {
        encoder: Arc::new(GstEncoderPlatform { allow_software }),
        muxer: Arc::new(GstMuxerBackend { allow_software }),
        stream: Arc::new(GstStreamBackend),
    }
}

fn init_gstreamer() -> FramepressResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(FramepressError::encoder_init(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn element_exists(name: &str) -> bool {
    gst::ElementFactory::find(name).is_some()
}

fn base_elements_present() -> bool {
    init_gstreamer().is_ok() && BASE_ELEMENTS.iter().all(|name| element_exists(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BitrateUnit {
    Bps,
    Kbps,
}

/// One encoder element usable in a WebM container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncoderSpec {
    element: &'static str,
    codec: ContainerCodec,
    hardware: bool,
    bitrate_property: &'static str,
    bitrate_unit: BitrateUnit,
    keyframe_property: &'static str,
    /// Whether the element takes libvpx's `deadline` knob.
    vpx: bool,
}

const fn hw(
    element: &'static str,
    codec: ContainerCodec,
    bitrate_property: &'static str,
    keyframe_property: &'static str,
) -> EncoderSpec {
    EncoderSpec {
        element,
        codec,
        hardware: true,
        bitrate_property,
        bitrate_unit: BitrateUnit::Kbps,
        keyframe_property,
        vpx: false,
    }
}

/// Known encoders, hardware first within each codec.
const ENCODERS: [EncoderSpec; 13] = [
    hw("vaav1enc", ContainerCodec::Av1, "bitrate", "key-int-max"),
    hw("nvav1enc", ContainerCodec::Av1, "bitrate", "gop-size"),
    hw("qsvav1enc", ContainerCodec::Av1, "bitrate", "gop-size"),
    hw("amfav1enc", ContainerCodec::Av1, "bitrate", "gop-size"),
    EncoderSpec {
        element: "svtav1enc",
        codec: ContainerCodec::Av1,
        hardware: false,
        bitrate_property: "target-bitrate",
        bitrate_unit: BitrateUnit::Kbps,
        keyframe_property: "intra-period-length",
        vpx: false,
    },
    EncoderSpec {
        element: "av1enc",
        codec: ContainerCodec::Av1,
        hardware: false,
        bitrate_property: "target-bitrate",
        bitrate_unit: BitrateUnit::Kbps,
        keyframe_property: "keyframe-max-dist",
        vpx: false,
    },
    EncoderSpec {
        element: "rav1enc",
        codec: ContainerCodec::Av1,
        hardware: false,
        bitrate_property: "bitrate",
        bitrate_unit: BitrateUnit::Bps,
        keyframe_property: "max-key-frame-interval",
        vpx: false,
    },
    hw("vavp9enc", ContainerCodec::Vp9, "bitrate", "key-int-max"),
    hw(
        "vaapivp9enc",
        ContainerCodec::Vp9,
        "bitrate",
        "keyframe-period",
    ),
    hw("qsvvp9enc", ContainerCodec::Vp9, "bitrate", "gop-size"),
    EncoderSpec {
        element: "vp9enc",
        codec: ContainerCodec::Vp9,
        hardware: false,
        bitrate_property: "target-bitrate",
        bitrate_unit: BitrateUnit::Bps,
        keyframe_property: "keyframe-max-dist",
        vpx: true,
    },
    hw(
        "vaapivp8enc",
        ContainerCodec::Vp8,
        "bitrate",
        "keyframe-period",
    ),
    EncoderSpec {
        element: "vp8enc",
        codec: ContainerCodec::Vp8,
        hardware: false,
        bitrate_property: "target-bitrate",
        bitrate_unit: BitrateUnit::Bps,
        keyframe_property: "keyframe-max-dist",
        vpx: true,
    },
];

/// First encoder for `codec` that passes `exists`, in table order.
/// AVC and HEVC have no entries: WebM cannot carry them.
fn select_encoder(
    codec: ContainerCodec,
    allow_software: bool,
    exists: impl Fn(&str) -> bool,
) -> Option<&'static EncoderSpec> {
    ENCODERS
        .iter()
        .filter(|spec| spec.codec == codec)
        .filter(|spec| spec.hardware || allow_software)
        .find(|spec| exists(spec.element))
}

/// Rate-control properties for `spec`, as `(name, value)` strings.
fn encoder_properties(
    spec: &EncoderSpec,
    bitrate_bps: u32,
    key_frame_distance: u32,
    latency: LatencyMode,
) -> Vec<(&'static str, String)> {
    let bitrate = match spec.bitrate_unit {
        BitrateUnit::Bps => bitrate_bps,
        BitrateUnit::Kbps => (bitrate_bps / 1000).max(1),
    };
    let mut properties = vec![
        (spec.bitrate_property, bitrate.to_string()),
        (spec.keyframe_property, key_frame_distance.to_string()),
    ];
    if spec.vpx && latency == LatencyMode::Realtime {
        properties.push(("deadline", "1".to_string()));
    }
    properties
}

/// Encoder element with its rate-control properties, as a launch fragment.
fn encoder_fragment(
    spec: &EncoderSpec,
    bitrate_bps: u32,
    key_frame_distance: u32,
    latency: LatencyMode,
) -> String {
    let mut fragment = spec.element.to_string();
    for (name, value) in encoder_properties(spec, bitrate_bps, key_frame_distance, latency) {
        fragment.push_str(&format!(" {name}={value}"));
    }
    if spec.codec == ContainerCodec::Av1 {
        fragment.push_str(" ! av1parse");
    }
    fragment
}

/// Fast path: a non-live encode into a seekable file, so the muxer can
/// rewrite its header at EOS.
fn encode_launch(encoder: &str) -> String {
    format!(
        "appsrc name=frames ! videoconvert ! {encoder} ! webmmux streamable=false \
         ! filesink name=container sync=false"
    )
}

/// Recorder: the queue moves encoding off the source's thread so `appsrc`
/// stamps each buffer when it is pushed, not when the encoder frees up.
fn recorder_launch(encoder: &str) -> String {
    format!(
        "appsrc name=frames ! queue max-size-buffers=0 max-size-bytes=0 max-size-time=0 \
         ! videoconvert ! {encoder} ! webmmux streamable=true \
         ! appsink name=container sync=false"
    )
}

/// Check that an instantiated encoder accepts `track`: every rate-control
/// property must hold the value written to it, the sink pad must take the
/// frame size, and the element must open its device.
fn check_encoder_config(
    spec: &EncoderSpec,
    element: &gst::Element,
    track: &TrackConfig,
) -> Result<(), String> {
    let properties = encoder_properties(
        spec,
        track.bitrate_bps,
        track.key_frame_distance(),
        track.latency,
    );
    for (name, value) in properties {
        if element.find_property(name).is_none() {
            return Err(format!("{} has no {name} property", spec.element));
        }
        element.set_property_from_str(name, &value);
        let applied = element
            .property_value(name)
            .serialize()
            .map(|v| v.to_string())
            .unwrap_or_default();
        if applied != value {
            return Err(format!("{name}={value} rejected (kept {applied})"));
        }
    }

    let wanted = gst::Caps::builder("video/x-raw")
        .field("width", track.width as i32)
        .field("height", track.height as i32)
        .build();
    let accepts_size = element
        .static_pad("sink")
        .map(|pad| pad.query_caps(None).can_intersect(&wanted))
        .unwrap_or(false);
    if !accepts_size {
        return Err(format!("{}x{} not accepted", track.width, track.height));
    }

    let opened = element.set_state(gst::State::Ready).is_ok();
    let _ = element.set_state(gst::State::Null);
    if !opened {
        return Err("element failed to open".to_string());
    }
    Ok(())
}

fn raw_caps(width: u32, height: u32, format: PixelFormat, fps: Option<u32>) -> gst::Caps {
    let framerate = match fps {
        Some(fps) => gst::Fraction::new(fps as i32, 1),
        None => gst::Fraction::new(0, 1),
    };
    gst::Caps::builder("video/x-raw")
        .field("format", format.raw_video_name())
        .field("width", width as i32)
        .field("height", height as i32)
        .field("framerate", framerate)
        .build()
}

/// A launched `appsrc name=frames ... name=container` pipeline.
struct AppPipeline {
    name: &'static str,
    pipeline: gst::Pipeline,
    src: gst_app::AppSrc,
    sink: gst::Element,
}

impl AppPipeline {
    fn from_launch(name: &'static str, launch: &str) -> FramepressResult<Self> {
        init_gstreamer()?;
        tracing::debug!(pipeline = name, %launch, "Building pipeline");

        let element = gst::parse::launch(launch).map_err(|e| {
            FramepressError::encoder_init(format!("Failed to build {name} pipeline: {e}"))
        })?;
        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            FramepressError::encoder_init("Launch string did not produce a pipeline")
        })?;

        let src = pipeline
            .by_name("frames")
            .and_then(|e| e.dynamic_cast::<gst_app::AppSrc>().ok())
            .ok_or_else(|| FramepressError::encoder_init("Pipeline has no frame source"))?;
        let sink = pipeline
            .by_name("container")
            .ok_or_else(|| FramepressError::encoder_init("Pipeline has no container sink"))?;

        Ok(Self {
            name,
            pipeline,
            src,
            sink,
        })
    }

    /// Hand every muxed sample to `on_bytes`. The container sink must be an
    /// `appsink`.
    fn on_container_bytes(
        &self,
        on_bytes: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> FramepressResult<()> {
        let sink = self
            .sink
            .clone()
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| FramepressError::encoder_init("Container sink is not an appsink"))?;
        sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    on_bytes(map.as_slice());
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
        Ok(())
    }

    fn play(&self) -> FramepressResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            FramepressError::encoder_init(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;
        Ok(())
    }

    /// First error posted on the bus since the last check, if any.
    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(e) => Some(e.error().to_string()),
            _ => None,
        }
    }

    /// Signal end of input and block until the muxer has written its last
    /// bytes.
    fn drain(&self) -> FramepressResult<()> {
        self.src
            .end_of_stream()
            .map_err(|e| FramepressError::finalize(format!("Failed to signal EOS: {e:?}")))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| FramepressError::finalize("Pipeline has no bus"))?;
        let start = std::time::Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= EOS_TIMEOUT {
                return Err(FramepressError::finalize(format!(
                    "{} pipeline did not drain within {}s",
                    self.name,
                    EOS_TIMEOUT.as_secs()
                )));
            }
            let remaining =
                gst::ClockTime::from_nseconds((EOS_TIMEOUT - elapsed).as_nanos() as u64);
            match bus.timed_pop(remaining) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(pipeline = self.name, "EOS received; pipeline drained");
                        return Ok(());
                    }
                    gst::MessageView::Error(e) => {
                        return Err(FramepressError::finalize(format!(
                            "{} pipeline error during drain: {}",
                            self.name,
                            e.error()
                        )));
                    }
                    _ => {}
                },
                None => continue,
            }
        }
    }

    fn shutdown(&self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = self.name, error = ?e, "Failed to stop pipeline");
        }
    }
}

/// Encoder capability checks against the GStreamer registry.
pub struct GstEncoderPlatform {
    allow_software: bool,
}

#[async_trait::async_trait]
impl EncoderPlatform for GstEncoderPlatform {
    fn is_available(&self) -> bool {
        base_elements_present()
    }

    async fn is_config_supported(&self, descriptor: &CodecDescriptor) -> FramepressResult<bool> {
        init_gstreamer()?;
        let codec = descriptor.container_codec;
        let Some(spec) = select_encoder(codec, self.allow_software, element_exists) else {
            return Ok(false);
        };

        // Registry entries can outlive the driver they need; instantiate to be sure.
        let element = gst::ElementFactory::make(spec.element).build().map_err(|e| {
            FramepressError::encoder_init(format!("{} cannot be created: {e}", spec.element))
        })?;

        let config = &descriptor.config;
        let track =
            TrackConfig::from_descriptor(descriptor, config.width, config.height, config.framerate);
        match check_encoder_config(spec, &element, &track) {
            Ok(()) => Ok(true),
            Err(reason) => {
                tracing::debug!(
                    codec = descriptor.id,
                    encoder = spec.element,
                    %reason,
                    "Encoder rejected configuration"
                );
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

/// Direct encoder + WebM muxer writing into memory.
pub struct GstMuxerBackend {
    allow_software: bool,
}

impl MuxerBackend for GstMuxerBackend {
    fn open(
        &self,
        track: &TrackConfig,
        format: PixelFormat,
    ) -> FramepressResult<Box<dyn VideoTrackSink>> {
        init_gstreamer()?;
        let spec = select_encoder(track.container_codec, self.allow_software, element_exists)
            .ok_or_else(|| {
                FramepressError::encoder_init(format!("No encoder element for {}", track.codec_id))
            })?;

        let output = tempfile::Builder::new()
            .prefix("framepress-")
            .suffix(".webm")
            .tempfile()
            .map_err(|e| FramepressError::encoder_init(format!("Failed to create output: {e}")))?;
        let location = output.path().to_str().ok_or_else(|| {
            FramepressError::encoder_init("Temporary output path is not valid UTF-8")
        })?;

        let encoder = encoder_fragment(
            spec,
            track.bitrate_bps,
            track.key_frame_distance(),
            track.latency,
        );
        let pipeline = AppPipeline::from_launch("encode", &encode_launch(&encoder))?;
        pipeline.sink.set_property("location", location);

        let caps = raw_caps(track.width, track.height, format, Some(track.fps));
        pipeline.src.set_caps(Some(&caps));
        pipeline.src.set_format(gst::Format::Time);
        pipeline.src.set_is_live(false);
        pipeline.src.set_block(true);
        pipeline.src.set_max_bytes(APPSRC_MAX_BYTES);

        tracing::info!(
            codec = track.codec_id,
            encoder = spec.element,
            output = %output.path().display(),
            "Opened encode pipeline"
        );
        Ok(Box::new(GstTrackSink {
            pipeline: Arc::new(pipeline),
            output,
            surface: None,
        }))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

struct GstTrackSink {
    pipeline: Arc<AppPipeline>,
    /// Muxer output; removed when the sink is dropped.
    output: tempfile::NamedTempFile,
    surface: Option<Arc<[u8]>>,
}

#[async_trait::async_trait]
impl VideoTrackSink for GstTrackSink {
    async fn start(&mut self) -> FramepressResult<()> {
        self.pipeline.play()
    }

    fn draw(&mut self, frame: &Frame) -> FramepressResult<()> {
        self.surface = Some(frame.shared_data());
        Ok(())
    }

    async fn add(&mut self, timing: FrameTiming) -> FramepressResult<()> {
        let index = timing.index as usize;
        if let Some(err) = self.pipeline.pending_error() {
            return Err(FramepressError::frame_submit(index, err));
        }
        let pixels = self
            .surface
            .clone()
            .ok_or_else(|| FramepressError::frame_submit(index, "nothing drawn"))?;

        let mut buffer = gst::Buffer::from_slice(pixels);
        {
            let buffer = buffer.make_mut();
            buffer.set_pts(gst::ClockTime::from_nseconds(
                timing.pts().as_nanos() as u64,
            ));
            buffer.set_duration(gst::ClockTime::from_nseconds(
                timing.duration().as_nanos() as u64,
            ));
        }

        // A full queue blocks the push until the encoder catches up.
        let src = self.pipeline.src.clone();
        tokio::task::spawn_blocking(move || src.push_buffer(buffer))
            .await
            .map_err(|e| FramepressError::frame_submit(index, e.to_string()))?
            .map_err(|e| FramepressError::frame_submit(index, format!("{e:?}")))?;
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> FramepressResult<Vec<u8>> {
        let pipeline = Arc::clone(&self.pipeline);
        let drained = tokio::task::spawn_blocking(move || pipeline.drain())
            .await
            .map_err(|e| FramepressError::finalize(e.to_string()))?;
        self.pipeline.shutdown();
        drained?;

        let path = self.output.path().to_path_buf();
        tokio::fs::read(&path)
            .await
            .map_err(|e| FramepressError::finalize(format!("Failed to read muxed output: {e}")))
    }

    async fn abort(self: Box<Self>) {
        self.pipeline.shutdown();
    }
}

/// Live stream recorder.
pub struct GstStreamBackend;

impl GstStreamBackend {
    fn encoder_for(mime: &str) -> Option<&'static EncoderSpec> {
        if !mime.starts_with("video/webm") {
            return None;
        }
        match codec_from_mime(mime) {
            Some(codec) => select_encoder(codec, true, element_exists),
            // The recorder picks: VP8 first, like a browser would.
            None => select_encoder(ContainerCodec::Vp8, true, element_exists)
                .or_else(|| select_encoder(ContainerCodec::Vp9, true, element_exists)),
        }
    }
}

impl StreamBackend for GstStreamBackend {
    fn is_available(&self) -> bool {
        base_elements_present()
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        init_gstreamer().is_ok() && Self::encoder_for(mime).is_some()
    }

    fn open(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        fps: u32,
        config: &RecorderConfig,
        chunks: ChunkSender,
    ) -> FramepressResult<Box<dyn StreamRecorder>> {
        init_gstreamer().map_err(|e| FramepressError::recorder_unavailable(e.to_string()))?;
        let spec = Self::encoder_for(&config.mime_type).ok_or_else(|| {
            FramepressError::recorder_unavailable(format!("No encoder for {}", config.mime_type))
        })?;

        // One key frame per second of stream.
        let fps = fps.max(1);
        let encoder = encoder_fragment(spec, config.bitrate_bps, fps, LatencyMode::Realtime);
        let pipeline = AppPipeline::from_launch("recorder", &recorder_launch(&encoder))
            .map_err(|e| FramepressError::recorder_unavailable(e.to_string()))?;

        pipeline.src.set_caps(Some(&raw_caps(width, height, format, None)));
        pipeline.src.set_format(gst::Format::Time);
        pipeline.src.set_is_live(true);
        pipeline.src.set_do_timestamp(true);

        pipeline.on_container_bytes(move |bytes| {
            // A dropped receiver means the export was abandoned.
            let _ = chunks.send(bytes.to_vec());
        })?;

        tracing::info!(
            mime = %config.mime_type,
            encoder = spec.element,
            fps,
            "Opened stream recorder"
        );
        Ok(Box::new(GstStreamRecorder {
            pipeline: Arc::new(pipeline),
            frame_duration: gst::ClockTime::from_nseconds(1_000_000_000 / fps as u64),
            surface: None,
        }))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

struct GstStreamRecorder {
    pipeline: Arc<AppPipeline>,
    /// Each captured frame lasts until the next is due, so the last one runs
    /// to the end of the stream.
    frame_duration: gst::ClockTime,
    surface: Option<Arc<[u8]>>,
}

#[async_trait::async_trait]
impl StreamRecorder for GstStreamRecorder {
    async fn start(&mut self) -> FramepressResult<()> {
        self.pipeline
            .play()
            .map_err(|e| FramepressError::recorder_unavailable(e.to_string()))
    }

    fn draw(&mut self, frame: &Frame) -> FramepressResult<()> {
        self.surface = Some(frame.shared_data());
        Ok(())
    }

    fn request_frame(&mut self) -> FramepressResult<()> {
        if let Some(err) = self.pipeline.pending_error() {
            return Err(FramepressError::Other(anyhow::anyhow!(
                "recorder error: {err}"
            )));
        }
        let Some(pixels) = self.surface.clone() else {
            return Ok(());
        };
        let mut buffer = gst::Buffer::from_slice(pixels);
        buffer.make_mut().set_duration(self.frame_duration);
        self.pipeline.src.push_buffer(buffer).map_err(|e| {
            FramepressError::Other(anyhow::anyhow!("recorder rejected frame: {e:?}"))
        })?;
        Ok(())
    }

    async fn stop(self: Box<Self>) -> FramepressResult<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let drained = tokio::task::spawn_blocking(move || pipeline.drain())
            .await
            .map_err(|e| FramepressError::finalize(e.to_string()))?;
        self.pipeline.shutdown();
        drained
    }

    async fn abort(self: Box<Self>) {
        self.pipeline.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepress_frame_model::DEFAULT_CANDIDATES;

    #[test]
    fn test_hardware_preferred_over_software() {
        let spec = select_encoder(ContainerCodec::Vp9, true, |name| {
            matches!(name, "vp9enc" | "vaapivp9enc")
        })
        .unwrap();
        assert_eq!(spec.element, "vaapivp9enc");
    }

    #[test]
    fn test_software_requires_opt_in() {
        let only_software = |name: &str| name == "vp8enc";
        assert!(select_encoder(ContainerCodec::Vp8, false, only_software).is_none());
        assert_eq!(
            select_encoder(ContainerCodec::Vp8, true, only_software).map(|s| s.element),
            Some("vp8enc")
        );
    }

    #[test]
    fn test_webm_has_no_avc_or_hevc_encoders() {
        assert!(select_encoder(ContainerCodec::Avc, true, |_| true).is_none());
        assert!(select_encoder(ContainerCodec::Hevc, true, |_| true).is_none());
    }

    #[test]
    fn test_encoder_fragment_units() {
        let vp9 = ENCODERS.iter().find(|s| s.element == "vp9enc").unwrap();
        assert_eq!(
            encoder_fragment(vp9, 8_000_000, 300, LatencyMode::Quality),
            "vp9enc target-bitrate=8000000 keyframe-max-dist=300"
        );
        assert_eq!(
            encoder_fragment(vp9, 8_000_000, 60, LatencyMode::Realtime),
            "vp9enc target-bitrate=8000000 keyframe-max-dist=60 deadline=1"
        );

        let va = ENCODERS.iter().find(|s| s.element == "vaav1enc").unwrap();
        assert_eq!(
            encoder_fragment(va, 8_000_000, 300, LatencyMode::Quality),
            "vaav1enc bitrate=8000 key-int-max=300 ! av1parse"
        );
    }

    #[test]
    fn test_encode_muxes_into_seekable_file() {
        let launch = encode_launch("vp9enc");
        assert!(launch.contains("webmmux streamable=false ! filesink name=container"));
        assert!(!launch.contains("appsink"));
    }

    #[test]
    fn test_recorder_queues_before_encoding() {
        let launch = recorder_launch("vp8enc");
        assert!(launch.starts_with("appsrc name=frames ! queue "));
        let queue = launch.find("queue").unwrap();
        let encoder = launch.find("vp8enc").unwrap();
        assert!(queue < encoder);
    }

    #[test]
    fn test_recorder_key_frames_follow_fps() {
        let vp8 = ENCODERS.iter().find(|s| s.element == "vp8enc").unwrap();
        let properties = encoder_properties(vp8, 8_000_000, 30, LatencyMode::Realtime);
        assert!(properties.contains(&("keyframe-max-dist", "30".to_string())));
        assert!(properties.contains(&("deadline", "1".to_string())));
    }

    #[test]
    fn test_config_check_rejects_unsupported_frame_size() {
        if init_gstreamer().is_err() || !element_exists("vp8enc") {
            return;
        }
        let spec = ENCODERS.iter().find(|s| s.element == "vp8enc").unwrap();
        let element = gst::ElementFactory::make("vp8enc").build().unwrap();

        let mut track = TrackConfig::from_descriptor(&DEFAULT_CANDIDATES[2], 1920, 1080, 60);
        assert_eq!(check_encoder_config(spec, &element, &track), Ok(()));

        track.width = 100_000;
        assert!(check_encoder_config(spec, &element, &track).is_err());
    }
}
