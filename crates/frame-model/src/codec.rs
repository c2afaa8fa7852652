//! Codec candidates, probe results, and recorder formats.
//!
//! Descriptors are static configuration: the candidate list is fixed at
//! compile time and never mutated. Per-attempt settings (actual frame size and
//! rate) are carried by [`TrackConfig`] instead.

use serde::{Deserialize, Serialize};

/// Codec tag understood by the WebM-family muxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerCodec {
    Av1,
    Vp9,
    Vp8,
    Avc,
    Hevc,
}

impl ContainerCodec {
    /// Map a codec identifier string to its muxer tag by prefix.
    /// Unknown identifiers map to VP9.
    pub fn from_codec_id(id: &str) -> Self {
        if id.starts_with("av01") {
            ContainerCodec::Av1
        } else if id.starts_with("vp09") {
            ContainerCodec::Vp9
        } else if id.starts_with("vp08") {
            ContainerCodec::Vp8
        } else if id.starts_with("avc1") {
            ContainerCodec::Avc
        } else if id.starts_with("hev") || id.starts_with("hvc") {
            ContainerCodec::Hevc
        } else {
            ContainerCodec::Vp9
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ContainerCodec::Av1 => "av1",
            ContainerCodec::Vp9 => "vp9",
            ContainerCodec::Vp8 => "vp8",
            ContainerCodec::Avc => "avc",
            ContainerCodec::Hevc => "hevc",
        }
    }
}

/// Encoder latency preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    /// Favor output quality over encode latency.
    #[default]
    Quality,
    /// Favor low latency.
    Realtime,
}

/// Encoder configuration a candidate is probed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub bitrate_bps: u32,
    pub framerate: u32,
    pub latency: LatencyMode,
    /// Seconds between forced key frames.
    pub key_frame_interval_secs: u32,
}

/// One candidate encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecDescriptor {
    /// Stable codec identifier (e.g. `"vp09.00.50.08"`).
    pub id: &'static str,

    /// Human-readable label.
    pub label: &'static str,

    /// Priority rank; lower is tried first.
    pub rank: u8,

    /// Muxer codec tag.
    pub container_codec: ContainerCodec,

    /// Configuration probed and used for encoding.
    pub config: EncoderConfig,
}

const PROBE_WIDTH: u32 = 1920;
const PROBE_HEIGHT: u32 = 1080;
const PROBE_FRAMERATE: u32 = 60;
const KEY_FRAME_INTERVAL_SECS: u32 = 5;

/// Built-in candidates in priority order: highest efficiency first.
pub const DEFAULT_CANDIDATES: [CodecDescriptor; 3] = [
    CodecDescriptor {
        id: "av01.0.08M.08",
        label: "AV1 (High Efficiency)",
        rank: 1,
        container_codec: ContainerCodec::Av1,
        config: EncoderConfig {
            width: PROBE_WIDTH,
            height: PROBE_HEIGHT,
            bitrate_bps: 8_000_000,
            framerate: PROBE_FRAMERATE,
            latency: LatencyMode::Quality,
            key_frame_interval_secs: KEY_FRAME_INTERVAL_SECS,
        },
    },
    CodecDescriptor {
        id: "vp09.00.50.08",
        label: "VP9 (Balanced)",
        rank: 2,
        container_codec: ContainerCodec::Vp9,
        config: EncoderConfig {
            width: PROBE_WIDTH,
            height: PROBE_HEIGHT,
            bitrate_bps: 8_000_000,
            framerate: PROBE_FRAMERATE,
            latency: LatencyMode::Quality,
            key_frame_interval_secs: KEY_FRAME_INTERVAL_SECS,
        },
    },
    CodecDescriptor {
        id: "vp08.0.1",
        label: "VP8 (Fallback)",
        rank: 3,
        container_codec: ContainerCodec::Vp8,
        config: EncoderConfig {
            width: PROBE_WIDTH,
            height: PROBE_HEIGHT,
            bitrate_bps: 6_000_000,
            framerate: PROBE_FRAMERATE,
            latency: LatencyMode::Quality,
            key_frame_interval_secs: KEY_FRAME_INTERVAL_SECS,
        },
    },
];

/// Why probing found nothing usable. Diagnostic only; both reasons route
/// the export to the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// The platform has no encoder API at all.
    ApiUnavailable,
    /// The API exists but rejected every candidate.
    NoCandidateSupported,
}

/// Outcome of probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapabilityResult {
    Supported(CodecDescriptor),
    Unsupported(UnsupportedReason),
}

impl CapabilityResult {
    pub fn is_supported(&self) -> bool {
        matches!(self, CapabilityResult::Supported(_))
    }

    pub fn descriptor(&self) -> Option<&CodecDescriptor> {
        match self {
            CapabilityResult::Supported(descriptor) => Some(descriptor),
            CapabilityResult::Unsupported(_) => None,
        }
    }
}

/// Encoder settings for one export attempt: a descriptor's configuration
/// bound to the actual frame size and rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackConfig {
    pub codec_id: &'static str,
    pub container_codec: ContainerCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_bps: u32,
    pub latency: LatencyMode,
    pub key_frame_interval_secs: u32,
}

impl TrackConfig {
    pub fn from_descriptor(
        descriptor: &CodecDescriptor,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Self {
        Self {
            codec_id: descriptor.id,
            container_codec: descriptor.container_codec,
            width,
            height,
            fps,
            bitrate_bps: descriptor.config.bitrate_bps,
            latency: descriptor.config.latency,
            key_frame_interval_secs: descriptor.config.key_frame_interval_secs,
        }
    }

    /// Key-frame distance in frames (at least 1).
    pub fn key_frame_distance(&self) -> u32 {
        self.key_frame_interval_secs.saturating_mul(self.fps).max(1)
    }
}

/// Stream recorder output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Container mime type, optionally with a `codecs=` parameter.
    pub mime_type: String,

    /// Explicitly negotiated codec, or `None` to let the recorder choose.
    pub codec: Option<ContainerCodec>,

    pub bitrate_bps: u32,
}

impl RecorderConfig {
    pub fn new(mime_type: &str, bitrate_bps: u32) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            codec: codec_from_mime(mime_type),
            bitrate_bps,
        }
    }

    /// Identifier reported in encode results: the codec name, or the bare
    /// container when no codec was negotiated.
    pub fn codec_label(&self) -> &'static str {
        self.codec.map(ContainerCodec::name).unwrap_or("webm")
    }
}

/// Recorder formats in priority order. The last entry names no codec.
pub const FALLBACK_MIME_CANDIDATES: [&str; 3] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// Container mime type used when nothing reports support.
pub const LAST_RESORT_MIME: &str = "video/webm";

/// Parse the `codecs=` parameter of a mime type.
pub fn codec_from_mime(mime: &str) -> Option<ContainerCodec> {
    let (_, params) = mime.split_once(';')?;
    let codecs = params
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("codecs="))?;
    let first = codecs.trim_matches('"').split(',').next()?.trim();
    match first {
        "vp9" | "vp09" => Some(ContainerCodec::Vp9),
        "vp8" | "vp08" => Some(ContainerCodec::Vp8),
        "av1" | "av01" => Some(ContainerCodec::Av1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_are_rank_ordered() {
        let ranks: Vec<u8> = DEFAULT_CANDIDATES.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(DEFAULT_CANDIDATES[0].id, "av01.0.08M.08");
        assert_eq!(DEFAULT_CANDIDATES[2].config.bitrate_bps, 6_000_000);
    }

    #[test]
    fn test_candidate_tags_match_ids() {
        for candidate in DEFAULT_CANDIDATES {
            assert_eq!(
                ContainerCodec::from_codec_id(candidate.id),
                candidate.container_codec
            );
        }
    }

    #[test]
    fn test_codec_id_mapping() {
        assert_eq!(
            ContainerCodec::from_codec_id("avc1.42001f"),
            ContainerCodec::Avc
        );
        assert_eq!(
            ContainerCodec::from_codec_id("hev1.1.6.L93"),
            ContainerCodec::Hevc
        );
        assert_eq!(
            ContainerCodec::from_codec_id("mystery"),
            ContainerCodec::Vp9
        );
    }

    #[test]
    fn test_track_config_binds_actual_size() {
        let track = TrackConfig::from_descriptor(&DEFAULT_CANDIDATES[1], 640, 360, 30);
        assert_eq!((track.width, track.height, track.fps), (640, 360, 30));
        assert_eq!(track.bitrate_bps, 8_000_000);
        assert_eq!(track.key_frame_distance(), 150);
        // The static descriptor is untouched.
        assert_eq!(DEFAULT_CANDIDATES[1].config.width, 1920);
    }

    #[test]
    fn test_mime_codec_parsing() {
        assert_eq!(
            codec_from_mime("video/webm;codecs=vp9"),
            Some(ContainerCodec::Vp9)
        );
        assert_eq!(
            codec_from_mime("video/webm; codecs=\"vp8\""),
            Some(ContainerCodec::Vp8)
        );
        assert_eq!(codec_from_mime("video/webm"), None);
        assert_eq!(
            RecorderConfig::new("video/webm", 6_000_000).codec_label(),
            "webm"
        );
    }

    #[test]
    fn test_capability_result_accessors() {
        let supported = CapabilityResult::Supported(DEFAULT_CANDIDATES[1]);
        assert!(supported.is_supported());
        assert_eq!(supported.descriptor().map(|d| d.id), Some("vp09.00.50.08"));

        let unsupported = CapabilityResult::Unsupported(UnsupportedReason::ApiUnavailable);
        assert!(!unsupported.is_supported());
        assert!(unsupported.descriptor().is_none());
    }
}
