//! Encode results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which encode path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMethod {
    /// Direct encoder + muxer, unpaced.
    Fast,
    /// Live stream recorder, paced against the wall clock.
    Fallback,
}

impl EncodeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodeMethod::Fast => "fast",
            EncodeMethod::Fallback => "fallback",
        }
    }
}

/// Elapsed-time metrics of one encode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodeDurations {
    /// Seconds spent encoding (start of the path to finalized bytes).
    pub encode: f64,
}

/// Output of either encode path.
///
/// `frame_count` always equals the length of the encoded frame buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeResult {
    /// Complete container bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Number of frames encoded.
    pub frame_count: usize,

    /// Codec identifier actually used.
    pub codec: String,

    /// Path that produced the container.
    pub method: EncodeMethod,

    /// Human-readable description of the codec or method.
    pub label: String,

    /// Container mime type.
    pub mime_type: String,

    pub durations: EncodeDurations,
}

impl EncodeResult {
    /// Size of the container in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Encode time.
    pub fn encode_duration(&self) -> Duration {
        Duration::from_secs_f64(self.durations.encode.max(0.0))
    }

    /// How many times faster than real time the encode ran for content of
    /// `content` length. `None` if the encode took no measurable time.
    pub fn speedup(&self, content: Duration) -> Option<f64> {
        (self.durations.encode > 0.0).then(|| content.as_secs_f64() / self.durations.encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncodeResult {
        EncodeResult {
            bytes: vec![0x1a, 0x45, 0xdf, 0xa3],
            frame_count: 600,
            codec: "vp09.00.50.08".to_string(),
            method: EncodeMethod::Fast,
            label: "VP9 (Balanced)".to_string(),
            mime_type: "video/webm".to_string(),
            durations: EncodeDurations { encode: 2.5 },
        }
    }

    #[test]
    fn test_speedup_against_content_duration() {
        let result = sample();
        let speedup = result.speedup(Duration::from_secs(10)).unwrap();
        assert!((speedup - 4.0).abs() < 1e-9);
        assert_eq!(result.encode_duration(), Duration::from_millis(2500));
    }

    #[test]
    fn test_metadata_serializes_without_bytes() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["frame_count"], 600);
        assert_eq!(json["method"], "fast");
        assert!(json.get("bytes").is_none());
    }
}
