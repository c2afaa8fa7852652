//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Export defaults used when the caller does not override them.
    pub export: ExportDefaults,

    /// Fast (direct encoder) path settings.
    pub fast_path: FastPathConfig,

    /// Fallback (paced stream recorder) path settings.
    pub fallback: FallbackConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Frames per second.
    pub fps: u32,

    /// Intended animation duration in milliseconds.
    pub duration_ms: u64,

    /// Directory exported containers are written to.
    pub output_dir: PathBuf,
}

/// Settings for the direct encoder path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FastPathConfig {
    /// Accept software encoders when probing. When false, only hardware
    /// encoders make a codec candidate "supported".
    pub allow_software_encoders: bool,
}

/// Settings for the paced stream-recorder path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Target bitrate for negotiated recorder formats.
    pub bitrate_bps: u32,

    /// Bitrate used when no candidate format reports support.
    pub last_resort_bitrate_bps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framepress=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 60,
            duration_ms: 10_000,
            output_dir: default_output_dir(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            bitrate_bps: 8_000_000,
            last_resort_bitrate_bps: 6_000_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framepress").join("config.json")
}

/// Default directory for exported videos.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_VIDEOS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Videos")
        });
    base.join("framepress")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fallback_bitrates() {
        let config = AppConfig::default();
        assert_eq!(config.export.fps, 60);
        assert_eq!(config.export.duration_ms, 10_000);
        assert!(!config.fast_path.allow_software_encoders);
        assert_eq!(config.fallback.bitrate_bps, 8_000_000);
        assert_eq!(config.fallback.last_resort_bitrate_bps, 6_000_000);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "fast_path": { "allow_software_encoders": true } }"#)
                .unwrap();
        assert!(config.fast_path.allow_software_encoders);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.export.fps, 60);
    }

    #[test]
    fn test_save_then_load_from_path() {
        let dir = std::env::temp_dir().join(format!("framepress-config-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.export.fps = 30;
        config.logging.json = true;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.fps, 30);
        assert!(loaded.logging.json);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("framepress-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.fps, 60);

        std::fs::remove_dir_all(&dir).ok();
    }
}
