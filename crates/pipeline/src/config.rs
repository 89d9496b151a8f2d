//! Application configuration
//!
//! Loaded once at startup: built-in defaults, then an optional TOML file,
//! then `HEADSUP__<SECTION>__<KEY>` environment overrides.

use alerting::AlarmConfig;
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use detector::DecoderConfig;
use posture::PostureConfig;
use recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use crate::PipelineError;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "heads-up.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HEADSUP";

/// Display loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display tick period (ms); also the capture back-off when the queue is full
    pub interval_ms: u64,
    /// Display queue capacity (frames)
    pub capacity: usize,
    /// Preview downscale factor
    pub scale: u32,
    /// Wait between cancelling a worker and starting its replacement (ms)
    pub restart_grace_ms: u64,
    /// Write the latest preview frame here (None = keep in memory only)
    pub preview_path: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            capacity: display_queue::DEFAULT_CAPACITY,
            scale: 2,
            restart_grace_ms: 1_000,
            preview_path: None,
        }
    }
}

impl DisplayConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn restart_grace(&self) -> Duration {
        Duration::from_millis(self.restart_grace_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level: trace, debug, info, warn or error
    pub log_level: String,
    pub camera: CameraConfig,
    pub decoder: DecoderConfig,
    pub posture: PostureConfig,
    pub alarm: AlarmConfig,
    pub recorder: RecorderConfig,
    pub display: DisplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            camera: CameraConfig::default(),
            decoder: DecoderConfig::default(),
            posture: PostureConfig::default(),
            alarm: AlarmConfig::default(),
            recorder: RecorderConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; without one,
    /// `heads-up.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parsed log level
    pub fn level(&self) -> Result<Level, PipelineError> {
        self.log_level
            .parse()
            .map_err(|_| PipelineError::Config(format!("unknown log level '{}'", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.display.interval_ms, 50);
        assert_eq!(config.display.capacity, 2);
        assert_eq!(config.recorder.retention_max, 5);
        assert_eq!(config.decoder.input_size, 416);
        assert_eq!(config.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[recorder]\nretention_max = 3\n\n[display]\nscale = 4"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.recorder.retention_max, 3);
        assert_eq!(config.recorder.poor_timeout_ms, 5_000);
        assert_eq!(config.display.scale, 4);
        assert_eq!(config.level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(AppConfig::load(Some(Path::new("/no/such/heads-up.toml"))).is_err());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.level().is_err());
    }
}
