//! Recorder configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory for poor-posture evidence clips
    pub poor_dir: PathBuf,
    /// Directory for the good-posture archive
    pub good_dir: PathBuf,
    /// Sustained poor posture before the alarm (ms)
    pub poor_timeout_ms: u64,
    /// Capture pause after the alarm (ms)
    pub freeze_ms: u64,
    /// Length of one good-posture clip (ms)
    pub good_window_ms: u64,
    /// Good-posture clips kept on disk
    pub retention_max: usize,
    /// Nominal clip frame rate
    pub fps: u32,
    /// Clip file extension
    pub extension: String,
    /// JPEG quality of clip frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            poor_dir: PathBuf::from("recordings/poor"),
            good_dir: PathBuf::from("recordings/good"),
            poor_timeout_ms: 5_000,
            freeze_ms: 3_000,
            good_window_ms: 10_000,
            retention_max: 5,
            fps: 10,
            extension: "mjpeg".to_string(),
            jpeg_quality: 85,
        }
    }
}

impl RecorderConfig {
    pub fn poor_timeout(&self) -> Duration {
        Duration::from_millis(self.poor_timeout_ms)
    }

    pub fn freeze(&self) -> Duration {
        Duration::from_millis(self.freeze_ms)
    }

    pub fn good_window(&self) -> Duration {
        Duration::from_millis(self.good_window_ms)
    }
}
