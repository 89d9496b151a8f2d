//! Camera Capture Library for the posture monitor
//!
//! Provides the RGB frame type shared by every stage of the pipeline and the
//! `FrameSource` seam that camera drivers plug into.
//! Supports:
//! - Synthetic test-pattern source (`stub://WxH`)
//! - Still-image directory replay
//! - Video device discovery on Linux

pub mod devices;
pub mod frame;
pub mod source;

pub use devices::list_video_devices;
pub use frame::VideoFrame;
pub use source::{FrameSource, ImageDirSource, SyntheticSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Source locator (`stub://640x480`, or a directory of still images)
    pub source: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Replay image directories forever instead of ending the stream
    pub looping: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "stub://640x480".to_string(),
            width: 640,
            height: 480,
            looping: false,
        }
    }
}

impl CameraConfig {
    /// Open the frame source this configuration points at
    pub fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        open_source(&self.source, self.width, self.height, self.looping)
    }
}

/// Open a frame source from a locator string.
///
/// `stub://WxH` yields a synthetic source; anything else is treated as a
/// directory of still images. `width`/`height` are used for `stub://` without
/// an explicit size.
pub fn open_source(
    locator: &str,
    width: u32,
    height: u32,
    looping: bool,
) -> Result<Box<dyn FrameSource>, CameraError> {
    if let Some(spec) = locator.strip_prefix("stub://") {
        let (w, h) = parse_size(spec).unwrap_or((width, height));
        return Ok(Box::new(SyntheticSource::new(w, h)));
    }

    let source = ImageDirSource::open(locator)?.looping(looping);
    Ok(Box::new(source))
}

fn parse_size(spec: &str) -> Option<(u32, u32)> {
    let (w, h) = spec.split_once('x')?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_locator_with_size() {
        let mut source = open_source("stub://32x16", 640, 480, false).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (32, 16));
    }

    #[test]
    fn test_stub_locator_falls_back_to_config_size() {
        let mut source = open_source("stub://", 8, 4, false).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
    }

    #[test]
    fn test_missing_directory_is_open_error() {
        let result = open_source("/definitely/not/here", 640, 480, false);
        assert!(matches!(result, Err(CameraError::Open(_))));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_size("0x10"), None);
        assert_eq!(parse_size("wide"), None);
    }
}
