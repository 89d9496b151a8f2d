//! Session Recorder
//!
//! Drives the two posture recording sessions:
//! - Poor posture: debounced evidence clip, alarm after a sustained episode
//! - Good posture: rolling archive of fixed-length clips
//! - Retention of the good-posture archive (oldest first)

mod config;
mod retention;
mod session;
mod sink;

pub use config::RecorderConfig;
pub use retention::{latest_clip, RetentionManager};
pub use session::{
    clip_path, ClipKind, FrameOutcome, GoodPhase, PoorPhase, Recorder, RecorderStats,
};
pub use sink::{MjpegSink, MjpegSinkFactory, SinkFactory, VideoSink};

use std::path::PathBuf;
use thiserror::Error;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Failed to open sink {path}: {reason}")]
    SinkOpen { path: PathBuf, reason: String },
    #[error("Failed to write frame: {0}")]
    SinkWrite(String),
    #[error("Frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
