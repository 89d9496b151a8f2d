//! Heads-Up Frame Pipeline
//!
//! Wires the capture thread (source → detector → posture → recorder) to the
//! display tick through a bounded queue, and manages worker restarts.

pub mod config;
mod controller;
mod display;
mod worker;

pub use config::{AppConfig, DisplayConfig};
pub use controller::CaptureController;
pub use display::{run_display, DisplayTicker, FrameRenderer, ScaledPreview};
pub use worker::{build_worker, CaptureWorker, FrameProcessor, WorkerExit, WorkerReport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("Camera error: {0}")]
    Camera(#[from] camera_capture::CameraError),

    #[error("Detector error: {0}")]
    Detector(#[from] detector::DetectorError),

    #[error("Posture error: {0}")]
    Posture(#[from] posture::PostureError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] recorder::RecorderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture worker panicked")]
    WorkerPanicked,

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Cooperative stop signal shared between a capture worker and its owner
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), PipelineError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
