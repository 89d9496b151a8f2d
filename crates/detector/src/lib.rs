//! Landmark detector
//!
//! Turns raw per-anchor network output into filtered, non-overlapping
//! bounding boxes:
//! - Per-row argmax over class scores and confidence filtering
//! - Normalized center/size to network-pixel top-left conversion
//! - Greedy class-agnostic non-maximum suppression
//!
//! The network itself sits behind the `Detector` trait.

pub mod bbox;
pub mod config;
pub mod decode;
pub mod output;
pub mod tract;

pub use bbox::{non_max_suppression, Bbox, Detection};
pub use config::DecoderConfig;
pub use decode::{decode, Decoded};
pub use output::RawDetectionOutput;
pub use tract::TractDetector;

use camera_capture::VideoFrame;
use thiserror::Error;
use tracing::warn;

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Invalid output shape: {0}")]
    OutputShape(String),
}

/// Opaque detection network: image in, raw output layers out
pub trait Detector: Send {
    fn name(&self) -> &'static str;

    fn infer(&mut self, frame: &VideoFrame) -> Result<RawDetectionOutput, DetectorError>;
}

/// Detector used when no model is configured. Never finds anything.
pub struct NullDetector;

impl NullDetector {
    pub fn new() -> Self {
        warn!("No landmark model configured. Posture will never be evaluated.");
        Self
    }
}

impl Default for NullDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for NullDetector {
    fn name(&self) -> &'static str {
        "null"
    }

    fn infer(&mut self, _frame: &VideoFrame) -> Result<RawDetectionOutput, DetectorError> {
        Ok(RawDetectionOutput::default())
    }
}

/// Build the detector a configuration asks for
pub fn from_config(config: &DecoderConfig) -> Result<Box<dyn Detector>, DetectorError> {
    match &config.model_path {
        Some(path) => Ok(Box::new(TractDetector::new(path, config.input_size)?)),
        None => Ok(Box::new(NullDetector::new())),
    }
}
