//! Decoder configuration

use serde::{Deserialize, Serialize};

/// Decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Rows scoring at or below this confidence are dropped
    pub confidence_threshold: f32,

    /// IoU above which a lower-scoring box is suppressed
    pub suppression_threshold: f32,

    /// Square network input size in pixels
    pub input_size: u32,

    /// ONNX model path (None = no detection)
    pub model_path: Option<String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.20,
            suppression_threshold: 0.40,
            input_size: 416,
            model_path: None,
        }
    }
}

impl DecoderConfig {
    /// Factors that map network-pixel boxes onto a `width`×`height` frame
    pub fn scale_to(&self, width: u32, height: u32) -> (f32, f32) {
        let size = self.input_size as f32;
        (width as f32 / size, height as f32 / size)
    }
}
