//! Posture configuration

use serde::{Deserialize, Serialize};

use crate::PostureClass;

/// Posture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Angles below this are leaning back (degrees)
    pub posterior_threshold: f32,

    /// Angles above this are leaning forward (degrees)
    pub anterior_threshold: f32,

    /// Detector classes that mark the ear
    pub ear_classes: Vec<usize>,

    /// Detector classes that mark the nose
    pub nose_classes: Vec<usize>,

    /// Draw boxes and readouts onto frames
    pub annotate: bool,

    /// TTF font for labels (boxes and lines are drawn without one)
    pub font_path: Option<String>,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            posterior_threshold: -13.0,
            anterior_threshold: 12.0,
            ear_classes: vec![0],
            nose_classes: vec![1, 2],
            annotate: true,
            font_path: None,
        }
    }
}

impl PostureConfig {
    /// Classify an inclination angle
    pub fn classify(&self, angle: f32) -> PostureClass {
        if angle < self.posterior_threshold || angle > self.anterior_threshold {
            PostureClass::Poor
        } else {
            PostureClass::Good
        }
    }
}
