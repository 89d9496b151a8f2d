//! Posture samples

use serde::{Deserialize, Serialize};

use crate::PostureConfig;

/// Good/poor posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostureClass {
    Good,
    Poor,
}

/// A landmark: center of the chosen detection box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Landmark {
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Per-frame posture estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<Landmark>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nose: Option<Landmark>,

    /// Ear-to-nose inclination in degrees; absent when a landmark is missing
    /// or the geometry is degenerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

impl PostureSample {
    /// Classification, if an angle was measured
    pub fn class(&self, config: &PostureConfig) -> Option<PostureClass> {
        self.angle.map(|angle| config.classify(angle))
    }

    pub fn has_angle(&self) -> bool {
        self.angle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_requires_angle() {
        let config = PostureConfig::default();
        assert_eq!(PostureSample::default().class(&config), None);

        let sample = PostureSample {
            angle: Some(30.0),
            ..Default::default()
        };
        assert_eq!(sample.class(&config), Some(PostureClass::Poor));
    }
}
