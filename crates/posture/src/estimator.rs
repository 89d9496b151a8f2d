//! Landmark selection and inclination

use detector::Detection;
use tracing::debug;

use crate::{Landmark, PostureConfig, PostureError, PostureSample};

/// Ear-to-nose inclination in degrees: `atan(dy / dx)`.
///
/// Fails with `DivisionByZero` when both points share an x coordinate.
pub fn inclination(ear: (f32, f32), nose: (f32, f32)) -> Result<f32, PostureError> {
    let dx = nose.0 - ear.0;
    if dx == 0.0 {
        return Err(PostureError::DivisionByZero);
    }
    let slope = (nose.1 - ear.1) / dx;
    Ok(slope.atan().to_degrees())
}

/// Picks the ear and nose landmarks out of a frame's detections
pub struct PostureEstimator {
    config: PostureConfig,
}

impl PostureEstimator {
    pub fn new(config: PostureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostureConfig {
        &self.config
    }

    /// Estimate posture from detections in full-frame pixels
    pub fn estimate(&self, detections: &[Detection]) -> PostureSample {
        let ear = best_landmark(detections, &self.config.ear_classes);
        let nose = best_landmark(detections, &self.config.nose_classes);

        let angle = match (ear, nose) {
            (Some(ear), Some(nose)) => match inclination(ear.position(), nose.position()) {
                Ok(angle) => Some(angle),
                Err(e) => {
                    debug!("No reliable angle this frame: {}", e);
                    None
                }
            },
            _ => None,
        };

        PostureSample { ear, nose, angle }
    }
}

/// Highest-confidence detection among `classes`; the first one seen wins ties
fn best_landmark(detections: &[Detection], classes: &[usize]) -> Option<Landmark> {
    let mut best: Option<&Detection> = None;
    for det in detections.iter().filter(|d| classes.contains(&d.class_id)) {
        if best.map_or(true, |b| det.confidence > b.confidence) {
            best = Some(det);
        }
    }

    best.map(|det| {
        let (x, y) = det.bbox.center();
        Landmark {
            x,
            y,
            confidence: det.confidence,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector::Bbox;
    use proptest::prelude::*;

    fn det(cx: f32, cy: f32, class_id: usize, confidence: f32) -> Detection {
        Detection {
            bbox: Bbox::new(cx - 5.0, cy - 5.0, 10.0, 10.0),
            class_id,
            confidence,
        }
    }

    #[test]
    fn test_forty_five_degrees() {
        let angle = inclination((0.0, 0.0), (10.0, 10.0)).unwrap();
        assert!((angle - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_vertical_alignment_is_division_by_zero() {
        assert_eq!(
            inclination((0.0, 0.0), (0.0, 10.0)),
            Err(PostureError::DivisionByZero)
        );
    }

    #[test]
    fn test_estimate_vertical_reports_no_angle() {
        let estimator = PostureEstimator::new(PostureConfig::default());
        let sample = estimator.estimate(&[det(100.0, 100.0, 0, 0.9), det(100.0, 150.0, 1, 0.9)]);
        assert!(sample.ear.is_some());
        assert!(sample.nose.is_some());
        assert_eq!(sample.angle, None);
    }

    #[test]
    fn test_missing_landmark_reports_no_angle() {
        let estimator = PostureEstimator::new(PostureConfig::default());
        let sample = estimator.estimate(&[det(100.0, 100.0, 0, 0.9)]);
        assert!(sample.nose.is_none());
        assert_eq!(sample.angle, None);
        assert_eq!(estimator.estimate(&[]), PostureSample::default());
    }

    #[test]
    fn test_both_nose_classes_count() {
        let estimator = PostureEstimator::new(PostureConfig::default());
        let sample = estimator.estimate(&[det(0.0, 0.0, 0, 0.9), det(10.0, -10.0, 2, 0.5)]);
        assert!((sample.angle.unwrap() + 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_highest_confidence_landmark_wins() {
        let estimator = PostureEstimator::new(PostureConfig::default());
        let sample = estimator.estimate(&[
            det(0.0, 0.0, 0, 0.9),
            det(10.0, 10.0, 1, 0.4),
            det(10.0, 0.0, 2, 0.8),
            det(20.0, 20.0, 1, 0.6),
        ]);
        let nose = sample.nose.unwrap();
        assert_eq!(nose.position(), (10.0, 0.0));
        assert!(sample.angle.unwrap().abs() < 1e-4);
    }

    #[test]
    fn test_other_classes_ignored() {
        let estimator = PostureEstimator::new(PostureConfig::default());
        let sample = estimator.estimate(&[det(0.0, 0.0, 3, 0.99), det(10.0, 10.0, 1, 0.9)]);
        assert!(sample.ear.is_none());
    }

    proptest! {
        #[test]
        fn prop_angle_is_bounded(
            ex in -1000.0f32..1000.0, ey in -1000.0f32..1000.0,
            nx in -1000.0f32..1000.0, ny in -1000.0f32..1000.0,
        ) {
            match inclination((ex, ey), (nx, ny)) {
                Ok(angle) => prop_assert!((-90.0..=90.0).contains(&angle)),
                Err(e) => prop_assert_eq!(e, PostureError::DivisionByZero),
            }
        }
    }
}
