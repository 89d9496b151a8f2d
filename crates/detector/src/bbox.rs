//! Boxes, detections and non-maximum suppression

use serde::{Deserialize, Serialize};

/// Axis-aligned box, top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bbox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Scale position and size independently per axis
    pub fn scale(&self, sx: f32, sy: f32) -> Bbox {
        Bbox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    pub fn intersection_area(&self, other: &Bbox) -> f32 {
        let l = self.x.max(other.x);
        let r = (self.x + self.width).min(other.x + other.width);
        let t = self.y.max(other.y);
        let b = (self.y + self.height).min(other.y + other.height);
        (r - l).max(0.0) * (b - t).max(0.0)
    }

    /// Intersection over union. Degenerate pairs (zero union) overlap by 0.
    pub fn iou(&self, other: &Bbox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// A surviving detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: Bbox,
    pub class_id: usize,
    pub confidence: f32,
}

/// Greedy class-agnostic NMS.
///
/// Candidates are visited by descending score (stable, so equal scores keep
/// input order). A candidate is kept unless its IoU with an already kept box
/// exceeds `iou_threshold`. Returns indices into `boxes`, highest score first.
pub fn non_max_suppression(boxes: &[Bbox], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());

    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut kept: Vec<usize> = Vec::with_capacity(order.len());
    for index in order {
        let suppressed = kept
            .iter()
            .any(|&prev| boxes[prev].iou(&boxes[index]) > iou_threshold);
        if !suppressed {
            kept.push(index);
        }
    }
    kept
}
