//! Raw output decoding

use ndarray::{s, ArrayView1};
use tracing::debug;

use crate::bbox::{non_max_suppression, Bbox, Detection};
use crate::output::{RawDetectionOutput, CLASS_OFFSET};
use crate::DecoderConfig;

/// Decoder result: parallel arrays for every candidate that passed the
/// confidence filter, plus the indices that survived suppression.
/// Boxes are in network-pixel space.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub boxes: Vec<Bbox>,
    pub class_ids: Vec<usize>,
    pub confidences: Vec<f32>,
    pub keep: Vec<usize>,
}

impl Decoded {
    /// Surviving detections in network-pixel space
    pub fn detections(&self) -> Vec<Detection> {
        self.detections_scaled(1.0, 1.0)
    }

    /// Surviving detections rescaled by `(sx, sy)`, typically
    /// `(orig_width / input_size, orig_height / input_size)`
    pub fn detections_scaled(&self, sx: f32, sy: f32) -> Vec<Detection> {
        self.keep
            .iter()
            .map(|&i| Detection {
                bbox: self.boxes[i].scale(sx, sy),
                class_id: self.class_ids[i],
                confidence: self.confidences[i],
            })
            .collect()
    }

    /// Number of surviving detections
    pub fn len(&self) -> usize {
        self.keep.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty()
    }
}

/// Decode every row of every layer, filter by confidence, then suppress
/// overlapping boxes. Malformed rows are skipped.
pub fn decode(output: &RawDetectionOutput, config: &DecoderConfig) -> Decoded {
    let size = config.input_size as f32;
    let mut decoded = Decoded::default();
    let mut malformed = 0usize;

    for layer in output.layers() {
        for row in layer.rows() {
            match decode_row(row, size) {
                RowDecode::Candidate(bbox, class_id, confidence) => {
                    if confidence > config.confidence_threshold {
                        decoded.boxes.push(bbox);
                        decoded.class_ids.push(class_id);
                        decoded.confidences.push(confidence);
                    }
                }
                RowDecode::Malformed => malformed += 1,
            }
        }
    }

    decoded.keep = non_max_suppression(
        &decoded.boxes,
        &decoded.confidences,
        config.suppression_threshold,
    );

    debug!(
        "Decoded {} rows: {} candidates, {} kept, {} malformed",
        output.row_count(),
        decoded.boxes.len(),
        decoded.keep.len(),
        malformed
    );

    decoded
}

enum RowDecode {
    Candidate(Bbox, usize, f32),
    Malformed,
}

fn decode_row(row: ArrayView1<'_, f32>, size: f32) -> RowDecode {
    if row.len() <= CLASS_OFFSET || row.iter().any(|v| !v.is_finite()) {
        return RowDecode::Malformed;
    }

    // First maximum wins, like argmax
    let mut class_id = 0;
    let mut confidence = f32::NEG_INFINITY;
    for (i, &score) in row.slice(s![CLASS_OFFSET..]).iter().enumerate() {
        if score > confidence {
            class_id = i;
            confidence = score;
        }
    }

    let width = row[2] * size;
    let height = row[3] * size;
    let x = row[0] * size - width / 2.0;
    let y = row[1] * size - height / 2.0;

    RowDecode::Candidate(Bbox::new(x, y, width, height), class_id, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cx: f32, cy: f32, w: f32, h: f32, scores: &[f32]) -> Vec<f32> {
        let mut r = vec![cx, cy, w, h, 1.0];
        r.extend_from_slice(scores);
        r
    }

    fn config() -> DecoderConfig {
        DecoderConfig::default()
    }

    #[test]
    fn test_converts_center_to_top_left() {
        let output =
            RawDetectionOutput::from_rows(vec![row(0.5, 0.25, 0.1, 0.2, &[0.9, 0.0, 0.0])]).unwrap();
        let decoded = decode(&output, &config());
        let det = decoded.detections()[0];

        assert_eq!(det.class_id, 0);
        assert!((det.bbox.width - 41.6).abs() < 1e-3);
        assert!((det.bbox.height - 83.2).abs() < 1e-3);
        assert!((det.bbox.x - (208.0 - 20.8)).abs() < 1e-3);
        assert!((det.bbox.y - (104.0 - 41.6)).abs() < 1e-3);
    }

    #[test]
    fn test_confidence_threshold_boundary() {
        let theta = config().confidence_threshold;
        let at = RawDetectionOutput::from_rows(vec![row(0.5, 0.5, 0.1, 0.1, &[theta, 0.0])]).unwrap();
        assert!(decode(&at, &config()).is_empty());

        let above = RawDetectionOutput::from_rows(vec![row(
            0.5,
            0.5,
            0.1,
            0.1,
            &[theta + 1e-4, 0.0],
        )])
        .unwrap();
        assert_eq!(decode(&above, &config()).len(), 1);
    }

    #[test]
    fn test_argmax_picks_best_class() {
        let output =
            RawDetectionOutput::from_rows(vec![row(0.5, 0.5, 0.1, 0.1, &[0.3, 0.8, 0.5])]).unwrap();
        let det = decode(&output, &config()).detections()[0];
        assert_eq!(det.class_id, 1);
        assert!((det.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_suppression_spans_layers_and_classes() {
        let mut output = RawDetectionOutput::default();
        output
            .push_rows(vec![row(0.5, 0.5, 0.2, 0.2, &[0.9, 0.0, 0.0])])
            .unwrap();
        output
            .push_rows(vec![row(0.51, 0.5, 0.2, 0.2, &[0.0, 0.0, 0.7])])
            .unwrap();

        let decoded = decode(&output, &config());
        assert_eq!(decoded.boxes.len(), 2);
        assert_eq!(decoded.keep, vec![0]);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut output = RawDetectionOutput::default();
        output.push_rows(vec![vec![0.5, 0.5, 0.1, 0.1, 1.0]]).unwrap();
        output
            .push_rows(vec![row(0.5, 0.5, 0.1, f32::NAN, &[0.9])])
            .unwrap();
        assert!(decode(&output, &config()).is_empty());
        assert!(decode(&RawDetectionOutput::default(), &config()).is_empty());
    }

    #[test]
    fn test_rescale_to_original_frame() {
        let output =
            RawDetectionOutput::from_rows(vec![row(0.5, 0.5, 0.25, 0.25, &[0.9])]).unwrap();
        let cfg = config();
        let (sx, sy) = cfg.scale_to(1664, 832);
        let det = decode(&output, &cfg).detections_scaled(sx, sy)[0];
        assert_eq!(det.bbox.center(), (832.0, 416.0));
        assert!((det.bbox.width - 416.0).abs() < 1e-3);
        assert!((det.bbox.height - 208.0).abs() < 1e-3);
    }

    #[test]
    fn test_redecoding_survivors_removes_nothing() {
        let rows = vec![
            row(0.30, 0.30, 0.2, 0.2, &[0.9, 0.0]),
            row(0.31, 0.30, 0.2, 0.2, &[0.8, 0.0]),
            row(0.70, 0.70, 0.1, 0.1, &[0.0, 0.6]),
            row(0.71, 0.71, 0.1, 0.1, &[0.0, 0.5]),
        ];
        let cfg = config();
        let first = decode(&RawDetectionOutput::from_rows(rows.clone()).unwrap(), &cfg);
        assert_eq!(first.len(), 2);

        let survivors: Vec<Vec<f32>> = first.keep.iter().map(|&i| rows[i].clone()).collect();
        let second = decode(&RawDetectionOutput::from_rows(survivors).unwrap(), &cfg);
        assert_eq!(second.len(), first.len());
    }
}
