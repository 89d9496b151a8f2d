//! Raw network output

use ndarray::{Array2, ArrayView2};

use crate::DetectorError;

/// Index of the first class score in a row: `[cx, cy, w, h, objectness, classes...]`
pub const CLASS_OFFSET: usize = 5;

/// Raw output layers of one forward pass. Each layer holds one row per anchor.
#[derive(Debug, Clone, Default)]
pub struct RawDetectionOutput {
    layers: Vec<Array2<f32>>,
}

impl RawDetectionOutput {
    pub fn new(layers: Vec<Array2<f32>>) -> Self {
        Self { layers }
    }

    /// Single layer built from row vectors. Rows must share one length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, DetectorError> {
        let mut output = Self::default();
        output.push_rows(rows)?;
        Ok(output)
    }

    /// Append a layer built from row vectors
    pub fn push_rows(&mut self, rows: Vec<Vec<f32>>) -> Result<(), DetectorError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(DetectorError::OutputShape("ragged rows".into()));
        }
        let height = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let layer = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| DetectorError::OutputShape(e.to_string()))?;
        self.layers.push(layer);
        Ok(())
    }

    /// Append a layer from a flat buffer whose last dimension is `row_len`
    pub fn push_flat(&mut self, data: Vec<f32>, row_len: usize) -> Result<(), DetectorError> {
        if row_len == 0 || data.len() % row_len != 0 {
            return Err(DetectorError::OutputShape(format!(
                "{} values do not split into rows of {}",
                data.len(),
                row_len
            )));
        }
        let layer = Array2::from_shape_vec((data.len() / row_len, row_len), data)
            .map_err(|e| DetectorError::OutputShape(e.to_string()))?;
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> {
        self.layers.iter().map(|layer| layer.view())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total rows across all layers
    pub fn row_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.nrows()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}
