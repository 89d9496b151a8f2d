//! ONNX landmark model executed with tract

use camera_capture::VideoFrame;
use image::imageops::FilterType;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::{Detector, DetectorError, RawDetectionOutput};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Runs a square-input ONNX detector and hands back every output layer
/// reshaped to rows of its last dimension.
pub struct TractDetector {
    model: Plan,
    input_size: u32,
}

impl TractDetector {
    /// Load and optimize the model for a `1×3×size×size` f32 input
    pub fn new(model_path: &str, input_size: u32) -> Result<Self, DetectorError> {
        info!("Loading landmark model from {}", model_path);
        let size = input_size as usize;

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| DetectorError::ModelLoad(format!("{}: {}", model_path, e)))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
            .into_optimized()
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
            .into_runnable()
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &VideoFrame) -> Result<Tensor, DetectorError> {
        let img = frame
            .to_image()
            .ok_or_else(|| DetectorError::ImageProcessing("Failed to create image buffer".into()))?;
        let resized =
            image::imageops::resize(&img, self.input_size, self.input_size, FilterType::Triangle);

        let size = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }
}

impl Detector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &VideoFrame) -> Result<RawDetectionOutput, DetectorError> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let mut raw = RawDetectionOutput::default();
        for output in outputs.iter() {
            let view = output
                .to_array_view::<f32>()
                .map_err(|e| DetectorError::OutputShape(e.to_string()))?;
            let row_len = view.shape().last().copied().unwrap_or(0);
            raw.push_flat(view.iter().copied().collect(), row_len)?;
        }

        debug!("Inference produced {} layers, {} rows", raw.layer_count(), raw.row_count());
        Ok(raw)
    }
}
