//! Posture estimation
//!
//! Head inclination from two detected landmarks:
//! - Ear and nose landmark selection from decoded detections
//! - Ear-to-nose inclination angle
//! - Good/poor classification against posterior/anterior limits
//! - Frame annotation (boxes, labels, angle readout, alarm marker)

pub mod analysis;
pub mod config;
pub mod estimator;
pub mod overlay;

pub use analysis::{Landmark, PostureClass, PostureSample};
pub use config::PostureConfig;
pub use estimator::{inclination, PostureEstimator};
pub use overlay::Overlay;

use thiserror::Error;

/// Posture error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostureError {
    /// Ear and nose share an x coordinate, the slope is undefined
    #[error("Division by zero: ear and nose are vertically aligned")]
    DivisionByZero,

    #[error("Font loading failed: {0}")]
    Font(String),
}
