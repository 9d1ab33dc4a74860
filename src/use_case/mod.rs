//! Application handlers
//!
//! Each handler wires a source, a model and a post-processing stage together
//! for one application. State the handlers share (model, profiler, arena,
//! presentation) is passed in explicitly by the caller.

pub mod anomaly_detection;
pub mod inference_runner;
pub mod object_detection;

use crate::error::{EdgeError, Result};
use crate::models::Model;
use crate::profiler::Profiler;

pub use anomaly_detection::{AnomalyConfig, AnomalyDetectionHandler, AnomalyResult};
pub use inference_runner::{run_inference_runner, OutputSummary};
pub use object_detection::{ImageDetections, ObjectDetectionHandler};

/// Profiler label used for every network invocation
pub const INFERENCE_LABEL: &str = "inference";

/// Invoke `model` once, timing it under [`INFERENCE_LABEL`]
pub fn run_inference(model: &mut dyn Model, profiler: &mut Profiler) -> Result<()> {
    profiler.start(INFERENCE_LABEL);
    let result = model.run_inference();
    profiler.stop();

    result.map_err(|e| {
        log::error!("Inference failed on {}: {}", model.name(), e);
        match e {
            EdgeError::InferenceFailed(_) => e,
            other => EdgeError::InferenceFailed(other.to_string()),
        }
    })
}

/// Index after `current` in a collection of `count` items, wrapping to 0
pub fn next_index(current: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (current + 1) % count
    }
}

/// Resolve a requested start index: out-of-range requests keep `current`
pub fn select_index(requested: Option<usize>, current: usize, count: usize) -> usize {
    match requested {
        Some(index) if index < count => index,
        Some(index) => {
            log::warn!("Index {} out of range ({} items), keeping {}", index, count, current);
            current
        }
        None => current,
    }
}
