//! Object detection post-processing
//!
//! [`postprocessing`] decodes anchor-based detector outputs into boxes and
//! [`nms`] removes overlapping duplicates.

pub mod nms;
pub mod postprocessing;

pub use nms::{non_max_suppression, BoundingBox, Candidate, NmsMode};
pub use postprocessing::{
    AnchorBox, BranchConfig, DetectionResult, DetectorConfig, DetectorPostProcessing,
};
