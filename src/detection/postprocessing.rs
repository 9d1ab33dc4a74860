//! # Anchor-based detector post-processing
//!
//! Turns the raw output tensors of a YOLO-style detector into a list of boxes
//! in the pixel space of the presented image.
//!
//! Each output tensor ("branch") covers the image with a grid of cells. Every
//! cell predicts, for each of its anchor priors, one record laid out as
//!
//! ```text
//! [tx, ty, tw, th, objectness, class_0 .. class_{C-1}]
//! ```
//!
//! so a branch tensor holds `grid_rows × grid_cols × anchors × (5 + C)`
//! values in row-major order. Records are dequantized with the tensor's own
//! scale and zero-point and decoded as
//!
//! ```text
//! cx = (col + σ(tx)) · image_cols / grid_cols
//! cy = (row + σ(ty)) · image_rows / grid_rows
//! w  = anchor_w · e^tw · image_cols / input_cols
//! h  = anchor_h · e^th · image_rows / input_rows
//! confidence = σ(objectness) · max_c σ(class_c)
//! ```
//!
//! Candidates whose confidence is strictly above the threshold from every
//! branch are merged and passed through greedy non-maximum suppression.

use super::nms::{non_max_suppression, BoundingBox, Candidate, NmsMode};
use crate::error::{EdgeError, Result};
use crate::math::sigmoid;
use crate::tensor::TensorView;
use serde::{Deserialize, Serialize};

/// Number of values before the class scores in a record
const BOX_FIELDS: usize = 5;

/// `(width, height)` prior in network-input pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorBox {
    pub width: f32,
    pub height: f32,
}

impl AnchorBox {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Geometry of one detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfig {
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub anchors: Vec<AnchorBox>,
}

/// Configuration for detector post-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub num_classes: usize,
    /// Network input height the anchors are expressed in
    pub input_rows: usize,
    /// Network input width the anchors are expressed in
    pub input_cols: usize,
    /// One entry per output tensor, in output-tensor order
    pub branches: Vec<BranchConfig>,
    /// Exclusive lower bound on confidence
    pub threshold: f32,
    /// IoU above which a lower-confidence box is suppressed
    pub nms_threshold: f32,
    pub nms_mode: NmsMode,
    /// Keep at most this many candidates (by objectness) before NMS, 0 = all
    pub top_n: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::yolo_fastest(192)
    }
}

impl DetectorConfig {
    /// Two-branch Yolo Fastest layout for a square `input_size` network:
    /// a coarse grid at stride 32 and a fine grid at stride 16.
    pub fn yolo_fastest(input_size: usize) -> Self {
        Self {
            num_classes: 1,
            input_rows: input_size,
            input_cols: input_size,
            branches: vec![
                BranchConfig {
                    grid_rows: input_size / 32,
                    grid_cols: input_size / 32,
                    anchors: vec![
                        AnchorBox::new(38.0, 77.0),
                        AnchorBox::new(47.0, 97.0),
                        AnchorBox::new(61.0, 126.0),
                    ],
                },
                BranchConfig {
                    grid_rows: input_size / 16,
                    grid_cols: input_size / 16,
                    anchors: vec![
                        AnchorBox::new(14.0, 26.0),
                        AnchorBox::new(19.0, 37.0),
                        AnchorBox::new(28.0, 55.0),
                    ],
                },
            ],
            threshold: 0.5,
            nms_threshold: 0.45,
            nms_mode: NmsMode::ClassAware,
            top_n: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(EdgeError::Config("num_classes must be positive".to_string()));
        }
        if self.input_rows == 0 || self.input_cols == 0 {
            return Err(EdgeError::Config(
                "network input size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EdgeError::Config(format!(
                "threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(EdgeError::Config(format!(
                "nms_threshold must be between 0.0 and 1.0, got {}",
                self.nms_threshold
            )));
        }
        if self.branches.is_empty() {
            return Err(EdgeError::Config("at least one branch is required".to_string()));
        }
        for (i, branch) in self.branches.iter().enumerate() {
            if branch.grid_rows == 0 || branch.grid_cols == 0 || branch.anchors.is_empty() {
                return Err(EdgeError::Config(format!(
                    "branch {} needs a non-empty grid and at least one anchor",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// One detection in presentation-image pixels
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Confidence in `(threshold, 1]`
    pub normalised_val: f32,
    pub class: usize,
    pub x0: f32,
    pub y0: f32,
    pub w: f32,
    pub h: f32,
}

/// Decodes detector output tensors into detections
#[derive(Debug, Clone)]
pub struct DetectorPostProcessing {
    config: DetectorConfig,
}

impl DetectorPostProcessing {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Decode, filter and de-duplicate detections
    ///
    /// # Arguments
    /// * `image_rows`, `image_cols` - Size of the presented image
    /// * `outputs` - One tensor per configured branch
    ///
    /// # Returns
    /// * `Vec<DetectionResult>` - Surviving boxes, highest confidence first
    ///
    /// All tensor shapes are checked before anything is decoded; a mismatch
    /// fails with [`EdgeError::InvalidTensorShape`].
    pub fn run_post_processing(
        &self,
        image_rows: usize,
        image_cols: usize,
        outputs: &[TensorView<'_>],
    ) -> Result<Vec<DetectionResult>> {
        if outputs.len() != self.config.branches.len() {
            return Err(EdgeError::InvalidTensorShape(format!(
                "expected {} output tensors, got {}",
                self.config.branches.len(),
                outputs.len()
            )));
        }
        for (index, (branch, tensor)) in self.config.branches.iter().zip(outputs).enumerate() {
            self.check_shape(index, branch, tensor)?;
        }

        let mut candidates = Vec::new();
        for (branch, tensor) in self.config.branches.iter().zip(outputs) {
            self.decode_branch(branch, tensor, image_rows, image_cols, &mut candidates);
        }
        log::debug!("{} candidates above threshold {}", candidates.len(), self.config.threshold);

        if self.config.top_n > 0 && candidates.len() > self.config.top_n {
            candidates.sort_by(|a, b| b.objectness.total_cmp(&a.objectness));
            candidates.truncate(self.config.top_n);
        }

        let kept = non_max_suppression(candidates, self.config.nms_threshold, self.config.nms_mode);
        log::debug!("{} detections after NMS", kept.len());

        Ok(kept
            .into_iter()
            .map(|c| to_result(&c, image_rows as f32, image_cols as f32))
            .collect())
    }

    fn check_shape(&self, index: usize, branch: &BranchConfig, tensor: &TensorView<'_>) -> Result<()> {
        let record = BOX_FIELDS + self.config.num_classes;
        let anchors = branch.anchors.len();
        let dims = tensor.squeezed_shape();

        let flat = [branch.grid_rows, branch.grid_cols, anchors * record];
        let split = [branch.grid_rows, branch.grid_cols, anchors, record];
        if dims == strip_leading_ones(&flat) || dims == strip_leading_ones(&split) {
            return Ok(());
        }
        Err(EdgeError::InvalidTensorShape(format!(
            "output {} has shape {:?}, expected {:?} or {:?}",
            index,
            tensor.shape(),
            flat,
            split
        )))
    }

    fn decode_branch(
        &self,
        branch: &BranchConfig,
        tensor: &TensorView<'_>,
        image_rows: usize,
        image_cols: usize,
        candidates: &mut Vec<Candidate>,
    ) {
        let num_classes = self.config.num_classes;
        let record = BOX_FIELDS + num_classes;
        let threshold = self.config.threshold;

        let cell_w = image_cols as f32 / branch.grid_cols as f32;
        let cell_h = image_rows as f32 / branch.grid_rows as f32;
        let scale_w = image_cols as f32 / self.config.input_cols as f32;
        let scale_h = image_rows as f32 / self.config.input_rows as f32;

        for row in 0..branch.grid_rows {
            for col in 0..branch.grid_cols {
                for (anc, anchor) in branch.anchors.iter().enumerate() {
                    let base = ((row * branch.grid_cols + col) * branch.anchors.len() + anc) * record;

                    let objectness = sigmoid(tensor.dequantize(base + 4));
                    // confidence can never exceed objectness; NaN never passes
                    if !(objectness > threshold) {
                        continue;
                    }

                    let (class, best_score) = (0..num_classes)
                        .map(|c| (c, sigmoid(tensor.dequantize(base + BOX_FIELDS + c))))
                        .fold((0, f32::NEG_INFINITY), |best, cur| {
                            if cur.1 > best.1 {
                                cur
                            } else {
                                best
                            }
                        });
                    let confidence = objectness * best_score;
                    if !(confidence > threshold) {
                        continue;
                    }

                    let tx = tensor.dequantize(base);
                    let ty = tensor.dequantize(base + 1);
                    let tw = tensor.dequantize(base + 2);
                    let th = tensor.dequantize(base + 3);

                    candidates.push(Candidate {
                        bbox: BoundingBox {
                            x: (col as f32 + sigmoid(tx)) * cell_w,
                            y: (row as f32 + sigmoid(ty)) * cell_h,
                            w: anchor.width * tw.exp() * scale_w,
                            h: anchor.height * th.exp() * scale_h,
                        },
                        objectness,
                        confidence,
                        class,
                    });
                }
            }
        }
    }
}

fn strip_leading_ones(dims: &[usize]) -> &[usize] {
    let first = dims.iter().position(|&d| d != 1).unwrap_or(dims.len());
    &dims[first..]
}

/// Corner form of a candidate clamped to the image
fn to_result(candidate: &Candidate, rows: f32, cols: f32) -> DetectionResult {
    let b = &candidate.bbox;
    let x_min = (b.x - b.w / 2.0).clamp(0.0, cols);
    let y_min = (b.y - b.h / 2.0).clamp(0.0, rows);
    let x_max = (b.x + b.w / 2.0).clamp(0.0, cols);
    let y_max = (b.y + b.h / 2.0).clamp(0.0, rows);

    DetectionResult {
        normalised_val: candidate.confidence,
        class: candidate.class,
        x0: x_min,
        y0: y_min,
        w: x_max - x_min,
        h: y_max - y_min,
    }
}
