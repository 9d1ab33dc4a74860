//! Box overlap and greedy non-maximum suppression

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Axis-aligned box stored as center and size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Intersection over union with `other`, 0 when the boxes are disjoint
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let w = overlap_1d(self.x, self.w, other.x, other.w);
        let h = overlap_1d(self.y, self.h, other.y, other.h);
        if !(w > 0.0 && h > 0.0) {
            return 0.0;
        }
        let intersection = w * h;
        let union = self.area() + other.area() - intersection;
        if !(union > 0.0) {
            return 0.0;
        }
        intersection / union
    }
}

fn overlap_1d(center1: f32, size1: f32, center2: f32, size2: f32) -> f32 {
    let left = (center1 - size1 / 2.0).max(center2 - size2 / 2.0);
    let right = (center1 + size1 / 2.0).min(center2 + size2 / 2.0);
    right - left
}

/// Which candidates may suppress each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NmsMode {
    /// Only boxes of the same class suppress each other
    #[default]
    ClassAware,
    /// Any overlapping boxes suppress each other
    Global,
}

/// A decoded detection before suppression
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub objectness: f32,
    /// objectness x best class score
    pub confidence: f32,
    pub class: usize,
}

/// Greedy non-maximum suppression
///
/// Candidates are visited in descending confidence (ties keep their input
/// order). A candidate is kept when its IoU with every kept candidate it may
/// be compared against is at most `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    mode: NmsMode,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            let comparable = match mode {
                NmsMode::ClassAware => k.class == candidate.class,
                NmsMode::Global => true,
            };
            comparable && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f32, y: f32, size: f32, confidence: f32, class: usize) -> Candidate {
        Candidate {
            bbox: BoundingBox { x, y, w: size, h: size },
            objectness: confidence,
            confidence,
            class,
        }
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BoundingBox { x: 10.0, y: 10.0, w: 4.0, h: 4.0 };
        let b = BoundingBox { x: 50.0, y: 50.0, w: 4.0, h: 4.0 };
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox { x: 1.0, y: 1.0, w: 2.0, h: 2.0 };
        let b = BoundingBox { x: 2.0, y: 1.0, w: 2.0, h: 2.0 };
        // intersection 2, union 6
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let a = BoundingBox { x: 1.0, y: 1.0, w: 0.0, h: 0.0 };
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_iou_nan_geometry_is_zero() {
        let a = BoundingBox { x: 1.0, y: 1.0, w: f32::NAN, h: 2.0 };
        let b = BoundingBox { x: 1.0, y: 1.0, w: 2.0, h: 2.0 };
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(b.iou(&a), 0.0);
        // overlap itself is NaN
        let c = BoundingBox { x: f32::NAN, y: 1.0, w: 2.0, h: 2.0 };
        assert_eq!(c.iou(&c), 0.0);
    }

    #[test]
    fn test_overlapping_lower_confidence_is_suppressed() {
        let kept = non_max_suppression(
            vec![candidate(10.0, 10.0, 20.0, 0.6, 0), candidate(10.5, 10.0, 20.0, 0.9, 0)],
            0.45,
            NmsMode::ClassAware,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_class_aware_keeps_other_classes() {
        let input = vec![candidate(10.0, 10.0, 20.0, 0.9, 0), candidate(10.0, 10.0, 20.0, 0.8, 1)];
        assert_eq!(non_max_suppression(input.clone(), 0.45, NmsMode::ClassAware).len(), 2);
        assert_eq!(non_max_suppression(input, 0.45, NmsMode::Global).len(), 1);
    }

    #[test]
    fn test_output_sorted_by_confidence() {
        let kept = non_max_suppression(
            vec![
                candidate(0.0, 0.0, 2.0, 0.3, 0),
                candidate(100.0, 0.0, 2.0, 0.7, 0),
                candidate(200.0, 0.0, 2.0, 0.5, 0),
            ],
            0.45,
            NmsMode::ClassAware,
        );
        let confidences: Vec<f32> = kept.iter().map(|c| c.confidence).collect();
        assert_eq!(confidences, vec![0.7, 0.5, 0.3]);
    }

    #[test]
    fn test_nms_mode_parsing() {
        assert_eq!("global".parse::<NmsMode>().unwrap(), NmsMode::Global);
        assert_eq!(NmsMode::ClassAware.to_string(), "class-aware");
    }
}
