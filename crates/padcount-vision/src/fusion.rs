//! Greedy non-maximum suppression across detector outputs.

use serde::{Deserialize, Serialize};

use crate::detectors::{DetectionCandidate, DetectionMethod};

/// Detections overlapping a kept one at or above this IoU are suppressed.
pub const NMS_IOU_THRESHOLD: f32 = 0.35;

/// Axis-aligned box with a score; `(x, y)` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub score: f32,
}

impl ScoredBox {
    /// Square of side `2r` around a circle.
    pub fn from_circle(x: i32, y: i32, r: i32, score: f32) -> Self {
        Self {
            x: (x - r) as f32,
            y: (y - r) as f32,
            w: (2 * r) as f32,
            h: (2 * r) as f32,
            score,
        }
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn iou(&self, other: &ScoredBox) -> f32 {
        let ix = (self.x + self.w).min(other.x + other.w) - self.x.max(other.x);
        let iy = (self.y + self.h).min(other.y + other.h) - self.y.max(other.y);
        if ix <= 0.0 || iy <= 0.0 {
            return 0.0;
        }
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Indices of the boxes that survive, highest score first.
///
/// Ordering is by score descending with ties broken by input position, so
/// the result is fully determined by the input sequence.
pub fn non_max_suppression(boxes: &[ScoredBox], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| boxes[b].score.total_cmp(&boxes[a].score).then(a.cmp(&b)));

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        if keep
            .iter()
            .all(|&k| boxes[k].iou(&boxes[i]) < iou_threshold)
        {
            keep.push(i);
        }
    }
    keep
}

/// A detection that survived fusion; it carries the winning strategy's tag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusedDetection {
    pub x: i32,
    pub y: i32,
    pub r: i32,
    pub confidence: f32,
    pub method: DetectionMethod,
}

impl From<DetectionCandidate> for FusedDetection {
    fn from(c: DetectionCandidate) -> Self {
        Self {
            x: c.x,
            y: c.y,
            r: c.r,
            confidence: c.confidence,
            method: c.method,
        }
    }
}

/// NMS over the concatenated candidates of every strategy.
pub fn fuse_candidates(candidates: &[DetectionCandidate]) -> Vec<FusedDetection> {
    let boxes: Vec<ScoredBox> = candidates
        .iter()
        .map(|c| ScoredBox::from_circle(c.x, c.y, c.r, c.confidence))
        .collect();
    non_max_suppression(&boxes, NMS_IOU_THRESHOLD)
        .into_iter()
        .map(|i| FusedDetection::from(candidates[i]))
        .collect()
}
