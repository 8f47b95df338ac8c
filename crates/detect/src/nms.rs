//! Non-maximum suppression.

use std::cmp::Ordering;

use crate::types::Detection;

/// Greedy per-class NMS: sort by confidence descending, then drop any box
/// whose IoU with an already kept box of the same class exceeds
/// `iou_threshold`. Boxes of different classes never suppress each other.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
