//! Box-level detection quality swept over IoU acceptance thresholds.
//!
//! Each query contributes exactly one predicted box and one ground-truth box,
//! so matching is per record: a record is a true positive at threshold `t`
//! iff `IoU(pred, gt) >= t`, otherwise a false positive. Recall is taken over
//! the total number of records.
use super::MetricValue;
use crate::geometry::{box_iou, BoundingBox};
use serde::Serialize;

/// Predicted/ground-truth box pair with the prediction confidence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub pred_box: BoundingBox,
    pub gt_box: BoundingBox,
    pub score: f64,
}

impl DetectionRecord {
    pub fn iou(&self) -> f64 {
        box_iou(&self.pred_box, &self.gt_box)
    }
}

/// One row of the detection curve.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRow {
    pub iou_threshold: f64,
    pub tp: usize,
    pub fp: usize,
    pub n_gt: usize,
    pub precision: MetricValue,
    pub recall: MetricValue,
    pub f1: MetricValue,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionCurve {
    pub rows: Vec<DetectionRow>,
    /// Mean confidence over all records.
    pub mean_score: Option<f64>,
}

impl DetectionCurve {
    /// Row evaluated at `threshold`, if it was part of the sweep.
    pub fn at(&self, threshold: f64) -> Option<&DetectionRow> {
        self.rows
            .iter()
            .find(|r| (r.iou_threshold - threshold).abs() < 1e-9)
    }
}

/// Thresholds 0.50, 0.55, …, 0.95.
pub fn default_iou_thresholds() -> Vec<f64> {
    (0..10).map(|i| f64::from(50 + 5 * i) / 100.0).collect()
}

/// Build the detection curve for `records` at each of `thresholds`.
pub fn detection_curve(records: &[DetectionRecord], thresholds: &[f64]) -> DetectionCurve {
    let ious: Vec<f64> = records.iter().map(DetectionRecord::iou).collect();
    let n_gt = records.len();

    let rows = thresholds
        .iter()
        .map(|&iou_threshold| {
            let tp = ious.iter().filter(|&&iou| iou >= iou_threshold).count();
            let fp = n_gt - tp;
            let precision = MetricValue::ratio(tp as f64, (tp + fp) as f64);
            let recall = MetricValue::ratio(tp as f64, n_gt as f64);
            let f1 = match (precision, recall) {
                (MetricValue::Defined(p), MetricValue::Defined(r)) => {
                    MetricValue::ratio(2.0 * p * r, p + r)
                }
                _ => MetricValue::Undefined,
            };
            DetectionRow {
                iou_threshold,
                tp,
                fp,
                n_gt,
                precision,
                recall,
                f1,
            }
        })
        .collect();

    let mean_score = if records.is_empty() {
        None
    } else {
        Some(records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64)
    };

    DetectionCurve { rows, mean_score }
}
