//! Segmentation quality metrics.
//!
//! - [`sample`]: per-sample dice / IoU / precision / recall from a mask pair.
//! - [`aggregate`]: per-case and global means with explicit exclusion counts.
//! - [`detection`]: box-level precision/recall/F1 swept over IoU thresholds.
//! - [`accumulator`]: append-only record store fed by the evaluation driver.
//!
//! Undefined values are carried as [`MetricValue::Undefined`] and never folded
//! into a mean, so a report can tell "scored as zero" apart from "excluded".

pub mod accumulator;
pub mod aggregate;
pub mod detection;
pub mod sample;

pub use accumulator::MetricsAccumulator;
pub use aggregate::{aggregate, Aggregate, CaseSummary, MetricMean, MetricSummary, ScoredSample};
pub use detection::{default_iou_thresholds, detection_curve, DetectionCurve, DetectionRecord, DetectionRow};
pub use sample::{score_sample, score_sample_with_eps, MetricRecord, DEFAULT_EPS};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric that is either a finite number or undefined (zero denominator).
///
/// Serialises as a JSON number or `null`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    /// `num / den`, undefined when `den` is zero.
    pub fn ratio(num: f64, den: f64) -> Self {
        if den == 0.0 {
            Self::Undefined
        } else {
            Self::from_f64(num / den)
        }
    }

    /// Wrap a float; NaN and infinities become `Undefined`.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Self::Defined(v)
        } else {
            Self::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Self::Defined(_))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{:.4}", v),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Knobs of the metrics engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    /// Stabiliser added to overlap denominators.
    pub epsilon: f64,
    /// IoU acceptance thresholds for the detection curve.
    pub iou_thresholds: Vec<f64>,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPS,
            iou_thresholds: default_iou_thresholds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_value_serialises_as_number_or_null() {
        let json = serde_json::to_string(&[MetricValue::Defined(0.5), MetricValue::Undefined]).unwrap();
        assert_eq!(json, "[0.5,null]");
        assert_eq!(MetricValue::ratio(1.0, 0.0), MetricValue::Undefined);
        assert_eq!(MetricValue::from_f64(f64::NAN), MetricValue::Undefined);
        assert_eq!(MetricValue::Undefined.to_string(), "undefined");
    }
}
