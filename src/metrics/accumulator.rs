use super::{
    aggregate, detection_curve, Aggregate, DetectionCurve, DetectionRecord, MetricRecord,
    MetricsParams, ScoredSample,
};

/// Append-only store of per-query records.
///
/// Records are only ever pushed; [`merge`](Self::merge) concatenates another
/// accumulator, which is safe because every reduction downstream is
/// order-independent.
#[derive(Clone, Debug, Default)]
pub struct MetricsAccumulator {
    samples: Vec<ScoredSample>,
    detections: Vec<DetectionRecord>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, case: &str, record: MetricRecord, detection: DetectionRecord) {
        self.samples.push(ScoredSample {
            case: case.to_string(),
            record,
        });
        self.detections.push(detection);
    }

    pub fn merge(&mut self, other: MetricsAccumulator) {
        self.samples.extend(other.samples);
        self.detections.extend(other.detections);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ScoredSample] {
        &self.samples
    }

    pub fn detections(&self) -> &[DetectionRecord] {
        &self.detections
    }

    /// Running mean dice over defined values, for progress logging.
    pub fn running_dice(&self) -> Option<f64> {
        let defined: Vec<f64> = self
            .samples
            .iter()
            .filter_map(|s| s.record.dice.value())
            .collect();
        (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64)
    }

    pub fn finalize(&self, params: &MetricsParams) -> (Aggregate, DetectionCurve) {
        (
            aggregate(&self.samples),
            detection_curve(&self.detections, &params.iou_thresholds),
        )
    }
}
