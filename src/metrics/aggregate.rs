//! Per-case and global means over metric records.
use super::{MetricRecord, MetricValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// A metric record tagged with the case it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSample {
    pub case: String,
    pub record: MetricRecord,
}

/// Arithmetic mean over the defined values of one metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMean {
    pub mean: MetricValue,
    /// Values that entered the mean.
    pub count: usize,
    /// Values left out because they were undefined.
    pub excluded: usize,
}

impl MetricMean {
    pub fn of(values: impl IntoIterator<Item = MetricValue>) -> Self {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut excluded = 0usize;
        for v in values {
            match v {
                MetricValue::Defined(x) if x.is_finite() => {
                    sum += x;
                    count += 1;
                }
                _ => excluded += 1,
            }
        }
        let mean = if count == 0 {
            MetricValue::Undefined
        } else {
            MetricValue::Defined(sum / count as f64)
        };
        Self {
            mean,
            count,
            excluded,
        }
    }
}

/// Global means of all four metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub samples: usize,
    pub dice: MetricMean,
    pub iou: MetricMean,
    pub precision: MetricMean,
    pub recall: MetricMean,
    /// Samples whose empty ground truth was scored as zero.
    pub scored_as_zero: usize,
}

impl MetricSummary {
    fn from_records<'a>(records: impl Iterator<Item = &'a MetricRecord> + Clone) -> Self {
        Self {
            samples: records.clone().count(),
            dice: MetricMean::of(records.clone().map(|r| r.dice)),
            iou: MetricMean::of(records.clone().map(|r| r.iou)),
            precision: MetricMean::of(records.clone().map(|r| r.precision)),
            recall: MetricMean::of(records.clone().map(|r| r.recall)),
            scored_as_zero: records.filter(|r| r.degenerate_ground_truth).count(),
        }
    }
}

/// Mean dice and IoU of a single case.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub case: String,
    pub samples: usize,
    pub dice: MetricMean,
    pub iou: MetricMean,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub global: MetricSummary,
    /// Sorted by case identifier.
    pub per_case: Vec<CaseSummary>,
}

/// Reduce scored samples into per-case and global means.
///
/// The result does not depend on the order of `samples`.
pub fn aggregate(samples: &[ScoredSample]) -> Aggregate {
    let global = MetricSummary::from_records(samples.iter().map(|s| &s.record));

    let mut by_case: BTreeMap<&str, Vec<&MetricRecord>> = BTreeMap::new();
    for s in samples {
        by_case.entry(s.case.as_str()).or_default().push(&s.record);
    }
    let per_case = by_case
        .into_iter()
        .map(|(case, records)| CaseSummary {
            case: case.to_string(),
            samples: records.len(),
            dice: MetricMean::of(records.iter().map(|r| r.dice)),
            iou: MetricMean::of(records.iter().map(|r| r.iou)),
        })
        .collect();

    Aggregate { global, per_case }
}
