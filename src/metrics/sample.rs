//! Per-sample overlap metrics between a predicted and a ground-truth mask.
use super::MetricValue;
use crate::error::{ensure_same_shape, Result};
use crate::image::Mask;
use serde::Serialize;

pub const DEFAULT_EPS: f64 = 1e-8;

/// Overlap scores of one query; created once and never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub dice: MetricValue,
    pub iou: MetricValue,
    pub precision: MetricValue,
    pub recall: MetricValue,
    pub tp: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    /// Ground truth had no foreground; dice/precision/recall were set to 0.
    pub degenerate_ground_truth: bool,
}

/// Score `pred` against `gt` with the default epsilon.
pub fn score_sample(pred: &Mask, gt: &Mask) -> Result<MetricRecord> {
    score_sample_with_eps(pred, gt, DEFAULT_EPS)
}

/// Score `pred` against `gt`.
///
/// An empty ground truth yields dice = precision = recall = 0 and an
/// undefined IoU.
pub fn score_sample_with_eps(pred: &Mask, gt: &Mask, eps: f64) -> Result<MetricRecord> {
    ensure_same_shape("prediction vs ground truth", gt.dims(), pred.dims())?;

    let (mut tp, mut fp, mut fn_) = (0u64, 0u64, 0u64);
    for (&p, &g) in pred.data.iter().zip(&gt.data) {
        match (p != 0, g != 0) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    if tp + fn_ == 0 {
        let zero = MetricValue::Defined(0.0);
        return Ok(MetricRecord {
            dice: zero,
            iou: MetricValue::Undefined,
            precision: zero,
            recall: zero,
            tp,
            fp,
            fn_,
            degenerate_ground_truth: true,
        });
    }

    let tp_f = tp as f64;
    Ok(MetricRecord {
        dice: MetricValue::from_f64(2.0 * tp_f / ((2 * tp + fp + fn_) as f64 + eps)),
        iou: MetricValue::from_f64(tp_f / ((tp + fp + fn_) as f64 + eps)),
        precision: MetricValue::from_f64(tp_f / ((tp + fp) as f64 + eps)),
        recall: MetricValue::from_f64(tp_f / ((tp + fn_) as f64 + eps)),
        tp,
        fp,
        fn_,
        degenerate_ground_truth: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn value(v: MetricValue) -> f64 {
        v.value().expect("metric should be defined")
    }

    #[test]
    fn identical_full_masks_score_one() {
        let gt = Mask::from_fn(10, 10, |_, _| true);
        let rec = score_sample(&gt.clone(), &gt).unwrap();
        for v in [rec.dice, rec.iou, rec.precision, rec.recall] {
            assert!((value(v) - 1.0).abs() < 1e-6, "got {v}");
        }
    }

    #[test]
    fn empty_ground_truth_scores_zero() {
        let gt = Mask::new(10, 10);
        for pred in [Mask::new(10, 10), Mask::from_fn(10, 10, |x, _| x < 3)] {
            let rec = score_sample(&pred, &gt).unwrap();
            assert!(rec.degenerate_ground_truth);
            assert_eq!(rec.dice, MetricValue::Defined(0.0));
            assert_eq!(rec.precision, MetricValue::Defined(0.0));
            assert_eq!(rec.recall, MetricValue::Defined(0.0));
            assert_eq!(rec.iou, MetricValue::Undefined);
        }
    }

    #[test]
    fn disjoint_squares_have_no_overlap() {
        let pred = Mask::from_fn(10, 10, |x, y| x < 5 && y < 5);
        let gt = Mask::from_fn(10, 10, |x, y| x >= 5 && y >= 5);
        let rec = score_sample(&pred, &gt).unwrap();
        assert_eq!(rec.tp, 0);
        assert_eq!((rec.fp, rec.fn_), (25, 25));
        assert_eq!(value(rec.dice), 0.0);
        assert_eq!(value(rec.iou), 0.0);
    }

    #[test]
    fn partial_overlap_matches_counts() {
        let pred = Mask::from_fn(4, 1, |x, _| x < 3);
        let gt = Mask::from_fn(4, 1, |x, _| x >= 1);
        let rec = score_sample(&pred, &gt).unwrap();
        assert_eq!((rec.tp, rec.fp, rec.fn_), (2, 1, 1));
        assert!((value(rec.dice) - 4.0 / 6.0).abs() < 1e-6);
        assert!((value(rec.iou) - 0.5).abs() < 1e-6);
        assert!((value(rec.precision) - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        assert!(score_sample(&Mask::new(4, 4), &Mask::new(4, 5)).is_err());
    }

    proptest! {
        #[test]
        fn dice_is_bounded_and_symmetric(
            pred in vec(0u8..2, 64),
            gt in vec(0u8..2, 64),
        ) {
            let pred = Mask::from_vec(8, 8, pred).unwrap();
            let gt = Mask::from_vec(8, 8, gt).unwrap();
            let ab = value(score_sample(&pred, &gt).unwrap().dice);
            let ba = value(score_sample(&gt, &pred).unwrap().dice);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn non_empty_mask_agrees_with_itself(bits in vec(0u8..2, 64)) {
            let mask = Mask::from_vec(8, 8, bits).unwrap();
            prop_assume!(!mask.is_background());
            let dice = value(score_sample(&mask, &mask).unwrap().dice);
            prop_assert!((dice - 1.0).abs() < 1e-6);
        }

        #[test]
        fn empty_ground_truth_always_zero(bits in vec(0u8..2, 64)) {
            let pred = Mask::from_vec(8, 8, bits).unwrap();
            let rec = score_sample(&pred, &Mask::new(8, 8)).unwrap();
            prop_assert_eq!(rec.dice, MetricValue::Defined(0.0));
        }
    }
}
