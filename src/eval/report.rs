use crate::diagnostics::TimingBreakdown;
use crate::metrics::{
    CaseSummary, DetectionCurve, MetricMean, MetricSummary, MetricsAccumulator, MetricsParams,
};
use log::info;
use serde::Serialize;
use std::fmt::Write as _;

/// Per-query outcome counters of an evaluation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalCounters {
    /// Queries run through the cascade and scored.
    pub processed: usize,
    /// Queries from scans reserved as support.
    pub skipped_reserved: usize,
    /// Queries dropped because their ground truth was empty.
    pub skipped_empty_ground_truth: usize,
    /// Scored queries whose ground truth was empty.
    pub degenerate_ground_truth: usize,
    /// Scored queries whose coarse prediction had no foreground.
    pub empty_coarse: usize,
    /// Times the active support set was replaced.
    pub support_rotations: usize,
}

impl EvalCounters {
    pub fn merge(&mut self, other: &EvalCounters) {
        self.processed += other.processed;
        self.skipped_reserved += other.skipped_reserved;
        self.skipped_empty_ground_truth += other.skipped_empty_ground_truth;
        self.degenerate_ground_truth += other.degenerate_ground_truth;
        self.empty_coarse += other.empty_coarse;
        self.support_rotations += other.support_rotations;
    }
}

/// Final report of an evaluation run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub global: MetricSummary,
    pub per_case: Vec<CaseSummary>,
    pub detection: DetectionCurve,
    pub counts: EvalCounters,
    /// Stage timings summed over every processed query.
    pub timings: TimingBreakdown,
    pub workers: usize,
    pub elapsed_ms: f64,
}

impl EvaluationReport {
    pub fn from_parts(
        accumulator: &MetricsAccumulator,
        counts: EvalCounters,
        timings: TimingBreakdown,
        params: &MetricsParams,
        workers: usize,
        elapsed_ms: f64,
    ) -> Self {
        let (aggregate, detection) = accumulator.finalize(params);
        for case in &aggregate.per_case {
            info!(
                "case {}: {} samples, mean dice {}, mean iou {}",
                case.case, case.samples, case.dice.mean, case.iou.mean
            );
        }
        let g = &aggregate.global;
        info!(
            "global over {} samples: dice {}, iou {}, precision {}, recall {}",
            g.samples, g.dice.mean, g.iou.mean, g.precision.mean, g.recall.mean
        );
        Self {
            global: aggregate.global,
            per_case: aggregate.per_case,
            detection,
            counts,
            timings,
            workers,
            elapsed_ms,
        }
    }

    /// Human-readable multi-line summary.
    pub fn summary_text(&self) -> String {
        let c = &self.counts;
        let g = &self.global;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Evaluated {} queries (skipped {} reserved, {} empty ground truth; {} degenerate, {} empty coarse)",
            c.processed,
            c.skipped_reserved,
            c.skipped_empty_ground_truth,
            c.degenerate_ground_truth,
            c.empty_coarse
        );
        let _ = writeln!(
            out,
            "Global: dice {}  iou {}  precision {}  recall {}",
            g.dice.mean, g.iou.mean, g.precision.mean, g.recall.mean
        );
        let excluded = [
            ("dice", &g.dice),
            ("iou", &g.iou),
            ("precision", &g.precision),
            ("recall", &g.recall),
        ]
        .into_iter()
        .filter(|(_, m)| m.excluded > 0)
        .map(|(name, m)| format!("{name} {}", m.excluded))
        .collect::<Vec<_>>();
        if !excluded.is_empty() {
            let _ = writeln!(out, "Excluded as undefined: {}", excluded.join(", "));
        }
        if g.scored_as_zero > 0 {
            let _ = writeln!(out, "Scored as zero (empty ground truth): {}", g.scored_as_zero);
        }

        let _ = writeln!(out, "Per case:");
        for case in &self.per_case {
            let _ = writeln!(
                out,
                "  {:<16} n={:<4} dice {}  iou {}",
                case.case,
                case.samples,
                case.dice.mean,
                format_mean(&case.iou)
            );
        }

        let _ = writeln!(
            out,
            "Detection (mean score {}):",
            self.detection
                .mean_score
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string())
        );
        for row in &self.detection.rows {
            let _ = writeln!(
                out,
                "  IoU>={:.2}  tp {:<4} fp {:<4} precision {}  recall {}  f1 {}",
                row.iou_threshold, row.tp, row.fp, row.precision, row.recall, row.f1
            );
        }
        let _ = write!(
            out,
            "Support rotations: {}  workers: {}  elapsed: {:.1} ms",
            c.support_rotations, self.workers, self.elapsed_ms
        );
        out
    }
}

fn format_mean(m: &MetricMean) -> String {
    if m.excluded > 0 {
        format!("{} ({} undefined)", m.mean, m.excluded)
    } else {
        m.mean.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::image::Mask;
    use crate::metrics::{score_sample, DetectionRecord};

    #[test]
    fn report_lists_every_case_and_the_global_means() {
        let _ = env_logger::builder().is_test(true).try_init();
        let full = Mask::from_fn(4, 4, |_, _| true);
        let half = Mask::from_fn(4, 4, |x, _| x < 2);
        let det = DetectionRecord {
            pred_box: BoundingBox::new(0, 0, 4, 4),
            gt_box: BoundingBox::new(0, 0, 4, 4),
            score: 0.5,
        };
        let mut acc = MetricsAccumulator::new();
        acc.push("b", score_sample(&full, &full).unwrap(), det);
        acc.push("a", score_sample(&half, &full).unwrap(), det);
        acc.push("a", score_sample(&Mask::new(4, 4), &Mask::new(4, 4)).unwrap(), det);

        let report = EvaluationReport::from_parts(
            &acc,
            EvalCounters::default(),
            TimingBreakdown::default(),
            &MetricsParams::default(),
            1,
            0.0,
        );
        let cases: Vec<_> = report.per_case.iter().map(|c| (c.case.as_str(), c.samples)).collect();
        assert_eq!(cases, [("a", 2), ("b", 1)]);
        assert_eq!(report.global.samples, 3);
        assert_eq!(report.global.iou.excluded, 1);

        let text = report.summary_text();
        assert!(text.contains("Excluded as undefined: iou 1"), "{text}");
        assert!(text.contains("  a "), "{text}");
        assert!(text.contains("  b "), "{text}");
    }
}
