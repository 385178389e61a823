use super::debug::{DebugArtifact, DebugSink};
use super::report::{EvalCounters, EvaluationReport};
use crate::dataset::{QuerySample, QueryStream};
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::TimingBreakdown;
use crate::error::Result;
use crate::geometry::bounding_box;
use crate::metrics::{score_sample_with_eps, DetectionRecord, MetricRecord, MetricsAccumulator, MetricsParams};
use crate::pipeline::CascadePipeline;
use crate::support::SupportSetManager;
use log::{debug, info};
use std::time::Instant;

/// Per-run policy knobs of the driver.
#[derive(Clone, Debug)]
pub struct DriverOptions {
    pub skip_empty_ground_truth: bool,
    /// Samples with a dice below this are handed to the debug sink.
    pub bad_dice_threshold: f64,
    pub metrics: MetricsParams,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            skip_empty_ground_truth: false,
            bad_dice_threshold: 0.6,
            metrics: MetricsParams::default(),
        }
    }
}

/// What happened to one query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryOutcome {
    Scored(MetricRecord),
    SkippedReserved,
    SkippedEmptyGroundTruth,
}

/// Records and counters of a driver, ready to merge with other shards.
#[derive(Clone, Debug, Default)]
pub struct DriverOutcome {
    pub accumulator: MetricsAccumulator,
    pub counters: EvalCounters,
    pub timings: TimingBreakdown,
}

impl DriverOutcome {
    pub fn merge(&mut self, other: DriverOutcome) {
        self.accumulator.merge(other.accumulator);
        self.counters.merge(&other.counters);
        self.timings.accumulate(&other.timings);
    }
}

/// Sequential evaluation loop over a query stream.
///
/// Owns the support manager, the cascade and every accumulating record; one
/// driver is never shared between threads.
pub struct EvaluationDriver {
    manager: SupportSetManager,
    pipeline: CascadePipeline,
    options: DriverOptions,
    debug_sink: Option<Box<dyn DebugSink>>,
    outcome: DriverOutcome,
}

impl EvaluationDriver {
    pub fn new(manager: SupportSetManager, pipeline: CascadePipeline, options: DriverOptions) -> Self {
        Self {
            manager,
            pipeline,
            options,
            debug_sink: None,
            outcome: DriverOutcome::default(),
        }
    }

    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn counters(&self) -> &EvalCounters {
        &self.outcome.counters
    }

    pub fn accumulator(&self) -> &MetricsAccumulator {
        &self.outcome.accumulator
    }

    /// Push one query through the cascade and score it.
    ///
    /// The query's segment is bound before any skip policy applies, so a
    /// segment without support fails even for a query that would be skipped.
    pub fn process(&mut self, sample: &QuerySample) -> Result<QueryOutcome> {
        let rotations_before = self.manager.rotations();
        let support = self.manager.bind(&sample.segment)?;
        self.outcome.counters.support_rotations += self.manager.rotations() - rotations_before;

        if self.manager.is_reserved(&sample.scan) {
            debug!("skip {}: scan '{}' is reserved as support", sample.label(), sample.scan);
            self.outcome.counters.skipped_reserved += 1;
            return Ok(QueryOutcome::SkippedReserved);
        }
        if self.options.skip_empty_ground_truth && sample.ground_truth.is_background() {
            debug!("skip {}: empty ground truth", sample.label());
            self.outcome.counters.skipped_empty_ground_truth += 1;
            return Ok(QueryOutcome::SkippedEmptyGroundTruth);
        }

        let out = self.pipeline.run(&sample.image, &support)?;
        let record = score_sample_with_eps(
            &out.prediction.mask,
            &sample.ground_truth,
            self.options.metrics.epsilon,
        )?;
        let detection = DetectionRecord {
            pred_box: bounding_box(&out.prediction.mask),
            gt_box: bounding_box(&sample.ground_truth),
            score: f64::from(out.prediction.score),
        };
        self.outcome.accumulator.push(&sample.case, record, detection);
        self.outcome.timings.accumulate(&out.trace.timings);

        let counters = &mut self.outcome.counters;
        counters.processed += 1;
        if record.degenerate_ground_truth {
            counters.degenerate_ground_truth += 1;
        }
        if out.empty_coarse() {
            counters.empty_coarse += 1;
        }

        if let Some(sink) = self.debug_sink.as_mut() {
            let bad = record
                .dice
                .value()
                .is_some_and(|d| d < self.options.bad_dice_threshold);
            if bad {
                sink.record(&DebugArtifact {
                    sample,
                    coarse: &out.filtered,
                    prediction: &out.prediction.mask,
                    support: &support,
                    record: &record,
                    trace: &out.trace,
                })?;
            }
        }

        debug!(
            "{} case={} segment={} dice={} iou={} score={:.3}",
            sample.label(),
            sample.case,
            sample.segment,
            record.dice,
            record.iou,
            out.prediction.score
        );
        Ok(QueryOutcome::Scored(record))
    }

    /// Process every sample of `stream` in order; the first error aborts.
    pub fn run<S: QueryStream>(&mut self, stream: S) -> Result<()> {
        for sample in stream {
            self.process(&sample?)?;
        }
        if let Some(dice) = self.outcome.accumulator.running_dice() {
            info!(
                "driver finished: {} scored, mean dice {:.4}",
                self.outcome.counters.processed, dice
            );
        }
        Ok(())
    }

    pub fn into_outcome(self) -> DriverOutcome {
        self.outcome
    }

    /// Evaluate `stream` and build the report.
    pub fn evaluate<S: QueryStream>(mut self, stream: S) -> Result<EvaluationReport> {
        let start = Instant::now();
        self.run(stream)?;
        let params = self.options.metrics.clone();
        let outcome = self.into_outcome();
        Ok(EvaluationReport::from_parts(
            &outcome.accumulator,
            outcome.counters,
            outcome.timings,
            &params,
            1,
            elapsed_ms(start),
        ))
    }
}
