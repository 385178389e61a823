//! Sharded evaluation.
//!
//! The stream is cut into contiguous shards so each shard still sees its
//! segments in order. Every shard runs on its own driver (own support
//! manager, own cascade). Drivers are built by the caller before any query is
//! decoded, so a model that fails to load aborts the run up front. Outcomes
//! are merged in shard order once all shards finish.
use super::driver::{DriverOutcome, EvaluationDriver};
use super::report::EvaluationReport;
use crate::dataset::QuerySample;
use crate::diagnostics::timing::elapsed_ms;
use crate::error::{EvalError, Result};
use crate::metrics::MetricsParams;
use log::debug;
use std::time::Instant;

/// Contiguous index ranges splitting `len` items into at most `shards` parts.
pub fn shard_ranges(len: usize, shards: usize) -> Vec<std::ops::Range<usize>> {
    let shards = shards.clamp(1, len.max(1));
    let base = len / shards;
    let extra = len % shards;
    let mut start = 0;
    (0..shards)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

fn run_shard(
    index: usize,
    mut driver: EvaluationDriver,
    samples: &[QuerySample],
) -> Result<DriverOutcome> {
    for sample in samples {
        driver.process(sample)?;
    }
    debug!(
        "shard {}: {} queries, {} scored",
        index,
        samples.len(),
        driver.counters().processed
    );
    Ok(driver.into_outcome())
}

/// Build one driver per shard for `len` queries split `workers` ways.
pub fn build_shard_drivers<F>(len: usize, workers: usize, factory: F) -> Result<Vec<EvaluationDriver>>
where
    F: FnMut(usize) -> Result<EvaluationDriver>,
{
    (0..shard_ranges(len, workers).len()).map(factory).collect()
}

/// Evaluate `samples` over contiguous shards, one per driver in `drivers`.
pub fn evaluate_sharded(
    samples: &[QuerySample],
    drivers: Vec<EvaluationDriver>,
    metrics: &MetricsParams,
) -> Result<EvaluationReport> {
    let start = Instant::now();
    let ranges = shard_ranges(samples.len(), drivers.len());
    if ranges.len() != drivers.len() {
        return Err(EvalError::InvalidConfig(format!(
            "{} shard drivers for {} shards of {} queries",
            drivers.len(),
            ranges.len(),
            samples.len()
        )));
    }
    let shards = ranges.len();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<DriverOutcome> = {
        use rayon::prelude::*;
        drivers
            .into_par_iter()
            .zip(ranges)
            .enumerate()
            .map(|(i, (driver, r))| run_shard(i, driver, &samples[r]))
            .collect::<Result<Vec<_>>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<DriverOutcome> = drivers
        .into_iter()
        .zip(ranges)
        .enumerate()
        .map(|(i, (driver, r))| run_shard(i, driver, &samples[r]))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = DriverOutcome::default();
    for outcome in outcomes {
        merged.merge(outcome);
    }
    Ok(EvaluationReport::from_parts(
        &merged.accumulator,
        merged.counters,
        merged.timings,
        metrics,
        shards,
        elapsed_ms(start),
    ))
}
