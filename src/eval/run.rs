//! Configuration-driven evaluation entry point.
use super::debug::OverlayDebugSink;
use super::driver::{DriverOptions, EvaluationDriver};
use super::report::EvaluationReport;
use super::shard::{build_shard_drivers, evaluate_sharded};
use crate::config::EvalConfig;
use crate::dataset::{Manifest, QuerySample};
use crate::error::Result;
use crate::model::ModelProvider;
use crate::pipeline::CascadePipeline;
use crate::support::SupportSetManager;
use log::info;
use std::sync::Arc;

/// Load the manifest named by `cfg`, build the cascade with `provider` and
/// evaluate every query, sharded over `cfg.workers`.
///
/// Models are loaded before the first query is processed.
pub fn run_from_config(cfg: &EvalConfig, provider: &dyn ModelProvider) -> Result<EvaluationReport> {
    cfg.validate()?;
    let manifest = Manifest::load(&cfg.dataset.manifest)?;
    let pool = manifest.support_pool(&cfg.dataset)?;
    let options = DriverOptions {
        skip_empty_ground_truth: cfg.dataset.skip_empty_ground_truth,
        bad_dice_threshold: cfg.output.bad_dice_threshold,
        metrics: cfg.metrics.clone(),
    };

    let make_driver = |_shard: usize| -> Result<EvaluationDriver> {
        let pipeline = CascadePipeline::from_config(cfg, provider)?;
        let driver = EvaluationDriver::new(
            SupportSetManager::new(Arc::clone(&pool)),
            pipeline,
            options.clone(),
        );
        Ok(match &cfg.output.debug_dir {
            Some(dir) => driver.with_debug_sink(Box::new(OverlayDebugSink::new(dir))),
            None => driver,
        })
    };

    if cfg.workers <= 1 {
        info!("evaluating {} queries sequentially", manifest.queries.len());
        let driver = make_driver(0)?;
        return driver.evaluate(manifest.queries(cfg.dataset.grayscale));
    }

    let drivers = build_shard_drivers(manifest.queries.len(), cfg.workers, make_driver)?;
    let samples: Vec<QuerySample> = manifest
        .queries(cfg.dataset.grayscale)
        .collect::<Result<_>>()?;
    info!(
        "evaluating {} queries over {} shards",
        samples.len(),
        drivers.len()
    );
    evaluate_sharded(&samples, drivers, &cfg.metrics)
}
