#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod image;
pub mod metrics;
pub mod pipeline;
pub mod support;

// Stage internals: public for tools and tests, expected to change.
pub mod model;
pub mod prompt;

// --- High-level re-exports -------------------------------------------------

// Main entry points: configuration, cascade and driver.
pub use crate::config::{load_config, EvalConfig};
pub use crate::error::{EvalError, Result};
pub use crate::eval::{evaluate_sharded, run_from_config, EvaluationDriver, EvaluationReport};
pub use crate::pipeline::{CascadePipeline, PipelineOutput};
pub use crate::support::{SupportSetManager, SupportPool};

// Metric primitives that are generally useful on their own.
pub use crate::metrics::{score_sample, MetricRecord, MetricValue};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use protoseg::prelude::*;
///
/// # fn main() -> protoseg::Result<()> {
/// let cfg = load_config(std::path::Path::new("eval.json"))?;
/// let report = run_from_config(&cfg, &ReferenceModelProvider)?;
/// println!("{}", report.summary_text());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::dataset::QuerySample;
    pub use crate::image::{ImageF32, Mask};
    pub use crate::model::reference::ReferenceModelProvider;
    pub use crate::{
        load_config, run_from_config, CascadePipeline, EvalConfig, EvaluationDriver,
        EvaluationReport, MetricValue, SupportSetManager,
    };
}
