//! Evaluation driver and report.
//!
//! Overview
//! - [`EvaluationDriver`] walks a query stream: reserved scans and, if
//!   configured, empty ground truths are skipped; every other query binds its
//!   segment's support set, runs the cascade and is scored.
//! - [`evaluate_sharded`] runs independent drivers over contiguous shards and
//!   merges their records.
//! - [`EvaluationReport`] holds global and per-case means, the detection
//!   curve and the outcome counters.
//! - [`DebugSink`] receives poorly scored samples for inspection.
//! - [`run_from_config`] wires all of the above from an [`EvalConfig`](crate::config::EvalConfig).

pub mod debug;
pub mod driver;
pub mod report;
pub mod run;
pub mod shard;

pub use debug::{DebugArtifact, DebugSink, OverlayDebugSink};
pub use driver::{DriverOptions, DriverOutcome, EvaluationDriver, QueryOutcome};
pub use report::{EvalCounters, EvaluationReport};
pub use run::run_from_config;
pub use shard::{build_shard_drivers, evaluate_sharded, shard_ranges};
