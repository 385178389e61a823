//! Two-stage cascade: coarse segmentation, prompt synthesis, refinement.
//!
//! [`CascadePipeline::run`] takes one query and the bound support set and
//! returns the final prediction together with every intermediate payload and a
//! [`PipelineTrace`](crate::diagnostics::PipelineTrace).
//!
//! Typical usage:
//! ```no_run
//! use protoseg::config::EvalConfig;
//! use protoseg::model::reference::ReferenceModelProvider;
//! use protoseg::pipeline::CascadePipeline;
//!
//! # fn example(cfg: EvalConfig) -> protoseg::Result<()> {
//! let pipeline = CascadePipeline::from_config(&cfg, &ReferenceModelProvider)?;
//! assert!(pipeline.refines() != cfg.refine.coarse_pred_only);
//! # Ok(())
//! # }
//! ```

mod cascade;

pub use cascade::{CascadePipeline, PipelineOutput};
