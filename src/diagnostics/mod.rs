//! Diagnostics data model for cascade runs.
//!
//! [`PipelineTrace`] records what every stage of a single run produced and
//! how long it took; [`TimingBreakdown`] is also summed across samples for the
//! evaluation report.

pub mod timing;
pub mod trace;

pub use timing::{StageTiming, TimingBreakdown};
pub use trace::{CoarseStage, InputDescriptor, PipelineTrace, PromptStage, RefineStage};
