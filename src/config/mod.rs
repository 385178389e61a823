//! JSON configuration of the evaluation tools.

pub mod eval;

pub use eval::{load_config, DatasetConfig, EvalConfig, OutputConfig, OutputFormat, SupportMode};
