//! Error taxonomy for the evaluation engine.
//!
//! Only fatal conditions live here. Per-sample outcomes such as an empty
//! ground-truth mask or an empty coarse prediction are handled by policy and
//! surface as values on the records and reports instead.
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The support pool has no examples for the requested segment.
    #[error("no support examples registered for segment '{segment}'")]
    UnboundSegment { segment: String },

    /// Model weights could not be loaded at startup.
    #[error("failed to load {family} model from {}: {reason}", path.display())]
    ModelLoad {
        family: String,
        path: PathBuf,
        reason: String,
    },

    /// Two buffers that must agree in size do not.
    #[error("{what}: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    /// A wrapped model failed while running inference.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

pub(crate) fn ensure_same_shape(
    what: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EvalError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}
