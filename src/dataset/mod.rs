//! Query samples and the manifest that lists them.
//!
//! Overview
//! - [`QuerySample`] is one scored slice: image, ground-truth mask and the
//!   identifiers the driver keys its bookkeeping on.
//! - [`QueryStream`] is any fallible iterator of samples. Order matters: the
//!   support manager rotates its set when the segment identifier changes, so
//!   streams are expected to keep segments contiguous.
//! - [`Manifest`] reads a JSON listing of query and support files.

mod manifest;

pub use manifest::{Manifest, ManifestEntry};

use crate::error::{ensure_same_shape, Result};
use crate::image::{ImageF32, Mask};

/// One held-out query slice.
#[derive(Clone, Debug)]
pub struct QuerySample {
    pub image: ImageF32,
    pub ground_truth: Mask,
    pub case: String,
    pub segment: String,
    pub scan: String,
    /// Position within the scan, used to name debug artifacts.
    pub slice: usize,
}

impl QuerySample {
    /// Build a sample, checking image and mask agree in size.
    pub fn new(
        image: ImageF32,
        ground_truth: Mask,
        case: impl Into<String>,
        segment: impl Into<String>,
        scan: impl Into<String>,
        slice: usize,
    ) -> Result<Self> {
        ensure_same_shape(
            "ground-truth mask",
            (image.w, image.h),
            ground_truth.dims(),
        )?;
        Ok(Self {
            image,
            ground_truth,
            case: case.into(),
            segment: segment.into(),
            scan: scan.into(),
            slice,
        })
    }

    /// Artifact-friendly identifier `<case>_<scan>_<slice>`.
    pub fn label(&self) -> String {
        format!("{}_{}_{:04}", self.case, self.scan, self.slice)
    }
}

/// Ordered, fallible source of query samples.
pub trait QueryStream: Iterator<Item = Result<QuerySample>> {}

impl<I: Iterator<Item = Result<QuerySample>>> QueryStream for I {}
