//! Side channel for inspecting poorly scored samples.
use crate::dataset::QuerySample;
use crate::diagnostics::PipelineTrace;
use crate::error::Result;
use crate::image::io::{save_overlay, write_json_file};
use crate::image::Mask;
use crate::metrics::MetricRecord;
use crate::support::SupportSet;
use log::debug;
use std::path::PathBuf;

/// Everything known about one sample flagged for inspection.
pub struct DebugArtifact<'a> {
    pub sample: &'a QuerySample,
    pub coarse: &'a Mask,
    pub prediction: &'a Mask,
    pub support: &'a SupportSet,
    pub record: &'a MetricRecord,
    pub trace: &'a PipelineTrace,
}

/// Receives samples whose dice falls below the configured threshold.
pub trait DebugSink: Send {
    fn record(&mut self, artifact: &DebugArtifact<'_>) -> Result<()>;
}

/// Writes query, prediction, ground-truth and support overlays as PNGs under
/// `<root>/<sample label>/`, next to the sample's metrics and cascade trace.
#[derive(Debug)]
pub struct OverlayDebugSink {
    root: PathBuf,
}

impl OverlayDebugSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DebugSink for OverlayDebugSink {
    fn record(&mut self, artifact: &DebugArtifact<'_>) -> Result<()> {
        let sample = artifact.sample;
        let dir = self.root.join(sample.label());
        save_overlay(&sample.image, None, &dir.join("query.png"))?;
        save_overlay(&sample.image, Some(artifact.coarse), &dir.join("coarse.png"))?;
        save_overlay(&sample.image, Some(artifact.prediction), &dir.join("prediction.png"))?;
        save_overlay(
            &sample.image,
            Some(&sample.ground_truth),
            &dir.join("ground_truth.png"),
        )?;
        for (i, ex) in artifact.support.examples.iter().enumerate() {
            save_overlay(&ex.image, Some(&ex.mask), &dir.join(format!("support_{i}.png")))?;
        }
        write_json_file(&dir.join("metrics.json"), artifact.record)?;
        write_json_file(&dir.join("trace.json"), artifact.trace)?;
        debug!("debug artifacts for {} written to {}", sample.label(), dir.display());
        Ok(())
    }
}
