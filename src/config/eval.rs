use crate::error::{EvalError, Result};
use crate::metrics::MetricsParams;
use crate::model::{CoarseParams, RefineParams};
use crate::prompt::PromptPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete configuration of an evaluation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub dataset: DatasetConfig,
    pub coarse: CoarseParams,
    pub refine: RefineParams,
    pub prompt: PromptPolicy,
    pub metrics: MetricsParams,
    pub output: OutputConfig,
    /// Number of contiguous shards evaluated in parallel; 1 runs sequentially.
    pub workers: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            coarse: CoarseParams::default(),
            refine: RefineParams::default(),
            prompt: PromptPolicy::default(),
            metrics: MetricsParams::default(),
            output: OutputConfig::default(),
            workers: 1,
        }
    }
}

/// How support examples are turned into a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportMode {
    /// One support set per segment identifier.
    #[default]
    PerSegment,
    /// A single set used for every segment.
    Fixed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// JSON manifest listing query and support entries.
    pub manifest: PathBuf,
    /// Drop queries whose ground truth has no foreground instead of scoring them.
    pub skip_empty_ground_truth: bool,
    /// Load images as a single luma channel.
    pub grayscale: bool,
    pub support_mode: SupportMode,
    /// Examples kept per segment.
    pub max_support_per_segment: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("manifest.json"),
            skip_empty_ground_truth: false,
            grayscale: true,
            support_mode: SupportMode::PerSegment,
            max_support_per_segment: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the JSON report is written, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_out: Option<PathBuf>,
    /// Root of per-sample debug artifacts; none disables them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<PathBuf>,
    /// Samples scoring a dice below this are written to `debug_dir`.
    pub bad_dice_threshold: f64,
    /// What the CLI prints to stdout.
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_out: None,
            debug_dir: None,
            bad_dice_threshold: 0.6,
            format: OutputFormat::Text,
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        self.coarse.validate()?;
        self.refine.validate()?;
        self.prompt.validate()?;
        let eps = self.metrics.epsilon;
        if !(eps.is_finite() && eps > 0.0) {
            return Err(EvalError::InvalidConfig(format!(
                "metrics.epsilon must be positive, got {eps}"
            )));
        }
        if let Some(t) = self
            .metrics
            .iou_thresholds
            .iter()
            .find(|t| !(**t > 0.0 && **t <= 1.0))
        {
            return Err(EvalError::InvalidConfig(format!(
                "metrics.iou_thresholds must lie in (0, 1], got {t}"
            )));
        }
        if !(0.0..=1.0).contains(&self.output.bad_dice_threshold) {
            return Err(EvalError::InvalidConfig(format!(
                "output.bad_dice_threshold must lie in [0, 1], got {}",
                self.output.bad_dice_threshold
            )));
        }
        if self.workers == 0 {
            return Err(EvalError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.dataset.max_support_per_segment == 0 {
            return Err(EvalError::InvalidConfig(
                "dataset.max_support_per_segment must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read, parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<EvalConfig> {
    let data = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let cfg: EvalConfig = serde_json::from_str(&data).map_err(|e| {
        EvalError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
    })?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFamily;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn sections_default_when_missing() {
        let f = write_config(
            r#"{
                "coarse": { "family": "zero_shot", "weights": "w.json" },
                "refine": { "coarse_pred_only": true },
                "prompt": { "use_points": true, "num_points": 2 },
                "workers": 4
            }"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.coarse.family, ModelFamily::ZeroShot);
        assert!(cfg.refine.coarse_pred_only);
        assert_eq!(cfg.prompt.num_points, 2);
        assert!(cfg.prompt.use_bbox);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.output.bad_dice_threshold, 0.6);
        assert_eq!(cfg.metrics.iou_thresholds.len(), 10);
    }

    #[test]
    fn invalid_values_are_rejected_at_load() {
        for text in [
            r#"{ "workers": 0 }"#,
            r#"{ "coarse": { "rotate_degrees": 30 } }"#,
            r#"{ "metrics": { "iou_thresholds": [0.5, 1.5] } }"#,
            r#"{ "prompt": { "use_bbox": false } }"#,
            r#"{ "output": { "format": "yaml" } }"#,
        ] {
            let f = write_config(text);
            assert!(
                matches!(load_config(f.path()), Err(EvalError::InvalidConfig(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/protoseg.json")).unwrap_err();
        assert!(matches!(err, EvalError::Io { .. }));
    }
}
