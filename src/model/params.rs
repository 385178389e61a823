//! Parameter types configuring the coarse and refinement stages.
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Model family backing the coarse stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Prototype-matching few-shot segmenter conditioned on the support set.
    #[default]
    Prototype,
    /// Promptable segmenter used stand-alone, prompted from a fixed prior.
    ZeroShot,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prototype => "prototype",
            Self::ZeroShot => "zero-shot",
        })
    }
}

/// Box prior used when a promptable model runs as the coarse stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroShotPrompt {
    /// The whole query image.
    #[default]
    FullImage,
    /// Union of the support masks' boxes, mapped to the query size.
    SupportPrior,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseParams {
    pub family: ModelFamily,
    /// Weights handed to the model provider.
    pub weights: PathBuf,
    /// Square working resolution; `None` keeps the native size.
    pub working_size: Option<usize>,
    /// Local prototype window (working-resolution pixels).
    pub window_size: Option<usize>,
    /// Clockwise query rotation, a multiple of 90.
    pub rotate_degrees: i32,
    /// Probability threshold turning the coarse map into a mask.
    pub mask_threshold: f32,
    pub zero_shot_prompt: ZeroShotPrompt,
    /// Input frame of the zero-shot family.
    pub input_size: usize,
}

impl Default for CoarseParams {
    fn default() -> Self {
        Self {
            family: ModelFamily::Prototype,
            weights: PathBuf::from("pretrained_model/coarse.json"),
            working_size: Some(256),
            window_size: None,
            rotate_degrees: 0,
            mask_threshold: 0.5,
            zero_shot_prompt: ZeroShotPrompt::FullImage,
            input_size: 1024,
        }
    }
}

impl CoarseParams {
    pub fn validate(&self) -> Result<()> {
        if self.rotate_degrees.rem_euclid(90) != 0 {
            return Err(EvalError::InvalidConfig(format!(
                "coarse.rotate_degrees must be a multiple of 90, got {}",
                self.rotate_degrees
            )));
        }
        if !(0.0..=1.0).contains(&self.mask_threshold) {
            return Err(EvalError::InvalidConfig(format!(
                "coarse.mask_threshold must lie in [0, 1], got {}",
                self.mask_threshold
            )));
        }
        if self.working_size == Some(0) || self.window_size == Some(0) || self.input_size == 0 {
            return Err(EvalError::InvalidConfig(
                "coarse sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rotate_quarter_turns(&self) -> u8 {
        (self.rotate_degrees.rem_euclid(360) / 90) as u8
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Skip refinement and score the filtered coarse mask directly.
    pub coarse_pred_only: bool,
    pub weights: PathBuf,
    /// Longest-side length of the model's square input.
    pub input_size: usize,
    pub mask_threshold: f32,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            coarse_pred_only: false,
            weights: PathBuf::from("pretrained_model/refine.json"),
            input_size: 1024,
            mask_threshold: 0.5,
        }
    }
}

impl RefineParams {
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(EvalError::InvalidConfig(
                "refine.input_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mask_threshold) {
            return Err(EvalError::InvalidConfig(format!(
                "refine.mask_threshold must lie in [0, 1], got {}",
                self.mask_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_reduced_to_quarter_turns() {
        let mut p = CoarseParams::default();
        p.rotate_degrees = -90;
        assert!(p.validate().is_ok());
        assert_eq!(p.rotate_quarter_turns(), 3);
        p.rotate_degrees = 45;
        assert!(p.validate().is_err());
    }

    #[test]
    fn family_tag_deserialises() {
        let p: CoarseParams = serde_json::from_str(r#"{"family": "zero_shot"}"#).unwrap();
        assert_eq!(p.family, ModelFamily::ZeroShot);
        assert_eq!(p.mask_threshold, 0.5);
    }
}
