//! Prompt synthesis: turns a coarse prediction into the geometric prompts of
//! the refinement stage.
//!
//! Steps, in order:
//! 1. optional connected-component filtering ([`cca`]) to drop speckle;
//! 2. tight bounding box of the remaining foreground, none means the bundle
//!    is [`PromptBundle::Empty`];
//! 3. optional positive / negative point prompts ([`points`]);
//! 4. optional dense mask prompt.
//!
//! The bundle only carries prompt kinds enabled by the [`PromptPolicy`].

pub mod cca;
pub mod points;

pub use cca::{connected_components, filter_components, CcaKeep, CcaParams, Component};
pub use points::{background_points, foreground_points, PointMode};

use crate::error::{EvalError, Result};
use crate::geometry::{bounding_box, BoundingBox};
use crate::image::Mask;
use crate::model::CoarsePrediction;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointLabel {
    Foreground,
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PromptPoint {
    pub x: u32,
    pub y: u32,
    pub label: PointLabel,
}

/// Non-empty prompt set in query image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Prompts {
    pub bbox: Option<BoundingBox>,
    pub points: Vec<PromptPoint>,
    pub mask: Option<Mask>,
    /// Tight box of the filtered coarse foreground, also when `bbox` is off.
    pub extent: BoundingBox,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PromptBundle {
    /// The coarse stage found no foreground.
    Empty,
    Prompts(Prompts),
}

impl PromptBundle {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn prompts(&self) -> Option<&Prompts> {
        match self {
            Self::Empty => None,
            Self::Prompts(p) => Some(p),
        }
    }
}

/// Which prompt kinds are produced and how.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptPolicy {
    pub use_bbox: bool,
    pub use_points: bool,
    pub use_neg_points: bool,
    pub use_mask: bool,
    pub use_cca: bool,
    pub point_mode: PointMode,
    pub num_points: usize,
    pub num_neg_points: usize,
    pub cca: CcaParams,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self {
            use_bbox: true,
            use_points: false,
            use_neg_points: false,
            use_mask: false,
            use_cca: true,
            point_mode: PointMode::Centroid,
            num_points: 1,
            num_neg_points: 1,
            cca: CcaParams::default(),
        }
    }
}

impl PromptPolicy {
    pub fn validate(&self) -> Result<()> {
        if !(self.use_bbox || self.use_points || self.use_mask) {
            return Err(EvalError::InvalidConfig(
                "prompt policy enables no prompt kind (use_bbox, use_points, use_mask)"
                    .to_string(),
            ));
        }
        if self.use_neg_points && !self.use_points {
            return Err(EvalError::InvalidConfig(
                "prompt.use_neg_points requires prompt.use_points".to_string(),
            ));
        }
        if self.use_points && self.num_points == 0 {
            return Err(EvalError::InvalidConfig(
                "prompt.num_points must be positive when points are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Synthesize the prompt bundle for `coarse`.
pub fn synthesize(coarse: &CoarsePrediction, policy: &PromptPolicy) -> PromptBundle {
    synthesize_with_mask(coarse, policy).1
}

/// Like [`synthesize`], also returning the filtered coarse mask.
pub fn synthesize_with_mask(
    coarse: &CoarsePrediction,
    policy: &PromptPolicy,
) -> (Mask, PromptBundle) {
    let filtered = if policy.use_cca {
        filter_components(&coarse.mask, Some(&coarse.probability), &policy.cca)
    } else {
        coarse.mask.clone()
    };

    let extent = bounding_box(&filtered);
    if extent.is_empty() {
        return (filtered, PromptBundle::Empty);
    }

    let mut points = Vec::new();
    if policy.use_points {
        let fg = foreground_points(
            &filtered,
            &coarse.probability,
            policy.point_mode,
            policy.num_points,
        );
        points.extend(fg.into_iter().map(|(x, y)| PromptPoint {
            x: x as u32,
            y: y as u32,
            label: PointLabel::Foreground,
        }));
        if policy.use_neg_points {
            let bg = background_points(
                &filtered,
                &coarse.probability,
                &extent,
                policy.num_neg_points,
            );
            points.extend(bg.into_iter().map(|(x, y)| PromptPoint {
                x: x as u32,
                y: y as u32,
                label: PointLabel::Background,
            }));
        }
    }

    let prompts = Prompts {
        bbox: policy.use_bbox.then_some(extent),
        points,
        mask: policy.use_mask.then(|| filtered.clone()),
        extent,
    };
    (filtered, PromptBundle::Prompts(prompts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageF32;

    fn coarse(mask: Mask) -> CoarsePrediction {
        CoarsePrediction {
            probability: mask.to_f32(),
            mask,
            score: 0.8,
        }
    }

    #[test]
    fn background_mask_gives_empty_bundle() {
        let c = coarse(Mask::new(16, 16));
        for use_cca in [false, true] {
            let policy = PromptPolicy {
                use_cca,
                use_points: true,
                ..PromptPolicy::default()
            };
            assert!(synthesize(&c, &policy).is_empty());
        }
    }

    #[test]
    fn sole_blob_yields_its_box() {
        let c = coarse(Mask::from_fn(32, 32, |x, y| (4..12).contains(&x) && (7..10).contains(&y)));
        for use_cca in [false, true] {
            let policy = PromptPolicy {
                use_cca,
                ..PromptPolicy::default()
            };
            let bundle = synthesize(&c, &policy);
            let prompts = bundle.prompts().unwrap();
            assert_eq!(prompts.bbox, Some(BoundingBox::new(4, 7, 8, 3)));
            assert!(prompts.points.is_empty());
            assert!(prompts.mask.is_none());
        }
    }

    #[test]
    fn cca_removes_speckle_before_the_box() {
        let mask = Mask::from_fn(32, 32, |x, y| {
            ((4..12).contains(&x) && (4..12).contains(&y)) || (x == 30 && y == 30)
        });
        let (filtered, bundle) = synthesize_with_mask(&coarse(mask.clone()), &PromptPolicy::default());
        assert_eq!(filtered.count_foreground(), 64);
        assert_eq!(bundle.prompts().unwrap().extent, BoundingBox::new(4, 4, 8, 8));

        let no_cca = PromptPolicy {
            use_cca: false,
            ..PromptPolicy::default()
        };
        let extent = synthesize(&coarse(mask), &no_cca).prompts().unwrap().extent;
        assert_eq!(extent, BoundingBox::new(4, 4, 27, 27));
    }

    #[test]
    fn only_enabled_prompt_kinds_are_emitted() {
        let c = coarse(Mask::from_fn(16, 16, |x, y| (4..9).contains(&x) && (4..9).contains(&y)));
        let policy = PromptPolicy {
            use_bbox: false,
            use_points: true,
            use_neg_points: true,
            use_mask: true,
            num_points: 1,
            num_neg_points: 2,
            ..PromptPolicy::default()
        };
        let bundle = synthesize(&c, &policy);
        let p = bundle.prompts().unwrap();
        assert!(p.bbox.is_none());
        assert_eq!(p.mask.as_ref().map(Mask::count_foreground), Some(25));
        let fg: Vec<_> = p.points.iter().filter(|p| p.label == PointLabel::Foreground).collect();
        let bg: Vec<_> = p.points.iter().filter(|p| p.label == PointLabel::Background).collect();
        assert_eq!(fg.len(), 1);
        assert_eq!((fg[0].x, fg[0].y), (6, 6));
        assert_eq!(bg.len(), 2);
        for p in bg {
            assert!(!c.mask.is_set(p.x as usize, p.y as usize));
        }
    }

    #[test]
    fn policy_without_prompt_kinds_is_rejected() {
        let policy = PromptPolicy {
            use_bbox: false,
            ..PromptPolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(PromptPolicy::default().validate().is_ok());
    }

    #[test]
    fn low_confidence_component_is_dropped_when_another_passes() {
        let mask = Mask::from_fn(20, 20, |x, y| (x < 4 && y < 4) || (x >= 14 && y >= 14));
        let prob = ImageF32::from_fn(20, 20, |x, _| if x < 10 { 0.55 } else { 0.95 });
        let c = CoarsePrediction {
            probability: prob,
            mask,
            score: 0.7,
        };
        let policy = PromptPolicy {
            cca: CcaParams {
                min_component_confidence: 0.9,
                ..CcaParams::default()
            },
            ..PromptPolicy::default()
        };
        let extent = synthesize(&c, &policy).prompts().unwrap().extent;
        assert_eq!(extent, BoundingBox::new(14, 14, 6, 6));
    }
}
