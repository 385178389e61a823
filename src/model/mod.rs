//! Model adapters for the two-stage cascade.
//!
//! Overview
//! - Backing models are external collaborators reached through two narrow
//!   traits: [`FewShotModel`] (dense probability from a query conditioned on
//!   support examples) and [`PromptableModel`] (dense probability from an
//!   image plus geometric prompts in its own square input frame).
//! - Adapters normalise both conventions into the cascade contracts:
//!   [`CoarseSegmenter`] yields a [`CoarsePrediction`], and
//!   [`RefinementSegmenter`] turns a prompt bundle into a [`FinalPrediction`].
//! - Which adapter backs the coarse stage is fixed at configuration time by
//!   [`ModelFamily`]; see [`registry`].
//!
//! Modules
//! - [`params`]: configuration of both stages.
//! - [`coarse`]: prototype-matching and stand-alone zero-shot coarse adapters.
//! - [`refine`]: the promptable refinement adapter and its coordinate frame.
//! - [`registry`]: weight providers and adapter construction.
//! - [`reference`]: small built-in backends used by the CLI and tests.

pub mod coarse;
pub mod params;
pub mod reference;
pub mod refine;
pub mod registry;

pub use coarse::{PrototypeAdapter, ZeroShotAdapter};
pub use params::{CoarseParams, ModelFamily, RefineParams, ZeroShotPrompt};
pub use refine::RefinementAdapter;
pub use registry::{build_coarse, build_refiner, ModelProvider};

use crate::error::Result;
use crate::image::{ImageF32, Mask};
use crate::prompt::{PointLabel, PromptBundle};
use crate::support::SupportSet;

/// Auxiliary inputs of the coarse stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoarseAux {
    /// Native size of the query image.
    pub original_size: (usize, usize),
    /// Square working resolution expected by the model, if any.
    pub working_size: Option<usize>,
    /// Local prototype window in working-resolution pixels.
    pub window_size: Option<usize>,
    /// Clockwise rotation applied to the query before inference.
    pub rotate_quarter_turns: u8,
}

impl CoarseAux {
    pub fn for_query(query: &ImageF32, params: &CoarseParams) -> Self {
        Self {
            original_size: (query.w, query.h),
            working_size: params.working_size,
            window_size: params.window_size,
            rotate_quarter_turns: params.rotate_quarter_turns(),
        }
    }
}

/// Output of the coarse stage at native resolution.
#[derive(Clone, Debug)]
pub struct CoarsePrediction {
    /// Foreground probability, single channel.
    pub probability: ImageF32,
    pub mask: Mask,
    pub score: f32,
}

/// Scored output of the cascade.
#[derive(Clone, Debug)]
pub struct FinalPrediction {
    pub mask: Mask,
    pub score: f32,
}

/// Coarse stage contract.
pub trait CoarseSegmenter: Send {
    fn family(&self) -> ModelFamily;

    /// Dense prediction for `query` conditioned on `support`.
    fn infer_coarse(
        &mut self,
        query: &ImageF32,
        support: &SupportSet,
        aux: &CoarseAux,
    ) -> Result<CoarsePrediction>;
}

/// Refinement stage contract.
pub trait RefinementSegmenter: Send {
    /// Refined prediction; an empty bundle yields an all-background mask.
    fn infer_refined(&mut self, query: &ImageF32, bundle: &PromptBundle) -> Result<FinalPrediction>;
}

/// Input handed to a few-shot model, all at the working resolution.
pub struct FewShotInput<'a> {
    pub query: &'a ImageF32,
    pub support_images: &'a [ImageF32],
    pub support_masks: &'a [Mask],
    pub window_size: Option<usize>,
}

/// Dense output of a backing model.
#[derive(Clone, Debug)]
pub struct ModelOutput {
    pub probability: ImageF32,
    pub score: f32,
}

/// Prototype-matching few-shot segmenter.
pub trait FewShotModel: Send {
    /// Probability map with the query's dimensions.
    fn predict(&mut self, input: &FewShotInput<'_>) -> Result<ModelOutput>;
}

/// Prompts expressed in a promptable model's input frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelPrompts {
    /// Box corners `[x0, y0, x1, y1]`.
    pub bbox: Option<[f32; 4]>,
    pub points: Vec<[f32; 2]>,
    pub labels: Vec<PointLabel>,
    /// Dense prompt, same size as the model input.
    pub mask: Option<Mask>,
}

/// Promptable segmenter working on a square `input_size()` frame.
pub trait PromptableModel: Send {
    fn input_size(&self) -> usize;

    /// Probability map of size `input_size() × input_size()`.
    fn predict(&mut self, image: &ImageF32, prompts: &ModelPrompts) -> Result<ModelOutput>;
}

impl<M: FewShotModel + ?Sized> FewShotModel for Box<M> {
    fn predict(&mut self, input: &FewShotInput<'_>) -> Result<ModelOutput> {
        (**self).predict(input)
    }
}

impl<M: PromptableModel + ?Sized> PromptableModel for Box<M> {
    fn input_size(&self) -> usize {
        (**self).input_size()
    }

    fn predict(&mut self, image: &ImageF32, prompts: &ModelPrompts) -> Result<ModelOutput> {
        (**self).predict(image, prompts)
    }
}
