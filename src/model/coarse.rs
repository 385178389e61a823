//! Coarse-stage adapters.
//!
//! - [`PrototypeAdapter`] wraps a few-shot model: query and support examples
//!   are resampled to the working resolution, the query is optionally rotated,
//!   and the probability map is brought back to the native query frame.
//! - [`ZeroShotAdapter`] runs a promptable model without support conditioning,
//!   prompted with a box prior.
use super::refine::run_in_frame;
use super::{
    CoarseAux, CoarsePrediction, CoarseSegmenter, FewShotInput, FewShotModel, ModelFamily,
    PromptableModel, ZeroShotPrompt,
};
use crate::error::{ensure_same_shape, EvalError, Result};
use crate::geometry::{bounding_box, BoundingBox};
use crate::image::resize::{resize_bilinear, resize_nearest};
use crate::image::{ImageF32, Mask, ResizeLongestSide};
use crate::prompt::Prompts;
use crate::support::SupportSet;
use log::debug;

fn require_support(support: &SupportSet) -> Result<()> {
    if support.is_empty() {
        return Err(EvalError::UnboundSegment {
            segment: support.segment.clone(),
        });
    }
    Ok(())
}

/// Few-shot prototype-matching coarse stage.
pub struct PrototypeAdapter<M: FewShotModel> {
    model: M,
    mask_threshold: f32,
}

impl<M: FewShotModel> PrototypeAdapter<M> {
    pub fn new(model: M, mask_threshold: f32) -> Self {
        Self {
            model,
            mask_threshold,
        }
    }
}

impl<M: FewShotModel> CoarseSegmenter for PrototypeAdapter<M> {
    fn family(&self) -> ModelFamily {
        ModelFamily::Prototype
    }

    fn infer_coarse(
        &mut self,
        query: &ImageF32,
        support: &SupportSet,
        aux: &CoarseAux,
    ) -> Result<CoarsePrediction> {
        require_support(support)?;
        ensure_same_shape("coarse query", aux.original_size, (query.w, query.h))?;
        let (w, h) = aux.original_size;
        let (ww, wh) = aux.working_size.map_or((w, h), |s| (s, s));

        let work_query = resize_bilinear(query, ww, wh).rotate_quarter_turns(aux.rotate_quarter_turns);
        let support_images: Vec<ImageF32> = support
            .images()
            .map(|img| resize_bilinear(img, ww, wh))
            .collect();
        let support_masks: Vec<Mask> = support
            .masks()
            .map(|m| resize_nearest(m, ww, wh))
            .collect();

        let input = FewShotInput {
            query: &work_query,
            support_images: &support_images,
            support_masks: &support_masks,
            window_size: aux.window_size,
        };
        let out = self.model.predict(&input)?;
        ensure_same_shape(
            "few-shot model output",
            (work_query.w, work_query.h),
            (out.probability.w, out.probability.h),
        )?;

        let upright = out
            .probability
            .rotate_quarter_turns((4 - aux.rotate_quarter_turns % 4) % 4);
        let probability = resize_bilinear(&upright, w, h);
        let mask = Mask::from_probability(&probability, self.mask_threshold);
        debug!(
            "prototype coarse: {} support, working {}x{}, {} foreground px",
            support.len(),
            ww,
            wh,
            mask.count_foreground()
        );
        Ok(CoarsePrediction {
            probability,
            mask,
            score: out.score,
        })
    }
}

/// Promptable model run stand-alone as the coarse stage.
pub struct ZeroShotAdapter<M: PromptableModel> {
    model: M,
    frame: ResizeLongestSide,
    prompt: ZeroShotPrompt,
    mask_threshold: f32,
}

impl<M: PromptableModel> ZeroShotAdapter<M> {
    pub fn new(model: M, prompt: ZeroShotPrompt, mask_threshold: f32) -> Self {
        let frame = ResizeLongestSide::new(model.input_size());
        Self {
            model,
            frame,
            prompt,
            mask_threshold,
        }
    }

    fn prior_box(&self, w: usize, h: usize, support: &SupportSet) -> BoundingBox {
        let full = BoundingBox::new(0, 0, w as u32, h as u32);
        match self.prompt {
            ZeroShotPrompt::FullImage => full,
            ZeroShotPrompt::SupportPrior => {
                let prior = support
                    .masks()
                    .map(|m| scale_box(&bounding_box(m), m.dims(), (w, h)))
                    .fold(BoundingBox::default(), |acc, b| acc.union(&b));
                if prior.is_empty() {
                    full
                } else {
                    prior
                }
            }
        }
    }
}

/// Rescale a box from a `from`-sized image to a `to`-sized one, rounding outward.
fn scale_box(b: &BoundingBox, from: (usize, usize), to: (usize, usize)) -> BoundingBox {
    if b.is_empty() || from.0 == 0 || from.1 == 0 {
        return BoundingBox::default();
    }
    let sx = to.0 as f64 / from.0 as f64;
    let sy = to.1 as f64 / from.1 as f64;
    let x0 = (f64::from(b.x) * sx).floor() as u32;
    let y0 = (f64::from(b.y) * sy).floor() as u32;
    let x1 = ((f64::from(b.right()) * sx).ceil() as u32).min(to.0 as u32);
    let y1 = ((f64::from(b.bottom()) * sy).ceil() as u32).min(to.1 as u32);
    BoundingBox::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

impl<M: PromptableModel> CoarseSegmenter for ZeroShotAdapter<M> {
    fn family(&self) -> ModelFamily {
        ModelFamily::ZeroShot
    }

    fn infer_coarse(
        &mut self,
        query: &ImageF32,
        support: &SupportSet,
        aux: &CoarseAux,
    ) -> Result<CoarsePrediction> {
        ensure_same_shape("coarse query", aux.original_size, (query.w, query.h))?;
        let (w, h) = aux.original_size;
        let bbox = self.prior_box(w, h, support);
        let prompts = Prompts {
            bbox: Some(bbox),
            points: Vec::new(),
            mask: None,
            extent: bbox,
        };
        let out = run_in_frame(&mut self.model, &self.frame, query, &prompts)?;

        let (nw, nh) = self.frame.resized_dims(w, h);
        let probability = resize_bilinear(&out.probability.crop(nw, nh), w, h);
        let model_mask = Mask::from_probability(&out.probability, self.mask_threshold);
        let mask = self.frame.restore_mask(&model_mask, w, h);
        debug!(
            "zero-shot coarse: prior box {:?}, {} foreground px",
            bbox,
            mask.count_foreground()
        );
        Ok(CoarsePrediction {
            probability,
            mask,
            score: out.score,
        })
    }
}
