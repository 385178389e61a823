//! Promptable refinement adapter.
//!
//! Prompts arrive in query image coordinates. They are mapped into the
//! model's square resize-longest-side frame, the model runs there, and the
//! thresholded output is cropped and resized back to the query size.
use super::{FinalPrediction, ModelOutput, ModelPrompts, PromptableModel, RefinementSegmenter};
use crate::error::{ensure_same_shape, EvalError, Result};
use crate::image::resize::resize_nearest;
use crate::image::{ImageF32, Mask, ResizeLongestSide};
use crate::prompt::{PromptBundle, Prompts};
use log::debug;

/// Run `model` on `query` with native-coordinate prompts.
///
/// Returns the model-frame output after checking it covers the whole frame.
pub(crate) fn run_in_frame<M: PromptableModel + ?Sized>(
    model: &mut M,
    frame: &ResizeLongestSide,
    query: &ImageF32,
    prompts: &Prompts,
) -> Result<ModelOutput> {
    let (w, h) = (query.w, query.h);
    let mut mapped = ModelPrompts::default();
    if let Some(bbox) = prompts.bbox {
        mapped.bbox = Some(
            frame
                .apply_box(bbox.corners(), w, h)
                .ok_or_else(|| EvalError::Inference("box prompt maps outside the frame".into()))?,
        );
    }
    if !prompts.points.is_empty() {
        let native: Vec<[f32; 2]> = prompts
            .points
            .iter()
            .map(|p| [p.x as f32 + 0.5, p.y as f32 + 0.5])
            .collect();
        mapped.points = frame
            .apply_points(&native, w, h)
            .ok_or_else(|| EvalError::Inference("point prompts map outside the frame".into()))?;
        mapped.labels = prompts.points.iter().map(|p| p.label).collect();
    }
    if let Some(mask) = &prompts.mask {
        ensure_same_shape("mask prompt", (w, h), mask.dims())?;
        mapped.mask = Some(mask_to_frame(frame, mask));
    }

    let image = frame.apply_image(query);
    let out = model.predict(&image, &mapped)?;
    ensure_same_shape(
        "promptable model output",
        (frame.target, frame.target),
        (out.probability.w, out.probability.h),
    )?;
    Ok(out)
}

/// Nearest-resize a native mask into the frame and zero-pad it.
fn mask_to_frame(frame: &ResizeLongestSide, mask: &Mask) -> Mask {
    let (nw, nh) = frame.resized_dims(mask.w, mask.h);
    let resized = resize_nearest(mask, nw, nh);
    let mut out = Mask::new(frame.target, frame.target);
    for (x, y) in resized.foreground() {
        if x < out.w && y < out.h {
            out.set(x, y, true);
        }
    }
    out
}

/// Refinement stage backed by a promptable model.
pub struct RefinementAdapter<M: PromptableModel> {
    model: M,
    frame: ResizeLongestSide,
    mask_threshold: f32,
    invocations: usize,
}

impl<M: PromptableModel> RefinementAdapter<M> {
    pub fn new(model: M, mask_threshold: f32) -> Self {
        let frame = ResizeLongestSide::new(model.input_size());
        Self {
            model,
            frame,
            mask_threshold,
            invocations: 0,
        }
    }

    /// Number of times the backing model has run.
    pub fn invocations(&self) -> usize {
        self.invocations
    }
}

impl<M: PromptableModel> RefinementSegmenter for RefinementAdapter<M> {
    fn infer_refined(&mut self, query: &ImageF32, bundle: &PromptBundle) -> Result<FinalPrediction> {
        let prompts = match bundle {
            PromptBundle::Empty => {
                debug!("empty prompt bundle, refinement skipped");
                return Ok(FinalPrediction {
                    mask: Mask::new(query.w, query.h),
                    score: 0.0,
                });
            }
            PromptBundle::Prompts(p) => p,
        };

        let out = run_in_frame(&mut self.model, &self.frame, query, prompts)?;
        self.invocations += 1;
        let model_mask = Mask::from_probability(&out.probability, self.mask_threshold);
        Ok(FinalPrediction {
            mask: self.frame.restore_mask(&model_mask, query.w, query.h),
            score: out.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::prompt::{PointLabel, PromptPoint};

    /// Fills the prompted box of the frame, records the last prompts.
    struct BoxFill {
        size: usize,
        last: Option<ModelPrompts>,
    }

    impl PromptableModel for BoxFill {
        fn input_size(&self) -> usize {
            self.size
        }

        fn predict(&mut self, image: &ImageF32, prompts: &ModelPrompts) -> Result<ModelOutput> {
            self.last = Some(prompts.clone());
            let b = prompts.bbox.unwrap_or([0.0, 0.0, 0.0, 0.0]);
            let probability = ImageF32::from_fn(image.w, image.h, |x, y| {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                if px >= b[0] && px < b[2] && py >= b[1] && py < b[3] {
                    1.0
                } else {
                    0.0
                }
            });
            Ok(ModelOutput {
                probability,
                score: 0.9,
            })
        }
    }

    fn bundle(bbox: BoundingBox) -> PromptBundle {
        PromptBundle::Prompts(Prompts {
            bbox: Some(bbox),
            points: vec![PromptPoint {
                x: 10,
                y: 5,
                label: PointLabel::Foreground,
            }],
            mask: None,
            extent: bbox,
        })
    }

    #[test]
    fn empty_bundle_never_runs_the_model() {
        let mut adapter = RefinementAdapter::new(BoxFill { size: 64, last: None }, 0.5);
        let query = ImageF32::new(40, 20, 1);
        let out = adapter.infer_refined(&query, &PromptBundle::Empty).unwrap();
        assert_eq!(out.mask.dims(), (40, 20));
        assert!(out.mask.is_background());
        assert_eq!(out.score, 0.0);
        assert_eq!(adapter.invocations(), 0);
    }

    #[test]
    fn prompts_are_mapped_into_the_frame_and_back() {
        let mut adapter = RefinementAdapter::new(BoxFill { size: 64, last: None }, 0.5);
        let query = ImageF32::new(32, 16, 1);
        let bbox = BoundingBox::new(8, 4, 8, 4);
        let out = adapter.infer_refined(&query, &bundle(bbox)).unwrap();
        assert_eq!(adapter.invocations(), 1);
        assert_eq!(out.score, 0.9);

        let seen = adapter.model.last.clone().unwrap();
        assert_eq!(seen.bbox, Some([16.0, 8.0, 32.0, 16.0]));
        assert_eq!(seen.points, vec![[21.0, 11.0]]);
        assert_eq!(seen.labels, vec![PointLabel::Foreground]);

        assert_eq!(out.mask.dims(), (32, 16));
        assert_eq!(out.mask.count_foreground(), 32);
        assert_eq!(crate::geometry::bounding_box(&out.mask), bbox);
    }

    #[test]
    fn mask_prompt_is_padded_to_the_frame() {
        let mut adapter = RefinementAdapter::new(BoxFill { size: 8, last: None }, 0.5);
        let query = ImageF32::new(4, 2, 1);
        let mask = Mask::from_fn(4, 2, |x, _| x == 0);
        let prompts = PromptBundle::Prompts(Prompts {
            bbox: None,
            points: Vec::new(),
            mask: Some(mask),
            extent: BoundingBox::new(0, 0, 1, 2),
        });
        adapter.infer_refined(&query, &prompts).unwrap();
        let seen = adapter.model.last.clone().unwrap().mask.unwrap();
        assert_eq!(seen.dims(), (8, 8));
        assert_eq!(seen.count_foreground(), 8);
        assert!(seen.is_set(1, 3) && !seen.is_set(2, 0) && !seen.is_set(0, 4));
    }

    struct WrongSize;

    impl PromptableModel for WrongSize {
        fn input_size(&self) -> usize {
            16
        }

        fn predict(&mut self, _: &ImageF32, _: &ModelPrompts) -> Result<ModelOutput> {
            Ok(ModelOutput {
                probability: ImageF32::new(8, 8, 1),
                score: 1.0,
            })
        }
    }

    #[test]
    fn wrong_output_size_is_a_shape_mismatch() {
        let mut adapter = RefinementAdapter::new(WrongSize, 0.5);
        let err = adapter
            .infer_refined(&ImageF32::new(16, 16, 1), &bundle(BoundingBox::new(1, 1, 4, 4)))
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }
}
