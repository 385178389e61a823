use crate::config::EvalConfig;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{
    CoarseStage, InputDescriptor, PipelineTrace, PromptStage, RefineStage, TimingBreakdown,
};
use crate::error::{ensure_same_shape, Result};
use crate::image::{ImageF32, Mask};
use crate::model::{
    build_coarse, build_refiner, CoarseAux, CoarseParams, CoarsePrediction, CoarseSegmenter,
    FinalPrediction, ModelProvider, RefinementSegmenter,
};
use crate::prompt::{synthesize_with_mask, PointLabel, PromptBundle, PromptPolicy};
use crate::support::SupportSet;
use log::debug;
use std::time::Instant;

/// Result of one cascade run.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub coarse: CoarsePrediction,
    /// Coarse mask after component filtering.
    pub filtered: Mask,
    pub bundle: PromptBundle,
    pub prediction: FinalPrediction,
    pub trace: PipelineTrace,
}

impl PipelineOutput {
    /// The coarse stage left no foreground to prompt with.
    pub fn empty_coarse(&self) -> bool {
        self.bundle.is_empty()
    }
}

/// Coarse adapter, prompt policy and optional refinement adapter.
pub struct CascadePipeline {
    coarse: Box<dyn CoarseSegmenter>,
    refiner: Option<Box<dyn RefinementSegmenter>>,
    policy: PromptPolicy,
    coarse_params: CoarseParams,
}

impl CascadePipeline {
    pub fn new(
        coarse: Box<dyn CoarseSegmenter>,
        refiner: Option<Box<dyn RefinementSegmenter>>,
        policy: PromptPolicy,
        coarse_params: CoarseParams,
    ) -> Self {
        Self {
            coarse,
            refiner,
            policy,
            coarse_params,
        }
    }

    /// Build both stages from configuration, loading weights via `provider`.
    pub fn from_config(cfg: &EvalConfig, provider: &dyn ModelProvider) -> Result<Self> {
        cfg.prompt.validate()?;
        let coarse = build_coarse(&cfg.coarse, provider)?;
        let refiner = build_refiner(&cfg.refine, provider)?;
        Ok(Self::new(
            coarse,
            refiner,
            cfg.prompt.clone(),
            cfg.coarse.clone(),
        ))
    }

    /// Whether a refinement stage is attached.
    pub fn refines(&self) -> bool {
        self.refiner.is_some()
    }

    pub fn policy(&self) -> &PromptPolicy {
        &self.policy
    }

    pub fn run(&mut self, query: &ImageF32, support: &SupportSet) -> Result<PipelineOutput> {
        let total_start = Instant::now();
        let (w, h) = (query.w, query.h);
        let mut timings = TimingBreakdown::default();

        let aux = CoarseAux::for_query(query, &self.coarse_params);
        let coarse_start = Instant::now();
        let coarse = self.coarse.infer_coarse(query, support, &aux)?;
        timings.push("coarse", elapsed_ms(coarse_start));
        ensure_same_shape("coarse mask", (w, h), coarse.mask.dims())?;
        ensure_same_shape(
            "coarse probability",
            (w, h),
            (coarse.probability.w, coarse.probability.h),
        )?;

        let policy = &self.policy;
        let (filtered, bundle) = timings.time("prompt", || synthesize_with_mask(&coarse, policy));

        let prediction = match self.refiner.as_mut() {
            None => FinalPrediction {
                mask: filtered.clone(),
                score: coarse.score,
            },
            Some(refiner) => {
                let refine_start = Instant::now();
                let refined = refiner.infer_refined(query, &bundle)?;
                timings.push("refine", elapsed_ms(refine_start));
                refined
            }
        };
        ensure_same_shape("final mask", (w, h), prediction.mask.dims())?;
        timings.total_ms = elapsed_ms(total_start);

        debug!(
            "cascade run {}x{} segment={} coarse_px={} filtered_px={} empty={} final_px={}",
            w,
            h,
            support.segment,
            coarse.mask.count_foreground(),
            filtered.count_foreground(),
            bundle.is_empty(),
            prediction.mask.count_foreground()
        );

        let trace = PipelineTrace {
            input: InputDescriptor {
                width: w,
                height: h,
                segment: support.segment.clone(),
                support_examples: support.len(),
            },
            timings,
            coarse: CoarseStage {
                family: self.coarse.family(),
                score: coarse.score,
                foreground_px: coarse.mask.count_foreground(),
                filtered_px: filtered.count_foreground(),
            },
            prompt: prompt_stage(&bundle),
            refine: self.refiner.as_ref().map(|_| RefineStage {
                score: prediction.score,
                foreground_px: prediction.mask.count_foreground(),
            }),
        };

        Ok(PipelineOutput {
            coarse,
            filtered,
            bundle,
            prediction,
            trace,
        })
    }
}

fn prompt_stage(bundle: &PromptBundle) -> PromptStage {
    match bundle.prompts() {
        None => PromptStage {
            empty: true,
            bbox: None,
            positive_points: 0,
            negative_points: 0,
            dense_mask: false,
        },
        Some(p) => PromptStage {
            empty: false,
            bbox: p.bbox,
            positive_points: p
                .points
                .iter()
                .filter(|pt| pt.label == PointLabel::Foreground)
                .count(),
            negative_points: p
                .points
                .iter()
                .filter(|pt| pt.label == PointLabel::Background)
                .count(),
            dense_mask: p.mask.is_some(),
        },
    }
}
