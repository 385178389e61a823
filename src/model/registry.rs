//! Construction of stage adapters from configuration.
//!
//! Weights are resolved through a [`ModelProvider`] once, at startup. Every
//! failure surfaces as [`EvalError::ModelLoad`] before any sample is
//! processed.
use super::coarse::{PrototypeAdapter, ZeroShotAdapter};
use super::refine::RefinementAdapter;
use super::{
    CoarseParams, CoarseSegmenter, FewShotModel, ModelFamily, PromptableModel, RefineParams,
    RefinementSegmenter,
};
use crate::error::{EvalError, Result};
use log::debug;
use std::path::Path;

/// Source of backing models.
pub trait ModelProvider: Send + Sync {
    fn load_few_shot(&self, weights: &Path) -> Result<Box<dyn FewShotModel>>;

    fn load_promptable(&self, weights: &Path, input_size: usize)
        -> Result<Box<dyn PromptableModel>>;
}

fn as_load_error(family: &str, path: &Path, err: EvalError) -> EvalError {
    match err {
        EvalError::ModelLoad { .. } => err,
        other => EvalError::ModelLoad {
            family: family.to_string(),
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Coarse adapter selected by `params.family`.
pub fn build_coarse(
    params: &CoarseParams,
    provider: &dyn ModelProvider,
) -> Result<Box<dyn CoarseSegmenter>> {
    params.validate()?;
    let family = params.family.to_string();
    let adapter: Box<dyn CoarseSegmenter> = match params.family {
        ModelFamily::Prototype => {
            let model = provider
                .load_few_shot(&params.weights)
                .map_err(|e| as_load_error(&family, &params.weights, e))?;
            Box::new(PrototypeAdapter::new(model, params.mask_threshold))
        }
        ModelFamily::ZeroShot => {
            let model = provider
                .load_promptable(&params.weights, params.input_size)
                .map_err(|e| as_load_error(&family, &params.weights, e))?;
            Box::new(ZeroShotAdapter::new(
                model,
                params.zero_shot_prompt,
                params.mask_threshold,
            ))
        }
    };
    debug!(
        "coarse stage: {} from {}",
        family,
        params.weights.display()
    );
    Ok(adapter)
}

/// Refinement adapter, `None` in coarse-only mode.
pub fn build_refiner(
    params: &RefineParams,
    provider: &dyn ModelProvider,
) -> Result<Option<Box<dyn RefinementSegmenter>>> {
    params.validate()?;
    if params.coarse_pred_only {
        debug!("refinement disabled, scoring coarse predictions");
        return Ok(None);
    }
    let model = provider
        .load_promptable(&params.weights, params.input_size)
        .map_err(|e| as_load_error("refinement", &params.weights, e))?;
    debug!(
        "refinement stage: input {} from {}",
        params.input_size,
        params.weights.display()
    );
    Ok(Some(Box::new(RefinementAdapter::new(
        model,
        params.mask_threshold,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::reference::{BoxRegionModel, IntensityPrototypeModel};
    use std::path::PathBuf;

    struct Fake {
        fail: bool,
    }

    impl ModelProvider for Fake {
        fn load_few_shot(&self, weights: &Path) -> Result<Box<dyn FewShotModel>> {
            if self.fail {
                return Err(EvalError::io(weights, "not found"));
            }
            Ok(Box::new(IntensityPrototypeModel::default()))
        }

        fn load_promptable(
            &self,
            weights: &Path,
            input_size: usize,
        ) -> Result<Box<dyn PromptableModel>> {
            if self.fail {
                return Err(EvalError::io(weights, "not found"));
            }
            Ok(Box::new(BoxRegionModel::new(input_size, Default::default())))
        }
    }

    #[test]
    fn family_tag_selects_the_adapter() {
        let mut params = CoarseParams::default();
        let coarse = build_coarse(&params, &Fake { fail: false }).unwrap();
        assert_eq!(coarse.family(), ModelFamily::Prototype);
        params.family = ModelFamily::ZeroShot;
        let coarse = build_coarse(&params, &Fake { fail: false }).unwrap();
        assert_eq!(coarse.family(), ModelFamily::ZeroShot);
    }

    #[test]
    fn coarse_only_mode_builds_no_refiner() {
        let params = RefineParams {
            coarse_pred_only: true,
            ..RefineParams::default()
        };
        assert!(build_refiner(&params, &Fake { fail: true }).unwrap().is_none());
    }

    #[test]
    fn provider_failures_become_model_load_errors() {
        let params = CoarseParams {
            weights: PathBuf::from("missing.json"),
            ..CoarseParams::default()
        };
        match build_coarse(&params, &Fake { fail: true }) {
            Err(EvalError::ModelLoad { family, path, .. }) => {
                assert_eq!(family, "prototype");
                assert_eq!(path, PathBuf::from("missing.json"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a load failure"),
        }
        let err = build_refiner(&RefineParams::default(), &Fake { fail: true });
        assert!(matches!(err, Err(EvalError::ModelLoad { .. })));
    }
}
