use super::TimingBreakdown;
use crate::geometry::BoundingBox;
use crate::model::ModelFamily;
use serde::Serialize;

/// Query dimensions and the support set it was conditioned on.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub segment: String,
    pub support_examples: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoarseStage {
    pub family: ModelFamily,
    pub score: f32,
    pub foreground_px: usize,
    /// Foreground left after component filtering.
    pub filtered_px: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptStage {
    pub empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    pub positive_points: usize,
    pub negative_points: usize,
    pub dense_mask: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineStage {
    pub score: f32,
    pub foreground_px: usize,
}

/// Execution trace of one cascade run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    pub coarse: CoarseStage,
    pub prompt: PromptStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine: Option<RefineStage>,
}
