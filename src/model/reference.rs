//! Built-in reference backends.
//!
//! These are small deterministic models operating on pixel intensity. They
//! stand in for learned weights in the CLI and the test-suite and exercise
//! the same adapter contracts a learned backend goes through.
//!
//! Weight files are JSON documents tagged by `model`:
//!
//! ```json
//! { "model": "intensity_prototype", "temperature": 0.05 }
//! { "model": "box_region", "sharpness": 20.0 }
//! ```
use super::{FewShotInput, FewShotModel, ModelOutput, ModelPrompts, PromptableModel};
use crate::error::{EvalError, Result};
use crate::image::ImageF32;
use crate::model::registry::ModelProvider;
use crate::prompt::PointLabel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototypeModelParams {
    /// Softness of the squared-distance comparison.
    pub temperature: f32,
    /// Blend of local (windowed) prototypes over the global ones.
    pub local_weight: f32,
}

impl Default for PrototypeModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.05,
            local_weight: 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxRegionParams {
    /// Slope of the foreground decision inside the prompted region.
    pub sharpness: f32,
    /// Half-size of the region grown around point prompts, as a fraction of
    /// the input size.
    pub point_radius: f32,
}

impl Default for BoxRegionParams {
    fn default() -> Self {
        Self {
            sharpness: 20.0,
            point_radius: 0.0625,
        }
    }
}

/// Contents of a reference weight file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ReferenceWeights {
    IntensityPrototype(PrototypeModelParams),
    BoxRegion(BoxRegionParams),
}

#[inline]
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Running foreground / background intensity means.
#[derive(Clone, Copy, Debug, Default)]
struct Prototypes {
    fg_sum: f64,
    fg_n: usize,
    bg_sum: f64,
    bg_n: usize,
}

impl Prototypes {
    fn add(&mut self, v: f32, fg: bool) {
        if fg {
            self.fg_sum += f64::from(v);
            self.fg_n += 1;
        } else {
            self.bg_sum += f64::from(v);
            self.bg_n += 1;
        }
    }

    fn means(&self) -> Option<(f32, f32)> {
        if self.fg_n == 0 || self.bg_n == 0 {
            return None;
        }
        Some((
            (self.fg_sum / self.fg_n as f64) as f32,
            (self.bg_sum / self.bg_n as f64) as f32,
        ))
    }
}

/// Few-shot model matching query intensities against support prototypes.
///
/// A global foreground/background prototype pair is built from every support
/// example. With a window size, prototypes are also pooled per window cell
/// and blended into the global pair where a cell has both classes.
#[derive(Clone, Debug, Default)]
pub struct IntensityPrototypeModel {
    params: PrototypeModelParams,
}

impl IntensityPrototypeModel {
    pub fn new(params: PrototypeModelParams) -> Self {
        Self { params }
    }
}

impl FewShotModel for IntensityPrototypeModel {
    fn predict(&mut self, input: &FewShotInput<'_>) -> Result<ModelOutput> {
        let q = input.query;
        let window = input.window_size.unwrap_or(0);
        let (cells_x, cells_y) = if window > 0 {
            (q.w.div_ceil(window), q.h.div_ceil(window))
        } else {
            (0, 0)
        };

        let mut global = Prototypes::default();
        let mut local = vec![Prototypes::default(); cells_x * cells_y];
        for (img, mask) in input.support_images.iter().zip(input.support_masks) {
            if (img.w, img.h) != mask.dims() {
                return Err(EvalError::ShapeMismatch {
                    what: "support mask",
                    expected: (img.w, img.h),
                    actual: mask.dims(),
                });
            }
            let same_grid = window > 0 && (img.w, img.h) == (q.w, q.h);
            for y in 0..img.h {
                for x in 0..img.w {
                    let v = img.luma(x, y);
                    let fg = mask.is_set(x, y);
                    global.add(v, fg);
                    if same_grid {
                        local[(y / window) * cells_x + x / window].add(v, fg);
                    }
                }
            }
        }

        let Some((g_fg, g_bg)) = global.means() else {
            return Ok(ModelOutput {
                probability: ImageF32::new(q.w, q.h, 1),
                score: 0.0,
            });
        };

        let t = self.params.temperature.max(1e-6);
        let lw = self.params.local_weight.clamp(0.0, 1.0);
        let probability = ImageF32::from_fn(q.w, q.h, |x, y| {
            let (mut p_fg, mut p_bg) = (g_fg, g_bg);
            if window > 0 {
                if let Some((l_fg, l_bg)) = local[(y / window) * cells_x + x / window].means() {
                    p_fg = (1.0 - lw) * g_fg + lw * l_fg;
                    p_bg = (1.0 - lw) * g_bg + lw * l_bg;
                }
            }
            let v = q.luma(x, y);
            sigmoid(((v - p_bg).powi(2) - (v - p_fg).powi(2)) / t)
        });
        let score = mean_foreground_probability(&probability);
        Ok(ModelOutput { probability, score })
    }
}

/// Mean probability over pixels at or above 0.5, zero if none.
fn mean_foreground_probability(prob: &ImageF32) -> f32 {
    let (sum, n) = prob
        .data
        .iter()
        .filter(|&&p| p >= 0.5)
        .fold((0.0f64, 0usize), |(s, n), &p| (s + f64::from(p), n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64) as f32
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, v: f32) {
        self.sum += f64::from(v);
        self.n += 1;
    }

    fn value(&self) -> f32 {
        if self.n == 0 {
            0.0
        } else {
            (self.sum / self.n as f64) as f32
        }
    }
}

/// Promptable model labelling pixels of the prompted region by their nearest
/// intensity prototype.
///
/// The foreground prototype comes from positive points, else the dense mask
/// prompt, else the region interior. The background prototype pools the
/// one-pixel ring around the region and any negative points.
#[derive(Clone, Debug)]
pub struct BoxRegionModel {
    input_size: usize,
    params: BoxRegionParams,
}

impl BoxRegionModel {
    pub fn new(input_size: usize, params: BoxRegionParams) -> Self {
        Self {
            input_size: input_size.max(1),
            params,
        }
    }

    /// Region of interest `[x0, y0, x1, y1]` in integer pixels.
    fn region(&self, prompts: &ModelPrompts) -> Option<[usize; 4]> {
        let n = self.input_size as f32;
        let clamp = |v: f32| v.clamp(0.0, n) as usize;
        if let Some(b) = prompts.bbox {
            return Some([clamp(b[0]), clamp(b[1]), clamp(b[2].ceil()), clamp(b[3].ceil())]);
        }
        if let Some(mask) = &prompts.mask {
            let b = crate::geometry::bounding_box(mask);
            if !b.is_empty() {
                return Some([b.x as usize, b.y as usize, b.right() as usize, b.bottom() as usize]);
            }
        }
        let r = self.params.point_radius * n;
        let fg: Vec<&[f32; 2]> = prompts
            .points
            .iter()
            .zip(&prompts.labels)
            .filter(|(_, l)| **l == PointLabel::Foreground)
            .map(|(p, _)| p)
            .collect();
        if fg.is_empty() {
            return None;
        }
        let x0 = fg.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min) - r;
        let y0 = fg.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min) - r;
        let x1 = fg.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max) + r;
        let y1 = fg.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max) + r;
        Some([clamp(x0), clamp(y0), clamp(x1.ceil()), clamp(y1.ceil())])
    }
}

impl PromptableModel for BoxRegionModel {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn predict(&mut self, image: &ImageF32, prompts: &ModelPrompts) -> Result<ModelOutput> {
        let n = self.input_size;
        if (image.w, image.h) != (n, n) {
            return Err(EvalError::ShapeMismatch {
                what: "box-region model input",
                expected: (n, n),
                actual: (image.w, image.h),
            });
        }
        let mut probability = ImageF32::new(n, n, 1);
        let empty = |probability: ImageF32| -> Result<ModelOutput> {
            Ok(ModelOutput {
                probability,
                score: 0.0,
            })
        };
        let Some([x0, y0, x1, y1]) = self.region(prompts) else {
            return empty(probability);
        };
        if x1 <= x0 || y1 <= y0 {
            return empty(probability);
        }
        let inside = |x: usize, y: usize| x >= x0 && x < x1 && y >= y0 && y < y1;

        let mut fg = Mean::default();
        let mut bg = Mean::default();
        for (p, label) in prompts.points.iter().zip(&prompts.labels) {
            let (px, py) = (
                (p[0].max(0.0) as usize).min(n - 1),
                (p[1].max(0.0) as usize).min(n - 1),
            );
            match label {
                PointLabel::Foreground => fg.add(image.luma(px, py)),
                PointLabel::Background => bg.add(image.luma(px, py)),
            }
        }
        if fg.n == 0 {
            if let Some(mask) = prompts.mask.as_ref().filter(|m| m.dims() == (n, n)) {
                for (x, y) in mask.foreground() {
                    fg.add(image.luma(x, y));
                }
            }
        }
        if fg.n == 0 {
            for y in y0..y1 {
                for x in x0..x1 {
                    fg.add(image.luma(x, y));
                }
            }
        }

        // One-pixel ring around the region.
        let (rx0, ry0) = (x0.saturating_sub(1), y0.saturating_sub(1));
        let (rx1, ry1) = ((x1 + 1).min(n), (y1 + 1).min(n));
        for y in ry0..ry1 {
            for x in rx0..rx1 {
                if !inside(x, y) {
                    bg.add(image.luma(x, y));
                }
            }
        }
        if bg.n == 0 {
            let mut lo = f32::INFINITY;
            for y in y0..y1 {
                for x in x0..x1 {
                    lo = lo.min(image.luma(x, y));
                }
            }
            bg.add(lo);
        }

        let (p_fg, p_bg) = (fg.value(), bg.value());
        let spread = (p_fg - p_bg) * (p_fg - p_bg);
        if spread <= f32::EPSILON {
            return empty(probability);
        }
        let mut kept = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let v = image.luma(x, y);
                let z = ((v - p_bg).powi(2) - (v - p_fg).powi(2)) / spread;
                let p = sigmoid(self.params.sharpness * z);
                if p >= 0.5 {
                    kept += 1;
                }
                probability.set(x, y, 0, p);
            }
        }
        let score = kept as f32 / ((x1 - x0) * (y1 - y0)) as f32;
        Ok(ModelOutput { probability, score })
    }
}

/// Loads [`ReferenceWeights`] files.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceModelProvider;

impl ReferenceModelProvider {
    fn read(path: &Path, family: &str) -> Result<ReferenceWeights> {
        let load_err = |reason: String| EvalError::ModelLoad {
            family: family.to_string(),
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))
    }
}

impl ModelProvider for ReferenceModelProvider {
    fn load_few_shot(&self, weights: &Path) -> Result<Box<dyn FewShotModel>> {
        match Self::read(weights, "prototype")? {
            ReferenceWeights::IntensityPrototype(p) => Ok(Box::new(IntensityPrototypeModel::new(p))),
            ReferenceWeights::BoxRegion(_) => Err(EvalError::ModelLoad {
                family: "prototype".to_string(),
                path: weights.to_path_buf(),
                reason: "weights describe a box_region model".to_string(),
            }),
        }
    }

    fn load_promptable(
        &self,
        weights: &Path,
        input_size: usize,
    ) -> Result<Box<dyn PromptableModel>> {
        match Self::read(weights, "promptable")? {
            ReferenceWeights::BoxRegion(p) => Ok(Box::new(BoxRegionModel::new(input_size, p))),
            ReferenceWeights::IntensityPrototype(_) => Err(EvalError::ModelLoad {
                family: "promptable".to_string(),
                path: weights.to_path_buf(),
                reason: "weights describe an intensity_prototype model".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Mask;
    use std::io::Write;

    fn blob(w: usize, h: usize, x0: usize, y0: usize, s: usize) -> Mask {
        Mask::from_fn(w, h, |x, y| x >= x0 && x < x0 + s && y >= y0 && y < y0 + s)
    }

    #[test]
    fn prototype_model_separates_bright_foreground() {
        let sup_mask = blob(16, 16, 2, 2, 6);
        let sup_img = ImageF32::from_fn(16, 16, |x, y| if sup_mask.is_set(x, y) { 0.9 } else { 0.1 });
        let query_mask = blob(16, 16, 8, 8, 5);
        let query = ImageF32::from_fn(16, 16, |x, y| if query_mask.is_set(x, y) { 0.85 } else { 0.15 });

        for window in [None, Some(4)] {
            let mut model = IntensityPrototypeModel::default();
            let out = model
                .predict(&FewShotInput {
                    query: &query,
                    support_images: std::slice::from_ref(&sup_img),
                    support_masks: std::slice::from_ref(&sup_mask),
                    window_size: window,
                })
                .unwrap();
            assert_eq!(Mask::from_probability(&out.probability, 0.5), query_mask);
            assert!(out.score > 0.9);
        }
    }

    #[test]
    fn prototype_model_without_foreground_support_predicts_nothing() {
        let query = ImageF32::from_fn(8, 8, |x, _| x as f32 / 8.0);
        let mut model = IntensityPrototypeModel::default();
        let out = model
            .predict(&FewShotInput {
                query: &query,
                support_images: &[query.clone()],
                support_masks: &[Mask::new(8, 8)],
                window_size: None,
            })
            .unwrap();
        assert!(out.probability.data.iter().all(|&p| p == 0.0));
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn box_region_model_fills_the_contrasting_blob() {
        let truth = blob(32, 32, 10, 12, 8);
        let image = ImageF32::from_fn(32, 32, |x, y| if truth.is_set(x, y) { 0.8 } else { 0.2 });
        let mut model = BoxRegionModel::new(32, BoxRegionParams::default());
        let prompts = ModelPrompts {
            bbox: Some([8.0, 10.0, 20.0, 22.0]),
            ..ModelPrompts::default()
        };
        let out = model.predict(&image, &prompts).unwrap();
        assert_eq!(Mask::from_probability(&out.probability, 0.5), truth);

        let by_point = ModelPrompts {
            points: vec![[14.0, 16.0]],
            labels: vec![PointLabel::Foreground],
            ..ModelPrompts::default()
        };
        let mut wide = BoxRegionModel::new(
            32,
            BoxRegionParams {
                point_radius: 0.25,
                ..BoxRegionParams::default()
            },
        );
        let out = wide.predict(&image, &by_point).unwrap();
        assert_eq!(Mask::from_probability(&out.probability, 0.5), truth);

        let out = model.predict(&image, &ModelPrompts::default()).unwrap();
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn provider_reads_tagged_weight_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proto.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, r#"{{"model": "intensity_prototype", "temperature": 0.1}}"#).unwrap();

        let provider = ReferenceModelProvider;
        assert!(provider.load_few_shot(&path).is_ok());
        assert!(matches!(
            provider.load_promptable(&path, 64),
            Err(EvalError::ModelLoad { .. })
        ));
        assert!(matches!(
            provider.load_few_shot(&dir.path().join("absent.json")),
            Err(EvalError::ModelLoad { .. })
        ));
    }
}
