//! Connected-component filtering of coarse masks.
//!
//! Components are grown with 8-connectivity from seeds visited in scan order,
//! so component indices follow the position of each component's first pixel.
use crate::geometry::BoundingBox;
use crate::image::{ImageF32, Mask};
use serde::{Deserialize, Serialize};

const NEIGH_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Which valid components survive the filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcaKeep {
    /// Only the largest valid component; ties go to the first in scan order.
    #[default]
    Largest,
    /// Every component that passes the criteria.
    AllValid,
}

/// Selection criteria for connected components.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CcaParams {
    /// Minimum component size in pixels.
    pub min_component_area: usize,
    /// Minimum mean coarse probability over the component.
    pub min_component_confidence: f32,
    pub keep: CcaKeep,
}

impl Default for CcaParams {
    fn default() -> Self {
        Self {
            min_component_area: 1,
            min_component_confidence: 0.0,
            keep: CcaKeep::Largest,
        }
    }
}

/// Statistics of one connected foreground component.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub indices: Vec<usize>,
    pub bbox: BoundingBox,
    pub centroid: [f32; 2],
    pub mean_probability: f32,
}

impl Component {
    pub fn area(&self) -> usize {
        self.indices.len()
    }
}

struct ComponentAccumulator {
    indices: Vec<usize>,
    sum_x: f64,
    sum_y: f64,
    sum_prob: f64,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl ComponentAccumulator {
    fn new() -> Self {
        Self {
            indices: Vec::new(),
            sum_x: 0.0,
            sum_y: 0.0,
            sum_prob: 0.0,
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        }
    }

    fn push(&mut self, idx: usize, x: usize, y: usize, prob: f32) {
        self.indices.push(idx);
        self.sum_x += x as f64;
        self.sum_y += y as f64;
        self.sum_prob += f64::from(prob);
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn finish(self) -> Component {
        let n = self.indices.len().max(1) as f64;
        Component {
            bbox: BoundingBox::new(
                self.min_x as u32,
                self.min_y as u32,
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
            centroid: [(self.sum_x / n) as f32, (self.sum_y / n) as f32],
            mean_probability: (self.sum_prob / n) as f32,
            indices: self.indices,
        }
    }
}

/// Label the 8-connected foreground components of `mask`.
///
/// `prob` supplies per-pixel confidence; without it every foreground pixel
/// counts as probability 1.
pub fn connected_components(mask: &Mask, prob: Option<&ImageF32>) -> Vec<Component> {
    let (w, h) = mask.dims();
    let prob = prob.filter(|p| p.w == w && p.h == h);
    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let mut components = Vec::new();

    for seed in 0..w * h {
        if visited[seed] || mask.data[seed] == 0 {
            continue;
        }
        let mut acc = ComponentAccumulator::new();
        visited[seed] = true;
        stack.push(seed);
        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            let p = prob.map_or(1.0, |p| p.get(x, y, 0));
            acc.push(idx, x, y, p);
            for (dx, dy) in NEIGH_OFFSETS {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if !visited[nidx] && mask.data[nidx] != 0 {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }
        acc.indices.sort_unstable();
        components.push(acc.finish());
    }
    components
}

/// Keep only the components selected by `params`.
///
/// When no component meets the criteria the largest one is kept, so a mask
/// with a single component always keeps it.
pub fn filter_components(mask: &Mask, prob: Option<&ImageF32>, params: &CcaParams) -> Mask {
    let components = connected_components(mask, prob);
    if components.is_empty() {
        return mask.clone();
    }

    let valid: Vec<&Component> = components
        .iter()
        .filter(|c| {
            c.area() >= params.min_component_area
                && c.mean_probability >= params.min_component_confidence
        })
        .collect();

    let kept: Vec<&Component> = match (valid.is_empty(), params.keep) {
        (true, _) => largest(components.iter()).into_iter().collect(),
        (false, CcaKeep::Largest) => largest(valid.into_iter()).into_iter().collect(),
        (false, CcaKeep::AllValid) => valid,
    };

    let mut out = Mask::new(mask.w, mask.h);
    for c in kept {
        for &idx in &c.indices {
            out.data[idx] = 1;
        }
    }
    out
}

/// Largest component by pixel count, first in scan order on ties.
fn largest<'a>(components: impl Iterator<Item = &'a Component>) -> Option<&'a Component> {
    components.fold(None, |best: Option<&Component>, c| match best {
        Some(b) if b.area() >= c.area() => Some(b),
        _ => Some(c),
    })
}
