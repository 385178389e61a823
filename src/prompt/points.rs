//! Point prompt sampling from a filtered coarse mask.
use crate::geometry::BoundingBox;
use crate::image::{ImageF32, Mask};
use serde::{Deserialize, Serialize};

/// How positive points are picked inside the foreground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointMode {
    /// Foreground pixels nearest to the foreground centroid.
    #[default]
    Centroid,
    /// Foreground pixels with the highest coarse probability.
    Confidence,
    /// The centroid point first, then the most confident remaining pixels.
    Both,
}

/// Up to `n` foreground pixels chosen by `mode`; ties resolve in scan order.
pub fn foreground_points(
    mask: &Mask,
    prob: &ImageF32,
    mode: PointMode,
    n: usize,
) -> Vec<(usize, usize)> {
    let fg: Vec<(usize, usize)> = mask.foreground().collect();
    if fg.is_empty() || n == 0 {
        return Vec::new();
    }
    match mode {
        PointMode::Centroid => by_centroid_distance(&fg).into_iter().take(n).collect(),
        PointMode::Confidence => by_confidence(&fg, prob).into_iter().take(n).collect(),
        PointMode::Both => {
            let mut out = vec![by_centroid_distance(&fg)[0]];
            for p in by_confidence(&fg, prob) {
                if out.len() >= n {
                    break;
                }
                if !out.contains(&p) {
                    out.push(p);
                }
            }
            out
        }
    }
}

/// Up to `n` background pixels: the least confident ones inside `bbox`, or
/// the pixels diagonally outside its corners when the box is all foreground.
pub fn background_points(
    mask: &Mask,
    prob: &ImageF32,
    bbox: &BoundingBox,
    n: usize,
) -> Vec<(usize, usize)> {
    if n == 0 || bbox.is_empty() {
        return Vec::new();
    }
    let mut inside: Vec<(usize, usize)> = Vec::new();
    for y in bbox.y as usize..bbox.bottom() as usize {
        for x in bbox.x as usize..bbox.right() as usize {
            if !mask.is_set(x, y) {
                inside.push((x, y));
            }
        }
    }
    if !inside.is_empty() {
        inside.sort_by(|a, b| prob_at(prob, *a).total_cmp(&prob_at(prob, *b)));
        inside.truncate(n);
        return inside;
    }

    let (w, h) = mask.dims();
    let left = (bbox.x as usize).saturating_sub(1);
    let top = (bbox.y as usize).saturating_sub(1);
    let right = (bbox.right() as usize).min(w.saturating_sub(1));
    let bottom = (bbox.bottom() as usize).min(h.saturating_sub(1));
    let mut out = Vec::new();
    for p in [(left, top), (right, top), (left, bottom), (right, bottom)] {
        if out.len() >= n {
            break;
        }
        if !mask.is_set(p.0, p.1) && !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

fn by_centroid_distance(fg: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let n = fg.len() as f64;
    let cx = fg.iter().map(|p| p.0 as f64).sum::<f64>() / n;
    let cy = fg.iter().map(|p| p.1 as f64).sum::<f64>() / n;
    let dist = |p: &(usize, usize)| {
        let dx = p.0 as f64 - cx;
        let dy = p.1 as f64 - cy;
        dx * dx + dy * dy
    };
    let mut sorted = fg.to_vec();
    sorted.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
    sorted
}

fn by_confidence(fg: &[(usize, usize)], prob: &ImageF32) -> Vec<(usize, usize)> {
    let mut sorted = fg.to_vec();
    sorted.sort_by(|a, b| prob_at(prob, *b).total_cmp(&prob_at(prob, *a)));
    sorted
}

#[inline]
fn prob_at(prob: &ImageF32, p: (usize, usize)) -> f32 {
    if p.0 < prob.w && p.1 < prob.h {
        prob.get(p.0, p.1, 0)
    } else {
        0.0
    }
}
