//! Resampling helpers and the resize-longest-side frame used by promptable
//! models.
//!
//! - `resize_bilinear`: smooth resampling for images and probability maps.
//! - `resize_nearest`: label-preserving resampling for binary masks.
//! - [`ResizeLongestSide`]: scales the longer image side to a fixed length,
//!   pads bottom/right to a square and maps prompt coordinates through the
//!   same similarity transform.
use super::{ImageF32, Mask};
use nalgebra::{Matrix3, Vector3};

const EPS: f32 = 1e-9;

/// Bilinear resampling with half-pixel centres.
pub fn resize_bilinear(src: &ImageF32, dst_w: usize, dst_h: usize) -> ImageF32 {
    let mut out = ImageF32::new(dst_w, dst_h, src.channels);
    if src.is_empty() || dst_w == 0 || dst_h == 0 {
        return out;
    }
    if (src.w, src.h) == (dst_w, dst_h) {
        return src.clone();
    }
    let sx = src.w as f32 / dst_w as f32;
    let sy = src.h as f32 / dst_h as f32;
    let max_x = (src.w - 1) as f32;
    let max_y = (src.h - 1) as f32;
    for y in 0..dst_h {
        let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(src.h - 1);
        let ty = fy - y0 as f32;
        for x in 0..dst_w {
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(src.w - 1);
            let tx = fx - x0 as f32;
            for c in 0..src.channels {
                let top = src.get(x0, y0, c) * (1.0 - tx) + src.get(x1, y0, c) * tx;
                let bottom = src.get(x0, y1, c) * (1.0 - tx) + src.get(x1, y1, c) * tx;
                out.set(x, y, c, top * (1.0 - ty) + bottom * ty);
            }
        }
    }
    out
}

/// Nearest-neighbour resampling; never introduces values absent from `src`.
pub fn resize_nearest(src: &Mask, dst_w: usize, dst_h: usize) -> Mask {
    if src.w == 0 || src.h == 0 || dst_w == 0 || dst_h == 0 {
        return Mask::new(dst_w, dst_h);
    }
    if (src.w, src.h) == (dst_w, dst_h) {
        return src.clone();
    }
    let sx = src.w as f64 / dst_w as f64;
    let sy = src.h as f64 / dst_h as f64;
    Mask::from_fn(dst_w, dst_h, |x, y| {
        let xs = (((x as f64 + 0.5) * sx).floor() as usize).min(src.w - 1);
        let ys = (((y as f64 + 0.5) * sy).floor() as usize).min(src.h - 1);
        src.is_set(xs, ys)
    })
}

/// Resize-longest-side frame for a model with a square input of `target` px.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeLongestSide {
    pub target: usize,
}

impl ResizeLongestSide {
    pub fn new(target: usize) -> Self {
        Self {
            target: target.max(1),
        }
    }

    /// Size of the resized (unpadded) image for an input of `w × h`.
    pub fn resized_dims(&self, w: usize, h: usize) -> (usize, usize) {
        let long = w.max(h).max(1) as f64;
        let scale = self.target as f64 / long;
        let nw = ((w as f64 * scale) + 0.5).floor() as usize;
        let nh = ((h as f64 * scale) + 0.5).floor() as usize;
        (nw.max(1), nh.max(1))
    }

    /// Similarity transform from native image coordinates to the model frame.
    pub fn transform(&self, w: usize, h: usize) -> Matrix3<f32> {
        let (nw, nh) = self.resized_dims(w, h);
        let sx = if w > 0 { nw as f32 / w as f32 } else { 1.0 };
        let sy = if h > 0 { nh as f32 / h as f32 } else { 1.0 };
        Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0)
    }

    /// Resize the image and pad it to `target × target`.
    pub fn apply_image(&self, img: &ImageF32) -> ImageF32 {
        let (nw, nh) = self.resized_dims(img.w, img.h);
        resize_bilinear(img, nw, nh).pad_to(self.target, self.target)
    }

    /// Map native-resolution points into the model frame.
    pub fn apply_points(&self, pts: &[[f32; 2]], w: usize, h: usize) -> Option<Vec<[f32; 2]>> {
        apply_transform_points(&self.transform(w, h), pts)
    }

    /// Map a box given as corners `[x0, y0, x1, y1]` into the model frame.
    pub fn apply_box(&self, corners: [f32; 4], w: usize, h: usize) -> Option<[f32; 4]> {
        let pts = self.apply_points(&[[corners[0], corners[1]], [corners[2], corners[3]]], w, h)?;
        Some([pts[0][0], pts[0][1], pts[1][0], pts[1][1]])
    }

    /// Undo the padding and resize a model-frame mask back to `w × h`.
    pub fn restore_mask(&self, model_mask: &Mask, w: usize, h: usize) -> Mask {
        let (nw, nh) = self.resized_dims(w, h);
        resize_nearest(&model_mask.crop(nw, nh), w, h)
    }
}

/// Apply a projective 3×3 transform to 2D points, `None` on degenerate output.
pub fn apply_transform_points(m: &Matrix3<f32>, pts: &[[f32; 2]]) -> Option<Vec<[f32; 2]>> {
    let mut out = Vec::with_capacity(pts.len());
    for &p in pts {
        let v = m * Vector3::new(p[0], p[1], 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() <= EPS || !v[0].is_finite() || !v[1].is_finite() {
            return None;
        }
        out.push([v[0] / w, v[1] / w]);
    }
    Some(out)
}
