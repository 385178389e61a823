//! I/O helpers for images, masks and JSON.
//!
//! - `load_image`: read a PNG/JPEG/etc. into an owned RGB or gray `ImageF32` in `[0, 1]`.
//! - `load_mask`: read a label image, any non-zero pixel is foreground.
//! - `save_overlay`: write an image with a translucent mask overlay.
//! - `save_mask`: write a binary mask as black/white PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageF32, Mask};
use crate::error::{EvalError, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk, keeping three channels unless `grayscale` is set.
pub fn load_image(path: &Path, grayscale: bool) -> Result<ImageF32> {
    let img = image::open(path).map_err(|e| EvalError::io(path, e))?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    if grayscale {
        let data = img.into_luma8().into_raw();
        ImageF32::from_vec(w, h, 1, data.into_iter().map(|v| v as f32 / 255.0).collect())
    } else {
        let data = img.into_rgb8().into_raw();
        ImageF32::from_vec(w, h, 3, data.into_iter().map(|v| v as f32 / 255.0).collect())
    }
}

/// Load a label image as a binary mask.
pub fn load_mask(path: &Path) -> Result<Mask> {
    let img = image::open(path)
        .map_err(|e| EvalError::io(path, e))?
        .into_luma8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Mask::from_vec(w, h, img.into_raw())
}

/// Save a binary mask as a black/white PNG.
pub fn save_mask(mask: &Mask, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(mask.w as u32, mask.h as u32);
    for (x, y) in mask.foreground() {
        out.put_pixel(x as u32, y as u32, Luma([255]));
    }
    out.save(path).map_err(|e| EvalError::io(path, e))
}

/// Save `image` min-max normalised to RGB, blending `overlay` in red at 50%.
pub fn save_overlay(image: &ImageF32, overlay: Option<&Mask>, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let (lo, hi) = image.min_max().unwrap_or((0.0, 1.0));
    let range = if hi - lo > f32::EPSILON { hi - lo } else { 1.0 };
    let mut out = RgbImage::new(image.w as u32, image.h as u32);
    for y in 0..image.h {
        for x in 0..image.w {
            let px = image.pixel(x, y);
            let mut rgb = [0.0f32; 3];
            for (c, v) in rgb.iter_mut().enumerate() {
                let sample = px[c.min(px.len() - 1)];
                *v = ((sample - lo) / range).clamp(0.0, 1.0);
            }
            if overlay.is_some_and(|m| m.w == image.w && m.h == image.h && m.is_set(x, y)) {
                rgb = [0.5 * rgb[0] + 0.5, 0.5 * rgb[1], 0.5 * rgb[2]];
            }
            out.put_pixel(
                x as u32,
                y as u32,
                Rgb(rgb.map(|v| (v * 255.0).round() as u8)),
            );
        }
    }
    out.save(path).map_err(|e| EvalError::io(path, e))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| EvalError::io(path, e))?;
    fs::write(path, json).map_err(|e| EvalError::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }
    Ok(())
}
