//! Owned multi-channel f32 image in row-major, channel-interleaved layout.
//!
//! Query and support images, as well as single-channel probability maps, are
//! stored in this type. A probability map is simply an `ImageF32` with
//! `channels == 1` and values in `[0, 1]`.
use crate::error::{EvalError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Interleaved samples per pixel
    pub channels: usize,
    /// Backing storage, `w * h * channels` samples
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h × channels`.
    pub fn new(w: usize, h: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            w,
            h,
            channels,
            data: vec![0.0; w * h * channels],
        }
    }

    /// Wrap an existing buffer, checking its length.
    pub fn from_vec(w: usize, h: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        let channels = channels.max(1);
        if data.len() != w * h * channels {
            return Err(EvalError::InvalidConfig(format!(
                "image buffer holds {} samples, expected {}x{}x{}",
                data.len(),
                w,
                h,
                channels
            )));
        }
        Ok(Self {
            w,
            h,
            channels,
            data,
        })
    }

    /// Single-channel image built from a per-pixel function.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self {
            w,
            h,
            channels: 1,
            data,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        (y * self.w + x) * self.channels
    }

    /// Sample of channel `c` at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.idx(x, y) + c]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, v: f32) {
        let i = self.idx(x, y) + c;
        self.data[i] = v;
    }

    /// All channels of the pixel at (x, y).
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let i = self.idx(x, y);
        &self.data[i..i + self.channels]
    }

    /// Channel-averaged intensity at (x, y).
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> f32 {
        let px = self.pixel(x, y);
        px.iter().sum::<f32>() / px.len() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Minimum and maximum sample values, `None` for an empty image.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Copy the image into the top-left corner of a zero canvas of size `w × h`.
    pub fn pad_to(&self, w: usize, h: usize) -> Self {
        let mut out = Self::new(w.max(self.w), h.max(self.h), self.channels);
        let row_len = self.w * self.channels;
        for y in 0..self.h {
            let src = &self.data[y * row_len..(y + 1) * row_len];
            let start = out.idx(0, y);
            out.data[start..start + row_len].copy_from_slice(src);
        }
        out
    }

    /// Top-left `w × h` window of the image.
    pub fn crop(&self, w: usize, h: usize) -> Self {
        let w = w.min(self.w);
        let h = h.min(self.h);
        let mut out = Self::new(w, h, self.channels);
        let row_len = w * self.channels;
        for y in 0..h {
            let src = self.idx(0, y);
            let dst = out.idx(0, y);
            out.data[dst..dst + row_len].copy_from_slice(&self.data[src..src + row_len]);
        }
        out
    }

    /// Rotate clockwise by `k` quarter turns.
    pub fn rotate_quarter_turns(&self, k: u8) -> Self {
        let mut out = self.clone();
        for _ in 0..k % 4 {
            let src = out;
            let mut dst = Self::new(src.h, src.w, src.channels);
            for y in 0..src.h {
                for x in 0..src.w {
                    let nx = src.h - 1 - y;
                    let (si, di) = (src.idx(x, y), dst.idx(nx, x));
                    dst.data[di..di + src.channels]
                        .copy_from_slice(&src.data[si..si + src.channels]);
                }
            }
            out = dst;
        }
        out
    }
}

impl super::traits::ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let len = self.w * self.channels;
        let start = y * len;
        &self.data[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_then_crop_restores_image() {
        let img = ImageF32::from_fn(3, 2, |x, y| (x + 10 * y) as f32);
        let padded = img.pad_to(5, 5);
        assert_eq!((padded.w, padded.h), (5, 5));
        assert_eq!(padded.get(2, 1, 0), 12.0);
        assert_eq!(padded.get(4, 4, 0), 0.0);
        assert_eq!(padded.crop(3, 2), img);
    }

    #[test]
    fn quarter_turns_compose_to_identity() {
        let img = ImageF32::from_fn(3, 2, |x, y| (x + 10 * y) as f32);
        let cw = img.rotate_quarter_turns(1);
        assert_eq!((cw.w, cw.h), (2, 3));
        // Bottom-left corner moves to the top-left.
        assert_eq!(cw.get(0, 0, 0), 10.0);
        assert_eq!(cw.get(1, 0, 0), 0.0);
        assert_eq!(cw.rotate_quarter_turns(3), img);
        assert_eq!(img.rotate_quarter_turns(4), img);
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(ImageF32::from_vec(2, 2, 3, vec![0.0; 11]).is_err());
        assert!(ImageF32::from_vec(2, 2, 3, vec![0.0; 12]).is_ok());
    }
}
