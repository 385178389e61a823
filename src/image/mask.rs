//! Owned binary mask with values in `{0, 1}`.
use super::ImageF32;
use crate::error::{EvalError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl Mask {
    /// All-background mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    /// Wrap raw bytes; any non-zero byte is treated as foreground.
    pub fn from_vec(w: usize, h: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != w * h {
            return Err(EvalError::InvalidConfig(format!(
                "mask buffer holds {} values, expected {}x{}",
                data.len(),
                w,
                h
            )));
        }
        Ok(Self {
            w,
            h,
            data: data.into_iter().map(|v| u8::from(v != 0)).collect(),
        })
    }

    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(u8::from(f(x, y)));
            }
        }
        Self { w, h, data }
    }

    /// Foreground where `prob >= threshold` (channel 0 of `prob`).
    pub fn from_probability(prob: &ImageF32, threshold: f32) -> Self {
        Self::from_fn(prob.w, prob.h, |x, y| prob.get(x, y, 0) >= threshold)
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[self.idx(x, y)] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        let i = self.idx(x, y);
        self.data[i] = u8::from(on);
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// True when no pixel is foreground.
    pub fn is_background(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Foreground pixel coordinates in scan order.
    pub fn foreground(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.w.max(1);
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(move |(i, _)| (i % w, i / w))
    }

    /// Mask as a single-channel 0/1 float image.
    pub fn to_f32(&self) -> ImageF32 {
        ImageF32::from_fn(self.w, self.h, |x, y| f32::from(self.data[y * self.w + x]))
    }

    /// Top-left `w × h` window of the mask.
    pub fn crop(&self, w: usize, h: usize) -> Self {
        let w = w.min(self.w);
        let h = h.min(self.h);
        Self::from_fn(w, h, |x, y| self.is_set(x, y))
    }
}

impl super::traits::ImageView for Mask {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_binarises_values() {
        let m = Mask::from_vec(2, 2, vec![0, 255, 3, 0]).unwrap();
        assert_eq!(m.data, vec![0, 1, 1, 0]);
        assert_eq!(m.count_foreground(), 2);
        assert_eq!(m.foreground().collect::<Vec<_>>(), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn probability_threshold_is_inclusive() {
        let prob = ImageF32::from_fn(3, 1, |x, _| x as f32 * 0.25);
        let m = Mask::from_probability(&prob, 0.25);
        assert_eq!(m.data, vec![0, 1, 1]);
    }
}
