//! Axis-aligned box helpers shared by prompt synthesis and the detection curve.
use crate::image::{ImageView, Mask};
use serde::{Deserialize, Serialize};

/// Integer box in `(x, y, w, h)` form; `w`/`h` count pixels, so a single
/// foreground pixel at (3, 4) is `(3, 4, 1, 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        let (x, y) = (x as u64, y as u64);
        x >= u64::from(self.x)
            && x < u64::from(self.right())
            && y >= u64::from(self.y)
            && y < u64::from(self.bottom())
    }

    /// Corner form `[x0, y0, x1, y1]` with exclusive far corner, as floats.
    pub fn corners(&self) -> [f32; 4] {
        [
            self.x as f32,
            self.y as f32,
            self.right() as f32,
            self.bottom() as f32,
        ]
    }

    /// Smallest box covering both inputs; empty boxes are ignored.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Tight box around every foreground pixel; `(0, 0, 0, 0)` for an empty mask.
pub fn bounding_box(mask: &Mask) -> BoundingBox {
    let mut span: Option<(usize, usize, usize, usize)> = None;
    for (y, row) in mask.rows().enumerate() {
        let Some(first) = row.iter().position(|&v| v != 0) else {
            continue;
        };
        let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);
        span = Some(match span {
            None => (first, y, last, y),
            Some((x0, y0, x1, _)) => (x0.min(first), y0, x1.max(last), y),
        });
    }
    match span {
        None => BoundingBox::default(),
        Some((x0, y0, x1, y1)) => BoundingBox::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0 + 1) as u32,
            (y1 - y0 + 1) as u32,
        ),
    }
}

/// Intersection-over-union of two boxes; zero when the union is empty.
pub fn box_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = a.right().min(b.right());
    let y1 = a.bottom().min(b.bottom());
    let inter = u64::from(x1.saturating_sub(x0)) * u64::from(y1.saturating_sub(y0));
    let union = a.area() + b.area() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}
