//! Summed-area tables for constant-time box sums.

use crate::GrayImageView;

/// Summed-area table with a zero row/column of padding.
///
/// `table[(y + 1) * (w + 1) + (x + 1)]` holds the sum of all pixels in
/// `[0, x] × [0, y]`.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    table: Vec<u64>,
}

impl IntegralImage {
    pub fn new(src: &GrayImageView<'_>) -> Self {
        Self::from_fn(src.width, src.height, |x, y| {
            src.data[y * src.width + x] as u64
        })
    }

    /// Build from an arbitrary per-pixel weight (e.g. a binary mask).
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> u64) -> Self {
        let stride = width + 1;
        let mut table = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0u64;
            for x in 0..width {
                row += f(x, y);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self {
            width,
            height,
            table,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum over the half-open rectangle `[x0, x1) × [y0, y1)`, clipped to the image.
    #[inline]
    pub fn sum(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> u64 {
        let cx0 = x0.clamp(0, self.width as i64) as usize;
        let cy0 = y0.clamp(0, self.height as i64) as usize;
        let cx1 = x1.clamp(0, self.width as i64) as usize;
        let cy1 = y1.clamp(0, self.height as i64) as usize;
        if cx1 <= cx0 || cy1 <= cy0 {
            return 0;
        }
        let s = self.width + 1;
        self.table[cy1 * s + cx1] + self.table[cy0 * s + cx0]
            - self.table[cy0 * s + cx1]
            - self.table[cy1 * s + cx0]
    }

    /// Mean over the square window of `radius` around `(x, y)`, clipped to the image.
    #[inline]
    pub fn window_mean(&self, x: usize, y: usize, radius: usize) -> f32 {
        let (x, y, r) = (x as i64, y as i64, radius as i64);
        let x0 = (x - r).max(0);
        let y0 = (y - r).max(0);
        let x1 = (x + r + 1).min(self.width as i64);
        let y1 = (y + r + 1).min(self.height as i64);
        let area = ((x1 - x0) * (y1 - y0)).max(1) as f32;
        self.sum(x0, y0, x1, y1) as f32 / area
    }
}
