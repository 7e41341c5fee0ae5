//! Frame quality metrics: focus, exposure and resolution.

use padcount_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub const MIN_FOCUS_VARIANCE: f64 = 50.0;
pub const MIN_MIDTONE_RATIO: f64 = 0.65;
pub const MIN_DIMENSION_PX: u32 = 600;

/// What to do when `quality_ok` is false.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPolicy {
    /// Report the metrics and keep going.
    #[default]
    Advisory,
    /// Abort with `PadCountError::QualityBelowThreshold`.
    Blocking,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Variance of the 4-neighbour Laplacian; low means blurry.
    pub focus_variance: f64,
    /// Fraction of pixels in `[5, 250]`; low means clipped exposure.
    pub midtone_ratio: f64,
    pub width: u32,
    pub height: u32,
    pub quality_ok: bool,
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(gray), fields(width = gray.width, height = gray.height))
)]
pub fn assess_quality(gray: &GrayImageView<'_>) -> QualityMetrics {
    let focus_variance = laplacian_variance(gray);
    let midtone_ratio = midtone_ratio(gray);
    let width = gray.width as u32;
    let height = gray.height as u32;
    let quality_ok = focus_variance >= MIN_FOCUS_VARIANCE
        && midtone_ratio >= MIN_MIDTONE_RATIO
        && width.min(height) >= MIN_DIMENSION_PX;

    QualityMetrics {
        focus_variance,
        midtone_ratio,
        width,
        height,
        quality_ok,
    }
}

/// Variance of `4·p − (up + down + left + right)` over interior pixels.
fn laplacian_variance(gray: &GrayImageView<'_>) -> f64 {
    let (w, h) = (gray.width, gray.height);
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: usize, y: usize| gray.data[y * w + x] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }
    let n = ((w - 2) * (h - 2)) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn midtone_ratio(gray: &GrayImageView<'_>) -> f64 {
    if gray.data.is_empty() {
        return 0.0;
    }
    let mid = gray
        .data
        .iter()
        .filter(|&&v| (5..=250).contains(&v))
        .count();
    mid as f64 / gray.data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use padcount_core::GrayImage;

    #[test]
    fn uniform_frame_fails_focus() {
        let img = GrayImage::new(800, 700, 128);
        let q = assess_quality(&img.view());
        assert_eq!(q.focus_variance, 0.0);
        assert_eq!(q.midtone_ratio, 1.0);
        assert!(!q.quality_ok);
    }

    #[test]
    fn sharp_midtone_texture_passes() {
        let (w, h) = (640, 640);
        let data = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                if (x / 4 + y / 4) % 2 == 0 {
                    60
                } else {
                    190
                }
            })
            .collect();
        let img = GrayImage {
            width: w,
            height: h,
            data,
        };
        let q = assess_quality(&img.view());
        assert!(q.focus_variance > MIN_FOCUS_VARIANCE);
        assert!(q.quality_ok, "{q:?}");
    }

    #[test]
    fn small_or_clipped_frames_fail() {
        let (w, h) = (640, 500);
        let data = (0..w * h)
            .map(|i| if (i % w / 3) % 2 == 0 { 70 } else { 180 })
            .collect();
        let small = GrayImage {
            width: w,
            height: h,
            data,
        };
        assert!(!assess_quality(&small.view()).quality_ok);

        let data = (0..700 * 700)
            .map(|i| if (i % 700 / 3) % 2 == 0 { 0 } else { 255 })
            .collect();
        let clipped = GrayImage {
            width: 700,
            height: 700,
            data,
        };
        let q = assess_quality(&clipped.view());
        assert!(q.midtone_ratio < MIN_MIDTONE_RATIO);
        assert!(!q.quality_ok);
    }
}
