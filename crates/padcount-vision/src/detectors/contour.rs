//! Blob outlines scored by circularity.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::open;
use log::debug;
use nalgebra::Point2;
use padcount_fiducial::adaptive_binarize;

use super::{DetectionCandidate, DetectionMethod, PadDetector, StrategyError};
use crate::{gray_view, DetectionParameters, RadiusBounds};

#[cfg(feature = "tracing")]
use tracing::instrument;

const MIN_AREA_PX: f32 = 50.0;
const MIN_CIRCULARITY: f32 = 0.6;
const THRESHOLD_OFFSET: f32 = 7.0;
const MEDIAN_RADIUS: u32 = 2;

/// Adaptive threshold, despeckle, opening, then one candidate per
/// sufficiently round top-level blob.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContourDetector;

impl PadDetector for ContourDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Contour
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", name = "contour", skip_all)
    )]
    fn detect(
        &self,
        image: &GrayImage,
        bounds: &RadiusBounds,
        _params: &DetectionParameters,
    ) -> Result<Vec<DetectionCandidate>, StrategyError> {
        let (w, h) = image.dimensions();
        let block_radius = bounds.max_radius_px.max(1) as usize;
        let bin = adaptive_binarize(&gray_view(image), block_radius, THRESHOLD_OFFSET);
        let bin = GrayImage::from_raw(w, h, bin.data).ok_or_else(|| StrategyError::Degenerate {
            method: "contour",
            reason: "binarised buffer size mismatch".to_string(),
        })?;
        let bin = median_filter(&bin, MEDIAN_RADIUS, MEDIAN_RADIUS);
        let bin = open(&bin, Norm::LInf, 1);

        let max_extent = 2.0 * bounds.max_radius_px as f32 + 2.0;
        let mut out = Vec::new();
        let mut blobs = 0usize;

        for contour in find_contours::<i32>(&bin) {
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }
            blobs += 1;
            let pts: Vec<Point2<f32>> = contour
                .points
                .iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect();

            let area = polygon_area(&pts);
            if area < MIN_AREA_PX {
                continue;
            }
            let (bw, bh) = extent(&pts);
            if bw > max_extent || bh > max_extent {
                continue;
            }

            let (centre, radius) = min_enclosing_circle(&pts);
            // Contour points are pixel centres; the blob reaches half a pixel further.
            let radius = radius + 0.5;
            if !bounds.contains(radius) {
                continue;
            }

            let perimeter = chain_length(&pts);
            if perimeter <= 0.0 {
                continue;
            }
            let circularity = 4.0 * std::f32::consts::PI * area / (perimeter * perimeter);
            if circularity < MIN_CIRCULARITY {
                continue;
            }

            out.push(DetectionCandidate {
                x: centre.x.round() as i32,
                y: centre.y.round() as i32,
                r: radius.round() as i32,
                confidence: circularity.min(1.0),
                method: DetectionMethod::Contour,
            });
        }

        debug!("contour: {blobs} blob(s), {} round enough", out.len());
        Ok(out)
    }
}

/// Absolute shoelace area.
fn polygon_area(pts: &[Point2<f32>]) -> f32 {
    let n = pts.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0f32;
    for i in 0..n {
        let p = pts[i];
        let q = pts[(i + 1) % n];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc.abs()
}

/// Closed chain length.
fn chain_length(pts: &[Point2<f32>]) -> f32 {
    let n = pts.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| (pts[(i + 1) % n] - pts[i]).norm()).sum()
}

fn extent(pts: &[Point2<f32>]) -> (f32, f32) {
    let (mut x0, mut y0) = (f32::INFINITY, f32::INFINITY);
    let (mut x1, mut y1) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in pts {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    (x1 - x0 + 1.0, y1 - y0 + 1.0)
}

/// Smallest circle containing every point (incremental Welzl).
fn min_enclosing_circle(pts: &[Point2<f32>]) -> (Point2<f32>, f32) {
    const EPS: f32 = 1e-3;
    let Some(&first) = pts.first() else {
        return (Point2::origin(), 0.0);
    };
    let inside = |c: Point2<f32>, r: f32, p: Point2<f32>| (p - c).norm() <= r + EPS;

    let mut c = first;
    let mut r = 0.0f32;
    for i in 1..pts.len() {
        if inside(c, r, pts[i]) {
            continue;
        }
        c = pts[i];
        r = 0.0;
        for j in 0..i {
            if inside(c, r, pts[j]) {
                continue;
            }
            c = nalgebra::center(&pts[i], &pts[j]);
            r = (pts[i] - pts[j]).norm() * 0.5;
            for k in 0..j {
                if inside(c, r, pts[k]) {
                    continue;
                }
                (c, r) = circumcircle(pts[i], pts[j], pts[k]).unwrap_or_else(|| {
                    widest_pair_circle(&[pts[i], pts[j], pts[k]])
                });
            }
        }
    }
    (c, r)
}

fn circumcircle(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> Option<(Point2<f32>, f32)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-6 {
        return None;
    }
    let a2 = a.coords.norm_squared();
    let b2 = b.coords.norm_squared();
    let c2 = c.coords.norm_squared();
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let centre = Point2::new(ux, uy);
    Some((centre, (a - centre).norm()))
}

fn widest_pair_circle(pts: &[Point2<f32>; 3]) -> (Point2<f32>, f32) {
    let pairs = [(0, 1), (0, 2), (1, 2)];
    let (i, j) = pairs
        .into_iter()
        .max_by(|&(a, b), &(c, d)| {
            (pts[a] - pts[b])
                .norm_squared()
                .total_cmp(&(pts[c] - pts[d]).norm_squared())
        })
        .unwrap_or((0, 1));
    (
        nalgebra::center(&pts[i], &pts[j]),
        (pts[i] - pts[j]).norm() * 0.5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radius::RadiusSource;
    use approx::assert_abs_diff_eq;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn bounds(min: u32, max: u32) -> RadiusBounds {
        RadiusBounds {
            min_radius_px: min,
            max_radius_px: max,
            source: RadiusSource::Manual,
        }
    }

    #[test]
    fn enclosing_circle_of_square_corners() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(2.0, 1.0),
        ];
        let (c, r) = min_enclosing_circle(&pts);
        assert_abs_diff_eq!(c.x, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(c.y, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(r, 8.0f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn round_blobs_pass_elongated_ones_fail() {
        let mut img = GrayImage::from_pixel(320, 200, Luma([230]));
        draw_filled_circle_mut(&mut img, (80, 100), 24, Luma([25]));
        draw_filled_rect_mut(&mut img, Rect::at(180, 90).of_size(90, 12), Luma([25]));

        let found = ContourDetector
            .detect(&img, &bounds(12, 48), &DetectionParameters::default())
            .expect("contour");
        assert_eq!(found.len(), 1, "{found:?}");
        let c = found[0];
        assert!((c.x - 80).abs() <= 1 && (c.y - 100).abs() <= 1, "{c:?}");
        assert!((c.r - 24).abs() <= 2, "{c:?}");
        assert!(c.confidence >= MIN_CIRCULARITY && c.confidence <= 1.0);
    }

    #[test]
    fn specks_and_oversized_blobs_are_ignored() {
        let mut img = GrayImage::from_pixel(300, 300, Luma([230]));
        draw_filled_circle_mut(&mut img, (40, 40), 2, Luma([20]));
        draw_filled_circle_mut(&mut img, (170, 170), 90, Luma([20]));
        let found = ContourDetector
            .detect(&img, &bounds(10, 40), &DetectionParameters::default())
            .expect("contour");
        assert!(found.is_empty(), "{found:?}");
    }
}
