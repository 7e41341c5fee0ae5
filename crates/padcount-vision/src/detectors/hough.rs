//! Gradient-directed circular Hough transform.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use log::debug;

use super::{is_local_max, DetectionCandidate, DetectionMethod, PadDetector, StrategyError};
use crate::{DetectionParameters, RadiusBounds};

#[cfg(feature = "tracing")]
use tracing::instrument;

const HOUGH_CONFIDENCE: f32 = 0.85;
/// Same smoothing `canny` applies before its own gradients, so vote
/// directions agree with where the edge pixels were placed.
const GRADIENT_SIGMA: f32 = 1.4;

/// Votes for centres along each edge pixel's gradient, both directions, for
/// every radius in bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct HoughDetector;

struct EdgePoint {
    x: f32,
    y: f32,
    ux: f32,
    uy: f32,
}

/// Vote grid with cells `dp` pixels wide. Cell `(ax, ay)` covers the
/// continuous span `[ax * dp, (ax + 1) * dp)`; pixel `x` is centred at `x + 0.5`.
struct Accumulator {
    dp: f32,
    width: usize,
    height: usize,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(image_w: u32, image_h: u32, dp: f32) -> Self {
        let width = ((image_w as f32 / dp).ceil() as usize).max(1);
        let height = ((image_h as f32 / dp).ceil() as usize).max(1);
        Self {
            dp,
            width,
            height,
            votes: vec![0; width * height],
        }
    }

    /// One vote per cell crossed by the ray from `p` between the two radii.
    fn cast(&mut self, p: &EdgePoint, sign: f32, r_min: f32, r_max: f32) {
        let px = (p.x + 0.5) / self.dp;
        let py = (p.y + 0.5) / self.dp;
        let (lo, hi) = (r_min / self.dp, r_max / self.dp);
        let mut last = usize::MAX;
        let mut t = lo;
        while t <= hi {
            let cx = px + sign * t * p.ux;
            let cy = py + sign * t * p.uy;
            if cx < 0.0 || cy < 0.0 {
                break;
            }
            let (ax, ay) = (cx as usize, cy as usize);
            if ax >= self.width || ay >= self.height {
                break;
            }
            let idx = ay * self.width + ax;
            if idx != last {
                self.votes[idx] += 1;
                last = idx;
            }
            t += 1.0;
        }
    }

    /// Pixel coordinates of a cell centre.
    fn centre(&self, idx: usize) -> (f32, f32) {
        let ax = (idx % self.width) as f32;
        let ay = (idx / self.width) as f32;
        ((ax + 0.5) * self.dp - 0.5, (ay + 0.5) * self.dp - 0.5)
    }

    /// Local maxima with at least `threshold` votes, strongest first.
    fn peaks(&self, threshold: u32) -> Vec<(u32, usize)> {
        let as_f32: Vec<f32> = self.votes.iter().map(|&v| v as f32).collect();
        let mut peaks = Vec::new();
        for ay in 0..self.height {
            for ax in 0..self.width {
                let idx = ay * self.width + ax;
                let v = self.votes[idx];
                if v >= threshold && is_local_max(&as_f32, self.width, self.height, ax, ay, 1) {
                    peaks.push((v, idx));
                }
            }
        }
        peaks.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        peaks
    }
}

impl PadDetector for HoughDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Hough
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            name = "hough",
            skip_all,
            fields(min_r = bounds.min_radius_px, max_r = bounds.max_radius_px)
        )
    )]
    fn detect(
        &self,
        image: &GrayImage,
        bounds: &RadiusBounds,
        params: &DetectionParameters,
    ) -> Result<Vec<DetectionCandidate>, StrategyError> {
        let (w, h) = image.dimensions();
        if w < 3 || h < 3 {
            return Err(StrategyError::ImageTooSmall {
                method: "hough",
                width: w,
                height: h,
                required: 3,
            });
        }
        let dp = params.hough_dp;
        if !dp.is_finite() || dp <= 0.0 {
            return Err(StrategyError::Degenerate {
                method: "hough",
                reason: format!("accumulator resolution {dp}"),
            });
        }

        let high = params.edge_threshold_1;
        let edges = canny(image, high / 2.0, high);
        let smoothed = gaussian_blur_f32(image, GRADIENT_SIGMA);
        let gx = horizontal_sobel(&smoothed);
        let gy = vertical_sobel(&smoothed);

        let mut points = Vec::new();
        for (x, y, p) in edges.enumerate_pixels() {
            if p.0[0] == 0 {
                continue;
            }
            let dx = gx.get_pixel(x, y).0[0] as f32;
            let dy = gy.get_pixel(x, y).0[0] as f32;
            let mag = dx.hypot(dy);
            if mag < 1e-3 {
                continue;
            }
            points.push(EdgePoint {
                x: x as f32,
                y: y as f32,
                ux: dx / mag,
                uy: dy / mag,
            });
        }

        let (r_min, r_max) = (bounds.min_radius_px as f32, bounds.max_radius_px as f32);
        let mut acc = Accumulator::new(w, h, dp);
        for p in &points {
            // Dark and light pads alike: the centre may lie on either side.
            acc.cast(p, 1.0, r_min, r_max);
            acc.cast(p, -1.0, r_min, r_max);
        }

        let threshold = params.edge_threshold_2;
        let min_dist = bounds.mid();
        let mut centres: Vec<(f32, f32)> = Vec::new();
        let mut out = Vec::new();
        for (_, idx) in acc.peaks(threshold) {
            let (cx, cy) = acc.centre(idx);
            if centres
                .iter()
                .any(|&(px, py)| (px - cx).hypot(py - cy) < min_dist)
            {
                continue;
            }
            let Some(r) = estimate_radius(&edges, cx, cy, bounds, threshold) else {
                continue;
            };
            centres.push((cx, cy));
            out.push(DetectionCandidate {
                x: cx.round() as i32,
                y: cy.round() as i32,
                r: r as i32,
                confidence: HOUGH_CONFIDENCE,
                method: DetectionMethod::Hough,
            });
        }

        debug!(
            "hough: {} edge px, {} circle(s) in r=[{}, {}]",
            points.len(),
            out.len(),
            bounds.min_radius_px,
            bounds.max_radius_px
        );
        Ok(out)
    }
}

/// Most supported radius from a histogram of edge distances around `(cx, cy)`.
///
/// Support counts the bin and its two neighbours, since digitised circles
/// straddle integer radii.
fn estimate_radius(
    edges: &GrayImage,
    cx: f32,
    cy: f32,
    bounds: &RadiusBounds,
    min_support: u32,
) -> Option<u32> {
    let (w, h) = edges.dimensions();
    let rmin = bounds.min_radius_px;
    let rmax = bounds.max_radius_px;
    let reach = rmax as f32 + 1.0;
    let x0 = (cx - reach).floor().max(0.0) as u32;
    let y0 = (cy - reach).floor().max(0.0) as u32;
    let x1 = ((cx + reach).ceil().max(0.0) as u32).min(w - 1);
    let y1 = ((cy + reach).ceil().max(0.0) as u32).min(h - 1);

    let mut hist = vec![0u32; (rmax - rmin + 1) as usize];
    for y in y0..=y1 {
        for x in x0..=x1 {
            if edges.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            let d = (x as f32 - cx).hypot(y as f32 - cy).round() as u32;
            if (rmin..=rmax).contains(&d) {
                hist[(d - rmin) as usize] += 1;
            }
        }
    }

    let support = |i: usize| -> u32 {
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(hist.len() - 1);
        hist[lo..=hi].iter().sum()
    };
    let (best, best_support) = (0..hist.len())
        .map(|i| (i, support(i)))
        .fold((0, 0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
    (best_support >= min_support).then_some(rmin + best as u32)
}
