//! Edge-template correlation against a disk of the expected radius.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::gradients::sobel_gradients;
use log::debug;
use padcount_core::IntegralImage;

use super::{is_local_max, DetectionCandidate, DetectionMethod, PadDetector, StrategyError};
use crate::{DetectionParameters, RadiusBounds};

#[cfg(feature = "tracing")]
use tracing::instrument;

const MIN_SCORE: f32 = 0.5;
const PEAK_RADIUS: usize = 5;
const TEMPLATE_MARGIN: u32 = 3;

/// Correlates the binary edge map of the frame with that of a filled disk at
/// the mid radius of the bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateDetector;

impl PadDetector for TemplateDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Template
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", name = "template", skip_all)
    )]
    fn detect(
        &self,
        image: &GrayImage,
        bounds: &RadiusBounds,
        params: &DetectionParameters,
    ) -> Result<Vec<DetectionCandidate>, StrategyError> {
        let radius = (bounds.mid().round() as u32).max(1);
        let side = 2 * (radius + TEMPLATE_MARGIN) + 1;
        let (w, h) = image.dimensions();
        if w < side || h < side {
            return Err(StrategyError::ImageTooSmall {
                method: "template",
                width: w,
                height: h,
                required: side,
            });
        }

        let edge_threshold = params.edge_threshold_1;
        let template = disk_template(radius, side);
        let half = (side / 2) as i64;
        let offsets: Vec<(i64, i64)> = edge_mask(&template, edge_threshold)
            .into_iter()
            .map(|(x, y)| (x as i64 - half, y as i64 - half))
            .collect();
        let k = offsets.len() as f32;
        let n = (side * side) as f32;
        if offsets.is_empty() {
            return Err(StrategyError::Degenerate {
                method: "template",
                reason: "template has no edges".to_string(),
            });
        }

        let edges = edge_mask(image, edge_threshold);
        let (wu, hu) = (w as usize, h as usize);
        let mut is_edge = vec![false; wu * hu];
        for &(x, y) in &edges {
            is_edge[y as usize * wu + x as usize] = true;
        }
        let integral = IntegralImage::from_fn(wu, hu, |x, y| u64::from(is_edge[y * wu + x]));

        // Overlap count per template centre, scattered from each image edge pixel.
        let mut overlap = vec![0u32; wu * hu];
        for &(ex, ey) in &edges {
            for &(ox, oy) in &offsets {
                let cx = ex as i64 - ox;
                let cy = ey as i64 - oy;
                if cx < half || cy < half || cx >= w as i64 - half || cy >= h as i64 - half {
                    continue;
                }
                overlap[cy as usize * wu + cx as usize] += 1;
            }
        }

        let t_var = k * (1.0 - k / n);
        let mut scores = vec![0.0f32; wu * hu];
        for cy in half..h as i64 - half {
            for cx in half..w as i64 - half {
                let idx = cy as usize * wu + cx as usize;
                let c = overlap[idx];
                if c == 0 {
                    continue;
                }
                let m = integral.sum(cx - half, cy - half, cx + half + 1, cy + half + 1) as f32;
                let i_var = m * (1.0 - m / n);
                let denom = (t_var * i_var).sqrt();
                if denom > 0.0 {
                    scores[idx] = (c as f32 - k * m / n) / denom;
                }
            }
        }

        let mut out = Vec::new();
        for y in 0..hu {
            for x in 0..wu {
                let s = scores[y * wu + x];
                if s >= MIN_SCORE && is_local_max(&scores, wu, hu, x, y, PEAK_RADIUS) {
                    out.push(DetectionCandidate {
                        x: x as i32,
                        y: y as i32,
                        r: radius as i32,
                        confidence: s.min(1.0),
                        method: DetectionMethod::Template,
                    });
                }
            }
        }

        debug!(
            "template: r={radius}, {} edge px, {} peak(s)",
            edges.len(),
            out.len()
        );
        Ok(out)
    }
}

/// Black disk on white, centred in a `side × side` patch.
fn disk_template(radius: u32, side: u32) -> GrayImage {
    let mut t = GrayImage::from_pixel(side, side, Luma([255]));
    let c = (side / 2) as i32;
    draw_filled_circle_mut(&mut t, (c, c), radius as i32, Luma([0]));
    t
}

/// Pixels whose Sobel magnitude reaches `threshold`.
fn edge_mask(image: &GrayImage, threshold: f32) -> Vec<(u32, u32)> {
    sobel_gradients(image)
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] as f32 >= threshold)
        .map(|(x, y, _)| (x, y))
        .collect()
}
