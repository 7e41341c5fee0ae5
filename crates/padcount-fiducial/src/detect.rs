//! Marker localisation in a full grayscale frame.

use imageproc::contours::{find_contours, BorderType};
use log::debug;
use nalgebra::Point2;
use padcount_core::GrayImageView;
use serde::{Deserialize, Serialize};

use crate::quad::{approx_polygon, is_convex, refine_quad, signed_area};
use crate::threshold::adaptive_binarize;
use crate::{decode_marker_quad, Dictionary, Matcher};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Marker localisation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetectParams {
    /// Smallest accepted marker side, in pixels.
    pub min_side_px: f32,
    /// Polygon approximation tolerance as a fraction of contour length.
    pub polygon_epsilon_frac: f32,
    /// A pixel is foreground when darker than its local mean by this much.
    pub threshold_offset: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Hamming budget; `None` uses the dictionary's correction capacity.
    pub max_hamming: Option<u8>,
}

impl Default for MarkerDetectParams {
    fn default() -> Self {
        Self {
            min_side_px: 20.0,
            polygon_epsilon_frac: 0.03,
            threshold_offset: 7.0,
            min_border_score: 0.85,
            max_hamming: None,
        }
    }
}

/// One marker found in the frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedMarker {
    pub id: u32,
    /// Outer border corners in image pixels, clockwise on screen, starting
    /// at the contour's first vertex (not the marker's canonical top-left).
    pub corners: [Point2<f32>; 4],
    /// Enclosed area in px².
    pub area: f32,
    pub rotation: u8,
    pub hamming: u8,
    pub border_score: f32,
}

impl DetectedMarker {
    fn center(&self) -> Point2<f32> {
        Point2::from(self.corners.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f32>>() / 4.0)
    }
}

/// Square-marker detector over a single dictionary.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    params: MarkerDetectParams,
    matcher: Matcher,
}

impl MarkerDetector {
    pub fn new(dict: Dictionary, params: MarkerDetectParams) -> Self {
        let max_hamming = params.max_hamming.unwrap_or(dict.max_correction_bits);
        Self {
            params,
            matcher: Matcher::new(dict, max_hamming),
        }
    }

    pub fn params(&self) -> &MarkerDetectParams {
        &self.params
    }

    /// Detect every marker of the dictionary, sorted by enclosed area (largest first).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<DetectedMarker> {
        let mut found = Vec::new();
        for radius in threshold_radii(image.width, image.height) {
            found.extend(self.detect_at_radius(image, radius));
        }

        let mut markers = dedup_markers(found);
        markers.sort_by(|a, b| b.area.total_cmp(&a.area).then(a.id.cmp(&b.id)));
        debug!("fiducial: {} marker(s) decoded", markers.len());
        markers
    }

    fn detect_at_radius(&self, image: &GrayImageView<'_>, radius: usize) -> Vec<DetectedMarker> {
        let bin = adaptive_binarize(image, radius, self.params.threshold_offset);
        let Some(bin) = image::GrayImage::from_raw(bin.width as u32, bin.height as u32, bin.data)
        else {
            return Vec::new();
        };

        let min_perimeter = 4.0 * self.params.min_side_px;
        let mut out = Vec::new();
        let mut quads = 0usize;

        for contour in find_contours::<i32>(&bin) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            if (contour.points.len() as f32) < min_perimeter {
                continue;
            }
            let pts: Vec<Point2<f32>> = contour
                .points
                .iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect();

            let eps = self.params.polygon_epsilon_frac * pts.len() as f32;
            let vertices = approx_polygon(&pts, eps);
            let Ok(vertices) = <[usize; 4]>::try_from(vertices) else {
                continue;
            };
            let raw = vertices.map(|i| pts[i]);
            if !is_convex(&raw) {
                continue;
            }

            let mut corners = refine_quad(&pts, vertices);
            let mut area = signed_area(&corners);
            if area < 0.0 {
                corners.reverse();
                area = -area;
            }
            if area < self.params.min_side_px * self.params.min_side_px {
                continue;
            }
            quads += 1;

            if let Some(dec) =
                decode_marker_quad(image, &corners, &self.matcher, self.params.min_border_score)
            {
                out.push(DetectedMarker {
                    id: dec.matched.id,
                    corners,
                    area,
                    rotation: dec.matched.rotation,
                    hamming: dec.matched.hamming,
                    border_score: dec.border_score,
                });
            }
        }

        debug!(
            "fiducial: window radius {radius}px -> {quads} quad(s), {} decoded",
            out.len()
        );
        out
    }
}

/// Two window sizes: one for small markers, one wide enough to keep the
/// interior of a large marker's border above the local mean.
fn threshold_radii(width: usize, height: usize) -> Vec<usize> {
    let min_dim = width.min(height);
    let mut radii = vec![(min_dim / 40).max(7), (min_dim / 12).max(15)];
    radii.dedup();
    radii
}

/// Collapse detections of the same physical marker from different passes.
fn dedup_markers(found: Vec<DetectedMarker>) -> Vec<DetectedMarker> {
    let mut out: Vec<DetectedMarker> = Vec::with_capacity(found.len());
    for m in found {
        let c = m.center();
        let radius = 0.25 * m.area.sqrt();
        match out.iter_mut().find(|o| (o.center() - c).norm() < radius) {
            Some(existing) => {
                let better = m.hamming < existing.hamming
                    || (m.hamming == existing.hamming && m.border_score > existing.border_score);
                if better {
                    *existing = m;
                }
            }
            None => out.push(m),
        }
    }
    out
}
