//! Bit sampling and decoding of one marker from its image-space quad.

use nalgebra::Point2;
use padcount_core::{homography_from_4pt, GrayImageView, Homography};

use crate::threshold::otsu_threshold_from_samples;
use crate::{Match, Matcher};

/// One decoded marker quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerDecode {
    pub matched: Match,
    /// Observed inner bits (row-major, black=1).
    pub code: u64,
    /// Fraction of border cells read as black.
    pub border_score: f32,
    /// Whether the decoder inverted polarity to maximize `border_score`.
    pub inverted: bool,
}

const BORDER_CELLS: usize = 1;
const THRESH_SUBDIV: usize = 3;

/// Decode a marker whose outer border corners are `corners` (any consistent
/// winding; rotation is resolved by the matcher).
///
/// The quad is sampled through a homography: one 3×3 mean per cell centre,
/// thresholded with Otsu over a denser interior grid. Returns `None` if the
/// quad is degenerate, runs off the image, fails the border check or matches
/// no code.
pub fn decode_marker_quad(
    image: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    matcher: &Matcher,
    min_border_score: f32,
) -> Option<MarkerDecode> {
    let bits = matcher.dictionary().marker_size;
    if bits * bits > 64 {
        return None;
    }
    let cells = bits + 2 * BORDER_CELLS;
    let side = cells as f32;
    let unit = [
        Point2::new(0.0, 0.0),
        Point2::new(side, 0.0),
        Point2::new(side, side),
        Point2::new(0.0, side),
    ];
    let h = homography_from_4pt(&unit, corners)?;

    let mut samples = Vec::with_capacity(cells * cells);
    for cy in 0..cells {
        for cx in 0..cells {
            let q = h.apply(Point2::new(cx as f32 + 0.5, cy as f32 + 0.5));
            samples.push(sample_mean_3x3(image, q.x, q.y)?);
        }
    }

    let thr_samples = threshold_samples(image, &h, cells);
    let observation = decode_samples(&samples, &thr_samples, cells, bits, min_border_score)?;
    let matched = matcher.match_code(observation.code)?;

    Some(MarkerDecode {
        matched,
        code: observation.code,
        border_score: observation.border_score,
        inverted: observation.inverted,
    })
}

#[derive(Clone, Copy, Debug)]
struct MarkerObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

fn threshold_samples(image: &GrayImageView<'_>, h: &Homography, cells: usize) -> Vec<u8> {
    let grid = cells * THRESH_SUBDIV;
    let step = cells as f32 / grid as f32;
    let mut out = Vec::with_capacity(grid * grid);
    for ty in 0..grid {
        for tx in 0..grid {
            let p = Point2::new((tx as f32 + 0.5) * step, (ty as f32 + 0.5) * step);
            let q = h.apply(p);
            if let Some(v) = sample_mean_3x3(image, q.x, q.y) {
                out.push(v);
            }
        }
    }
    out
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    min_border_score: f32,
) -> Option<MarkerObservation> {
    if samples.len() != cells * cells {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    let mut best: Option<MarkerObservation> = None;

    for inverted in [false, true] {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code: u64 = 0;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] < thr) != inverted;
                let is_border = cx < BORDER_CELLS
                    || cy < BORDER_CELLS
                    || cx + BORDER_CELLS >= cells
                    || cy + BORDER_CELLS >= cells;
                if is_border {
                    border_total += 1;
                    border_ok += is_black as u32;
                } else if is_black {
                    let idx = (cy - BORDER_CELLS) * bits + (cx - BORDER_CELLS);
                    code |= 1u64 << idx;
                }
            }
        }

        let border_score = border_ok as f32 / border_total.max(1) as f32;
        if border_score < min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(MarkerObservation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    let ix = x.round() as i32;
    let iy = y.round() as i32;
    if ix - 1 < 0 || iy - 1 < 0 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.data[(iy + dy) as usize * img.width + (ix + dx) as usize] as u32;
        }
    }
    Some((sum / 9) as u8)
}
