//! Illumination normalisation and edge-preserving denoising.
//!
//! Stages, in order: clip-limited adaptive histogram equalisation on the
//! luminance, division by a heavily blurred copy to flatten uneven lighting,
//! then a bilateral filter.

use image::{GrayImage, RgbImage};
use padcount_core::IntegralImage;

use crate::gray_view;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Adaptive histogram equalisation settings.
#[derive(Clone, Copy, Debug)]
pub struct ClaheParams {
    /// Tiles per axis.
    pub tiles: u32,
    /// Histogram bins are clipped at `clip_limit` times the mean bin height.
    pub clip_limit: f32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            tiles: 8,
            clip_limit: 2.0,
        }
    }
}

const BILATERAL_SIGMA_COLOR: f32 = 50.0;

/// Full preprocessing chain; the output feeds every detector.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(rgb), fields(width = rgb.width(), height = rgb.height()))
)]
pub fn preprocess(rgb: &RgbImage, blur_kernel: u32) -> GrayImage {
    let luma = image::imageops::grayscale(rgb);
    let equalized = clahe(&luma, ClaheParams::default());
    let flat = flatten_illumination(&equalized);
    bilateral_filter(&flat, blur_kernel, BILATERAL_SIGMA_COLOR)
}

pub fn clahe(src: &GrayImage, params: ClaheParams) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let tiles_x = params.tiles.clamp(1, (w / 8).max(1));
    let tiles_y = params.tiles.clamp(1, (h / 8).max(1));
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[src.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1.saturating_sub(x0) * y1.saturating_sub(y0)).max(1);
            luts[(ty * tiles_x + tx) as usize] = clipped_equalization(&hist, area, params.clip_limit);
        }
    }

    // Tile-centre coordinate of a pixel, split into the two neighbouring tiles and a weight.
    let axis = |p: u32, tile: u32, count: u32| -> (usize, usize, f32) {
        let f = ((p as f32 + 0.5) / tile as f32 - 0.5).clamp(0.0, (count - 1) as f32);
        let i0 = f.floor() as u32;
        let i1 = (i0 + 1).min(count - 1);
        (i0 as usize, i1 as usize, f - i0 as f32)
    };

    let mut out = GrayImage::new(w, h);
    let tx_n = tiles_x as usize;
    for y in 0..h {
        let (ty0, ty1, ay) = axis(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, ax) = axis(x, tile_w, tiles_x);
            let v = src.get_pixel(x, y).0[0] as usize;
            let top = luts[ty0 * tx_n + tx0][v] as f32 * (1.0 - ax) + luts[ty0 * tx_n + tx1][v] as f32 * ax;
            let bottom =
                luts[ty1 * tx_n + tx0][v] as f32 * (1.0 - ax) + luts[ty1 * tx_n + tx1][v] as f32 * ax;
            let value = top * (1.0 - ay) + bottom * ay;
            out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn clipped_equalization(hist: &[u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut clipped = *hist;
    let mut excess = 0u32;
    for bin in clipped.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in clipped.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (v, &count) in clipped.iter().enumerate() {
        cdf += count as u64;
        lut[v] = ((cdf * 255 + area as u64 / 2) / area as u64).min(255) as u8;
    }
    lut
}

/// Divide by a box-blurred copy (window ~1/8 of the longer side) and scale
/// so local background maps to white.
///
/// Pixels brighter than their neighbourhood saturate at 255. The scale is
/// fixed, so a large dark region such as a fiducial cannot compress the
/// contrast of the rest of the frame.
pub fn flatten_illumination(src: &GrayImage) -> GrayImage {
    let (w, h) = src.dimensions();
    let integral = IntegralImage::new(&gray_view(src));
    let radius = (w.max(h) / 16).max(8) as usize;

    let mut out = GrayImage::new(w, h);
    for (x, y, p) in out.enumerate_pixels_mut() {
        let background = integral.window_mean(x as usize, y as usize, radius).max(1.0);
        let v = src.get_pixel(x, y).0[0] as f32;
        p.0[0] = (255.0 * v / background).round().min(255.0) as u8;
    }
    out
}

/// Bilateral filter over a `window × window` neighbourhood with clamped borders.
pub fn bilateral_filter(src: &GrayImage, window: u32, sigma_color: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    let radius = (window / 2).max(1) as i64;
    let sigma_space = radius as f32;

    let mut spatial = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = (dx * dx + dy * dy) as f32;
            spatial.push((dx, dy, (-d2 / (2.0 * sigma_space * sigma_space)).exp()));
        }
    }
    let range: Vec<f32> = (0..256)
        .map(|d| {
            let d = d as f32;
            (-d * d / (2.0 * sigma_color * sigma_color)).exp()
        })
        .collect();

    let raw = src.as_raw();
    let stride = w as usize;
    let mut out = vec![0u8; raw.len()];
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let center = raw[y as usize * stride + x as usize];
            let mut acc = 0.0f32;
            let mut norm = 0.0f32;
            for &(dx, dy, ws) in &spatial {
                let sx = (x + dx).clamp(0, w as i64 - 1) as usize;
                let sy = (y + dy).clamp(0, h as i64 - 1) as usize;
                let v = raw[sy * stride + sx];
                let wgt = ws * range[center.abs_diff(v) as usize];
                acc += wgt * v as f32;
                norm += wgt;
            }
            out[y as usize * stride + x as usize] = (acc / norm).round().clamp(0.0, 255.0) as u8;
        }
    }
    GrayImage::from_raw(w, h, out).unwrap_or_else(|| src.clone())
}
