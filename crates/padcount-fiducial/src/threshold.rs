//! Thresholding utilities for marker localisation and decoding.

use padcount_core::{GrayImage, GrayImageView, IntegralImage};

/// Compute Otsu threshold from a set of sample intensities.
///
/// Samples `< threshold` belong to the dark class.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }

    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0);
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255);
    if min_v == max_v {
        return min_v as u8;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v + max_v + 1) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        sum_b += t as f64 * h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            // Class boundary sits just above the last dark bin.
            best_t = (t + 1).min(255) as u8;
        }
    }

    best_t
}

/// Local-mean binarisation with dark objects as foreground.
///
/// A pixel becomes 255 when it is darker than the mean of the
/// `(2 * radius + 1)²` window around it by more than `offset`, 0 otherwise.
pub fn adaptive_binarize(src: &GrayImageView<'_>, radius: usize, offset: f32) -> GrayImage {
    let integral = IntegralImage::new(src);
    let mut out = GrayImage::new(src.width, src.height, 0);

    for y in 0..src.height {
        for x in 0..src.width {
            let i = y * src.width + x;
            let mean = integral.window_mean(x, y, radius);
            if (src.data[i] as f32) + offset < mean {
                out.data[i] = 255;
            }
        }
    }

    out
}
