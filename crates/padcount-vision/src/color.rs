//! Colour-based confidence re-weighting of fused detections.
//!
//! Pads are warm-toned (felt, leather) and reasonably lit; a single HSV sample
//! at the centre scales the confidence and weak results are dropped.

use image::RgbImage;
use log::debug;

use crate::fusion::FusedDetection;

/// Minimum confidence after re-weighting.
pub const MIN_ADJUSTED_CONFIDENCE: f32 = 0.45;
/// Reference warm hue on the 0–255 wheel.
const WARM_HUE: f32 = 20.0;
const WARMTH_FALLOFF: f32 = 80.0;

/// Hue on a 0–255 wheel, saturation and value in 0–255.
pub fn rgb_to_hsv255(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    if delta <= 0.0 {
        return [0.0, s, max];
    }
    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    [sector / 6.0 * 256.0 % 256.0, s, max]
}

/// Shortest distance between two hues on the 0–255 wheel.
pub fn hue_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % 256.0;
    d.min(256.0 - d)
}

/// Multiplicative factor in `[0.42, 1]` from warmth and brightness.
pub fn color_factor(rgb: [u8; 3]) -> f32 {
    let [h, _, v] = rgb_to_hsv255(rgb);
    let warmth = (1.0 - hue_distance(h, WARM_HUE) / WARMTH_FALLOFF).clamp(0.0, 1.0);
    let brightness = v / 255.0;
    (0.7 + 0.3 * warmth) * (0.6 + 0.4 * brightness)
}

/// Re-weights each detection by the colour at its centre and drops those
/// under [`MIN_ADJUSTED_CONFIDENCE`]. Order is preserved.
pub fn adjust_confidence(detections: Vec<FusedDetection>, color: &RgbImage) -> Vec<FusedDetection> {
    let before = detections.len();
    let (w, h) = color.dimensions();
    let kept: Vec<FusedDetection> = detections
        .into_iter()
        .filter_map(|mut d| {
            let x = d.x.clamp(0, w as i32 - 1) as u32;
            let y = d.y.clamp(0, h as i32 - 1) as u32;
            d.confidence *= color_factor(color.get_pixel(x, y).0);
            (d.confidence >= MIN_ADJUSTED_CONFIDENCE).then_some(d)
        })
        .collect();
    debug!("color: kept {} of {before}", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectionMethod;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    #[test]
    fn hue_wheel_landmarks() {
        assert_abs_diff_eq!(rgb_to_hsv255([255, 0, 0])[0], 0.0);
        assert_abs_diff_eq!(rgb_to_hsv255([0, 255, 0])[0], 256.0 / 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(rgb_to_hsv255([0, 0, 255])[0], 512.0 / 3.0, epsilon = 1e-3);
        assert_eq!(rgb_to_hsv255([90, 90, 90]), [0.0, 0.0, 90.0]);
    }

    #[test]
    fn hue_distance_wraps() {
        assert_eq!(hue_distance(250.0, 10.0), 16.0);
        assert_eq!(hue_distance(20.0, 148.0), 128.0);
    }

    #[test]
    fn factor_extremes() {
        // black: hue 0 is 20 away from warm, brightness 0
        assert_abs_diff_eq!(color_factor([0, 0, 0]), (0.7 + 0.3 * 0.75) * 0.6, epsilon = 1e-5);
        // pure blue is far from warm, fully bright
        assert_abs_diff_eq!(color_factor([0, 0, 255]), 0.7, epsilon = 1e-5);
    }

    #[test]
    fn dim_cold_detections_are_dropped() {
        let mut img = RgbImage::from_pixel(50, 20, Rgb([210, 120, 60]));
        img.put_pixel(40, 10, Rgb([0, 0, 40]));
        let det = |x, confidence| FusedDetection {
            x,
            y: 10,
            r: 5,
            confidence,
            method: DetectionMethod::Hough,
        };
        let out = adjust_confidence(vec![det(10, 0.85), det(40, 0.85), det(-3, 0.3)], &img);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].x, 10);
        assert!(out[0].confidence > 0.7 && out[0].confidence <= 0.85);
    }
}
