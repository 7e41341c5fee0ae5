//! Independent circle-detection strategies.
//!
//! Every strategy reads the same preprocessed frame and reports candidates
//! without knowledge of the others; fusion reconciles them afterwards.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::{DetectionParameters, RadiusBounds};

#[cfg(feature = "full")]
mod contour;
#[cfg(feature = "full")]
mod hough;
#[cfg(feature = "full")]
mod template;

#[cfg(feature = "full")]
pub use contour::ContourDetector;
#[cfg(feature = "full")]
pub use hough::HoughDetector;
#[cfg(feature = "full")]
pub use template::TemplateDetector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Hough,
    Contour,
    Template,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::Hough => "hough",
            DetectionMethod::Contour => "contour",
            DetectionMethod::Template => "template",
        }
    }
}

/// One proposed pad: centre, radius and confidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub x: i32,
    pub y: i32,
    pub r: i32,
    pub confidence: f32,
    pub method: DetectionMethod,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("{method} detector: image {width}x{height} smaller than its {required}px window")]
    ImageTooSmall {
        method: &'static str,
        width: u32,
        height: u32,
        required: u32,
    },
    #[error("{method} detector: {reason}")]
    Degenerate {
        method: &'static str,
        reason: String,
    },
}

/// A detection strategy over the preprocessed grayscale frame.
pub trait PadDetector: Send + Sync {
    fn method(&self) -> DetectionMethod;

    fn detect(
        &self,
        image: &GrayImage,
        bounds: &RadiusBounds,
        params: &DetectionParameters,
    ) -> Result<Vec<DetectionCandidate>, StrategyError>;
}

/// Hough, contour and template strategies, in that order.
#[cfg(feature = "full")]
pub fn default_detectors() -> Vec<Box<dyn PadDetector>> {
    vec![
        Box::new(HoughDetector),
        Box::new(ContourDetector),
        Box::new(TemplateDetector),
    ]
}

/// Strict local maximum test over a `(2 * radius + 1)²` window.
///
/// Plateaus resolve to their first cell in raster order: earlier neighbours
/// must be strictly lower, later ones lower or equal.
#[cfg(feature = "full")]
pub(crate) fn is_local_max(
    values: &[f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    radius: usize,
) -> bool {
    let v = values[y * width + x];
    let y0 = y.saturating_sub(radius);
    let y1 = (y + radius).min(height - 1);
    let x0 = x.saturating_sub(radius);
    let x1 = (x + radius).min(width - 1);
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            if xx == x && yy == y {
                continue;
            }
            let n = values[yy * width + xx];
            let earlier = (yy, xx) < (y, x);
            if n > v || (earlier && n == v) {
                return false;
            }
        }
    }
    true
}

#[cfg(all(test, feature = "full"))]
mod tests {
    use super::*;

    #[test]
    fn plateau_resolves_to_first_cell() {
        let w = 5;
        let mut v = vec![0.0f32; 25];
        v[2 * w + 2] = 3.0;
        v[2 * w + 3] = 3.0;
        assert!(is_local_max(&v, w, 5, 2, 2, 1));
        assert!(!is_local_max(&v, w, 5, 3, 2, 1));
        assert!(!is_local_max(&v, w, 5, 1, 1, 1));
    }
}
