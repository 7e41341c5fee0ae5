//! Pixel radius search bounds from physical pad size and image scale.

use serde::{Deserialize, Serialize};

use crate::DetectionParameters;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusSource {
    /// Taken verbatim from the parameters.
    Manual,
    /// Derived from `pad_diameter_mm` and the fiducial scale.
    Calibrated,
}

/// Radius range actually searched by the detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusBounds {
    pub min_radius_px: u32,
    pub max_radius_px: u32,
    pub source: RadiusSource,
}

impl RadiusBounds {
    pub fn manual(params: &DetectionParameters) -> Self {
        Self {
            min_radius_px: params.min_radius_px,
            max_radius_px: params.max_radius_px,
            source: RadiusSource::Manual,
        }
    }

    /// `(min + max) / 2`, used for template radius, peak spacing and area estimates.
    pub fn mid(&self) -> f32 {
        0.5 * (self.min_radius_px + self.max_radius_px) as f32
    }

    pub fn contains(&self, r: f32) -> bool {
        r >= self.min_radius_px as f32 && r <= self.max_radius_px as f32
    }
}

/// Expected radius ±25 %, with at least 2 px of span.
///
/// Manual bounds are returned unchanged when auto radius is off or no scale
/// is known.
pub fn resolve_radius_bounds(params: &DetectionParameters, px_per_mm: Option<f32>) -> RadiusBounds {
    let scale = match px_per_mm {
        Some(s) if params.auto_radius_from_mm && s.is_finite() && s > 0.0 => s,
        _ => return RadiusBounds::manual(params),
    };

    let r = params.pad_diameter_mm / 2.0 * scale;
    let min = ((0.75 * r).floor() as u32).max(2);
    let max = ((1.25 * r).floor() as u32).max(min + 2);
    RadiusBounds {
        min_radius_px: min,
        max_radius_px: max,
        source: RadiusSource::Calibrated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_px_per_mm_and_10mm_pads() {
        let params = DetectionParameters::default();
        let b = resolve_radius_bounds(&params, Some(10.0));
        assert_eq!((b.min_radius_px, b.max_radius_px), (37, 62));
        assert_eq!(b.source, RadiusSource::Calibrated);
    }

    #[test]
    fn tiny_scale_keeps_minimum_span() {
        let params = DetectionParameters::default();
        let b = resolve_radius_bounds(&params, Some(0.3));
        assert_eq!((b.min_radius_px, b.max_radius_px), (2, 4));
    }

    #[test]
    fn manual_bounds_without_scale_or_when_disabled() {
        let params = DetectionParameters {
            min_radius_px: 12,
            max_radius_px: 40,
            ..Default::default()
        };
        let b = resolve_radius_bounds(&params, None);
        assert_eq!((b.min_radius_px, b.max_radius_px), (12, 40));
        assert_eq!(b.source, RadiusSource::Manual);

        let off = DetectionParameters {
            auto_radius_from_mm: false,
            ..params
        };
        assert_eq!(resolve_radius_bounds(&off, Some(10.0)).source, RadiusSource::Manual);
    }
}
