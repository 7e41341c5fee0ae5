//! Metric calibration from a single fiducial marker.
//!
//! The marker's corners define a homography onto an axis-aligned square of
//! the same side, anchored at the marker's top-left corner. The whole frame is
//! rectified with it, which assumes everything of interest lies in the
//! marker's plane.

use log::debug;
use nalgebra::Point2;
use padcount_core::{homography_from_4pt, Homography};
use serde::{Deserialize, Serialize};

use crate::FiducialDictionary;

#[cfg(feature = "detect")]
use crate::{MarkerDetectParams, MarkerDetector};
#[cfg(feature = "detect")]
use padcount_core::GrayImageView;

/// Outcome of the calibration attempt, as reported to callers.
///
/// `px_per_mm` is `Some` exactly when `found` is true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub found: bool,
    /// Marker corners in the original frame, ordered TL, TR, BR, BL.
    pub corners: Option<[Point2<f32>; 4]>,
    pub px_per_mm: Option<f32>,
    pub dictionary: FiducialDictionary,
    pub marker_size_mm: f32,
    #[serde(default)]
    pub marker_id: Option<u32>,
}

impl CalibrationResult {
    pub fn not_found(dictionary: FiducialDictionary, marker_size_mm: f32) -> Self {
        Self {
            found: false,
            corners: None,
            px_per_mm: None,
            dictionary,
            marker_size_mm,
            marker_id: None,
        }
    }
}

/// Calibration result plus the rectifying transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub result: CalibrationResult,
    /// Maps rectified pixel coordinates back into the original frame.
    /// `None` when no marker was found.
    pub image_from_rect: Option<Homography>,
}

impl Calibration {
    pub fn not_found(dictionary: FiducialDictionary, marker_size_mm: f32) -> Self {
        Self {
            result: CalibrationResult::not_found(dictionary, marker_size_mm),
            image_from_rect: None,
        }
    }
}

/// Order four corners as TL, TR, BR, BL.
///
/// TL minimises `x + y`, BR maximises it; TR minimises `y - x`, BL maximises it.
pub fn order_corners(pts: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let pick = |key: fn(&Point2<f32>) -> f32, max: bool| -> Point2<f32> {
        let mut best = pts[0];
        for p in &pts[1..] {
            let better = if max {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    };
    let sum = |p: &Point2<f32>| p.x + p.y;
    let diff = |p: &Point2<f32>| p.y - p.x;
    [
        pick(sum, false),
        pick(diff, false),
        pick(sum, true),
        pick(diff, true),
    ]
}

/// Build a calibration from one marker's corners (any order).
///
/// The rectified side `S = |TL - TR|` gives `px_per_mm = S / marker_size_mm`.
/// Returns `None` for a degenerate quad.
pub fn calibrate_from_corners(
    corners: [Point2<f32>; 4],
    dictionary: FiducialDictionary,
    marker_size_mm: f32,
    marker_id: Option<u32>,
) -> Option<Calibration> {
    let ordered = order_corners(corners);
    let [tl, tr, _, _] = ordered;
    let side = (tr - tl).norm();
    if !side.is_finite() || side < 1.0 || marker_size_mm <= 0.0 {
        return None;
    }

    let square = [
        tl,
        Point2::new(tl.x + side, tl.y),
        Point2::new(tl.x + side, tl.y + side),
        Point2::new(tl.x, tl.y + side),
    ];
    let image_from_rect = homography_from_4pt(&square, &ordered)?;
    let px_per_mm = side / marker_size_mm;

    debug!("fiducial: side {side:.2}px -> {px_per_mm:.4} px/mm");

    Some(Calibration {
        result: CalibrationResult {
            found: true,
            corners: Some(ordered),
            px_per_mm: Some(px_per_mm),
            dictionary,
            marker_size_mm,
            marker_id,
        },
        image_from_rect: Some(image_from_rect),
    })
}

/// Detect markers and calibrate from the one with the largest enclosed area.
#[cfg(feature = "detect")]
pub fn calibrate_image(
    image: &GrayImageView<'_>,
    dictionary: FiducialDictionary,
    marker_size_mm: f32,
    params: &MarkerDetectParams,
) -> Calibration {
    let detector = MarkerDetector::new(dictionary.dictionary(), params.clone());
    let markers = detector.detect(image);

    let Some(best) = markers.first() else {
        log::info!("fiducial: no {dictionary} marker found; continuing unscaled");
        return Calibration::not_found(dictionary, marker_size_mm);
    };

    match calibrate_from_corners(best.corners, dictionary, marker_size_mm, Some(best.id)) {
        Some(cal) => {
            log::info!(
                "fiducial: marker {} selected out of {}, {:.4} px/mm",
                best.id,
                markers.len(),
                cal.result.px_per_mm.unwrap_or_default()
            );
            cal
        }
        None => Calibration::not_found(dictionary, marker_size_mm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn corners_are_ordered_tl_tr_br_bl() {
        let tl = Point2::new(100.0, 110.0);
        let tr = Point2::new(400.0, 90.0);
        let br = Point2::new(420.0, 380.0);
        let bl = Point2::new(90.0, 400.0);
        assert_eq!(order_corners([br, bl, tr, tl]), [tl, tr, br, bl]);
    }

    #[test]
    fn side_of_500px_on_50mm_marker_gives_10_px_per_mm() {
        let corners = [
            Point2::new(200.0, 300.0),
            Point2::new(700.0, 300.0),
            Point2::new(700.0, 800.0),
            Point2::new(200.0, 800.0),
        ];
        let cal = calibrate_from_corners(corners, FiducialDictionary::Dict4x4_50, 50.0, Some(0))
            .expect("calibration");
        assert!(cal.result.found);
        assert_abs_diff_eq!(cal.result.px_per_mm.unwrap(), 10.0, epsilon = 1e-3);

        // Axis-aligned marker: rectification is the identity.
        let h = cal.image_from_rect.unwrap();
        let p = h.apply(Point2::new(321.0, 654.0));
        assert_abs_diff_eq!(p.x, 321.0, epsilon = 1e-2);
        assert_abs_diff_eq!(p.y, 654.0, epsilon = 1e-2);
    }

    #[test]
    fn keystoned_marker_is_mapped_onto_square() {
        let tl = Point2::new(100.0, 100.0);
        let tr = Point2::new(300.0, 110.0);
        let br = Point2::new(290.0, 290.0);
        let bl = Point2::new(95.0, 300.0);
        let cal = calibrate_from_corners([tl, tr, br, bl], FiducialDictionary::Dict4x4_50, 40.0, None)
            .expect("calibration");
        let side = (tr - tl).norm();
        assert_abs_diff_eq!(cal.result.px_per_mm.unwrap(), side / 40.0, epsilon = 1e-5);

        let h = cal.image_from_rect.unwrap();
        let q = h.apply(Point2::new(tl.x + side, tl.y + side));
        assert_abs_diff_eq!(q.x, br.x, epsilon = 1e-2);
        assert_abs_diff_eq!(q.y, br.y, epsilon = 1e-2);
    }

    #[test]
    fn not_found_has_no_scale() {
        let r = CalibrationResult::not_found(FiducialDictionary::Dict4x4_50, 50.0);
        assert!(!r.found);
        assert!(r.px_per_mm.is_none());
        assert!(r.corners.is_none());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["dictionary"], "4x4-50");
        assert!(json["px_per_mm"].is_null());
    }
}
