//! Square fiducial markers for metric calibration of flat-lay photographs.
//!
//! This crate focuses on:
//! - an embedded 4×4 marker dictionary (compiled into the binary),
//! - matching observed marker codes against it under all four rotations,
//! - locating markers in a grayscale frame (feature `detect`),
//! - turning one detected marker into a px-per-mm scale and a
//!   rectifying homography,
//! - rendering printable markers that the detector reads back.

pub mod builtins;
mod calibrate;
mod decode;
mod dictionary;
mod matcher;
mod quad;
mod render;
mod threshold;

#[cfg(feature = "detect")]
mod detect;

pub use calibrate::{
    calibrate_from_corners, order_corners, Calibration, CalibrationResult,
};
pub use decode::{decode_marker_quad, MarkerDecode};
pub use dictionary::{Dictionary, FiducialDictionary, UnknownDictionary};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use render::{render_marker, RenderError};
pub use threshold::{adaptive_binarize, otsu_threshold_from_samples};

#[cfg(feature = "detect")]
pub use calibrate::calibrate_image;
#[cfg(feature = "detect")]
pub use detect::{DetectedMarker, MarkerDetectParams, MarkerDetector};
