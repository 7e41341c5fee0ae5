//! Facade crate for the `padcount-*` workspace.
//!
//! Counts disassembled instrument pads in a photograph: an optional printed
//! fiducial fixes scale and perspective, three independent circle detectors
//! propose pads, and their candidates are fused into one annotated result.
//!
//! ## Quickstart
//!
//! ```no_run
//! use padcount::{DetectionParameters, PadCounter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("pads.jpg")?;
//! let counter = PadCounter::new(DetectionParameters {
//!     pad_diameter_mm: 12.0,
//!     ..Default::default()
//! })?;
//! let result = counter.count(&bytes)?;
//! println!("{} pads, fiducial found: {}", result.count, result.calibration.found);
//! std::fs::write("preview.jpg", &result.preview_image)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `padcount::core`: image views, integral images, homographies, logging.
//! - `padcount::fiducial`: marker dictionary, detection, rendering, calibration.
//! - `padcount::vision`: quality gate, preprocessing, detectors, fusion, pipeline.

pub use padcount_core as core;
pub use padcount_fiducial as fiducial;
pub use padcount_vision as vision;

pub use padcount_fiducial::{CalibrationResult, FiducialDictionary};
pub use padcount_vision::{
    count_pads, Backend, DetectionParameters, DetectionResult, FusedDetection, PadCountError,
    PadCounter, PreviewFormat, QualityPolicy,
};
