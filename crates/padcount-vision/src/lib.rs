//! Model-free counting of circular pads in flat-lay photographs.
//!
//! A run decodes the frame, scores its quality, optionally calibrates scale
//! and perspective from a printed fiducial, runs three independent circle
//! detectors over a normalised grayscale copy, fuses their candidates with
//! non-maximum suppression, re-weights by colour and renders an annotated
//! preview.
//!
//! ```no_run
//! use padcount_vision::{DetectionParameters, PadCounter};
//!
//! let bytes = std::fs::read("pads.jpg")?;
//! let counter = PadCounter::new(DetectionParameters::default())?;
//! let result = counter.count(&bytes)?;
//! println!("{} pads", result.count);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod annotate;
pub mod backend;
pub mod color;
pub mod detectors;
mod error;
pub mod fallback;
pub mod fusion;
mod overlay;
mod params;
mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod radius;
mod result;

pub use annotate::PreviewFormat;
pub use backend::Backend;
pub use detectors::{DetectionCandidate, DetectionMethod, PadDetector, StrategyError};
pub use error::PadCountError;
pub use fusion::{non_max_suppression, FusedDetection, ScoredBox};
pub use params::{ConfigError, DetectionParameters, ParamsError};
pub use pipeline::{count_pads, PadCounter};
pub use quality::{QualityMetrics, QualityPolicy};
pub use radius::{resolve_radius_bounds, RadiusBounds, RadiusSource};
pub use result::{DetectionResult, MethodCounts};

use padcount_core::{GrayImageView, RgbImageView};

/// Borrow an `image` grayscale buffer as a core view.
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Borrow an `image` RGB buffer as a core view.
pub fn rgb_view(img: &image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}
