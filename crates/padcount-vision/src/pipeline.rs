//! End-to-end counting run.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use log::{debug, info, warn};
use padcount_fiducial::Calibration;

use crate::annotate::{annotate, encode_preview, PreviewFormat};
use crate::backend::Backend;
use crate::detectors::PadDetector;
use crate::fallback::estimate_count_by_area;
use crate::fusion::FusedDetection;
use crate::quality::{assess_quality, QualityPolicy};
use crate::radius::{resolve_radius_bounds, RadiusBounds};
use crate::result::{DetectionResult, MethodCounts};
use crate::{gray_view, DetectionParameters, PadCountError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Configured pad counter. Holds no per-run state, so one instance can
/// serve any number of threads.
pub struct PadCounter {
    params: DetectionParameters,
    backend: Backend,
    quality_policy: QualityPolicy,
    preview_format: PreviewFormat,
    detectors: Vec<Box<dyn PadDetector>>,
}

impl std::fmt::Debug for PadCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PadCounter")
            .field("params", &self.params)
            .field("backend", &self.backend)
            .field("quality_policy", &self.quality_policy)
            .field("preview_format", &self.preview_format)
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.method()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PadCounter {
    /// Validates `params`; uses the best available backend and all three
    /// detector strategies.
    pub fn new(params: DetectionParameters) -> Result<Self, PadCountError> {
        params.validate()?;
        Ok(Self {
            params,
            backend: Backend::probe(),
            quality_policy: QualityPolicy::default(),
            preview_format: PreviewFormat::default(),
            detectors: standard_detectors(),
        })
    }

    /// Request a backend. Asking for `Full` in a build without it logs a
    /// warning and keeps the fallback.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = match backend {
            Backend::Full if !Backend::full_available() => {
                warn!("full backend requested but not compiled in; using fallback");
                Backend::Fallback
            }
            b => b,
        };
        self
    }

    pub fn with_quality_policy(mut self, policy: QualityPolicy) -> Self {
        self.quality_policy = policy;
        self
    }

    pub fn with_preview_format(mut self, format: PreviewFormat) -> Self {
        self.preview_format = format;
        self
    }

    /// Replace the detector strategies run by the full backend.
    pub fn with_detectors(mut self, detectors: Vec<Box<dyn PadDetector>>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn params(&self) -> &DetectionParameters {
        &self.params
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Count pads in an encoded image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(bytes = bytes.len(), backend = self.backend.as_str()))
    )]
    pub fn count(&self, bytes: &[u8]) -> Result<DetectionResult, PadCountError> {
        let decoded = image::load_from_memory(bytes).map_err(PadCountError::Decode)?;
        let decoded = clamp_dimension(decoded, self.params.max_dimension_px);
        let rgb = decoded.to_rgb8();
        let gray = image::imageops::grayscale(&rgb);

        let quality = assess_quality(&gray_view(&gray));
        if !quality.quality_ok {
            match self.quality_policy {
                QualityPolicy::Blocking => {
                    return Err(PadCountError::QualityBelowThreshold {
                        focus_variance: quality.focus_variance,
                        midtone_ratio: quality.midtone_ratio,
                        width: quality.width,
                        height: quality.height,
                    });
                }
                QualityPolicy::Advisory => info!(
                    "quality below threshold (focus {:.1}, midtones {:.2}, {}x{}); continuing",
                    quality.focus_variance, quality.midtone_ratio, quality.width, quality.height
                ),
            }
        }

        let (calibration, working) = self.calibrate(&gray, rgb);
        let bounds = resolve_radius_bounds(&self.params, calibration.result.px_per_mm);
        debug!(
            "radius bounds [{}, {}] ({:?})",
            bounds.min_radius_px, bounds.max_radius_px, bounds.source
        );

        let (count, detections, method_counts) = match self.backend {
            Backend::Full => {
                let (detections, method_counts) = self.run_detectors(&working, &bounds);
                (detections.len(), detections, method_counts)
            }
            Backend::Fallback => {
                let gray = image::imageops::grayscale(&working);
                (estimate_count_by_area(&gray, &bounds), Vec::new(), MethodCounts::default())
            }
        };

        let preview = annotate(&working, &detections, count);
        let preview_image =
            encode_preview(&preview, self.preview_format).map_err(PadCountError::Encode)?;

        info!(
            "counted {count} pad(s) [{} backend, fiducial {}]",
            self.backend,
            if calibration.result.found { "found" } else { "absent" }
        );

        Ok(DetectionResult {
            count,
            preview_image,
            preview_format: self.preview_format,
            quality,
            calibration: calibration.result,
            detections,
            method_counts,
            backend: self.backend,
            radius_bounds: bounds,
        })
    }

    /// Marker search and whole-frame rectification. Returns the input
    /// unchanged when no marker is usable.
    #[cfg(feature = "full")]
    fn calibrate(&self, gray: &GrayImage, rgb: RgbImage) -> (Calibration, RgbImage) {
        use padcount_core::warp_perspective_rgb_into;
        use padcount_fiducial::{calibrate_image, MarkerDetectParams};

        let dictionary = self.params.fiducial_dictionary;
        let marker_size_mm = self.params.marker_size_mm;
        if !self.params.use_fiducial {
            return (Calibration::not_found(dictionary, marker_size_mm), rgb);
        }

        let calibration = calibrate_image(
            &gray_view(gray),
            dictionary,
            marker_size_mm,
            &MarkerDetectParams::default(),
        );
        let Some(image_from_rect) = calibration.image_from_rect else {
            return (calibration, rgb);
        };

        let (w, h) = rgb.dimensions();
        let mut rectified = RgbImage::new(w, h);
        warp_perspective_rgb_into(
            &crate::rgb_view(&rgb),
            image_from_rect,
            w as usize,
            &mut rectified,
        );
        (calibration, rectified)
    }

    #[cfg(not(feature = "full"))]
    fn calibrate(&self, _gray: &GrayImage, rgb: RgbImage) -> (Calibration, RgbImage) {
        if self.params.use_fiducial {
            debug!("fiducial detection not compiled in; continuing unscaled");
        }
        (
            Calibration::not_found(self.params.fiducial_dictionary, self.params.marker_size_mm),
            rgb,
        )
    }

    /// Preprocess, run every strategy, fuse and re-weight.
    fn run_detectors(
        &self,
        working: &RgbImage,
        bounds: &RadiusBounds,
    ) -> (Vec<FusedDetection>, MethodCounts) {
        let prepared = crate::preprocess::preprocess(working, self.params.blur_kernel);

        let mut candidates = Vec::new();
        let mut method_counts = MethodCounts::default();
        for detector in &self.detectors {
            match detector.detect(&prepared, bounds, &self.params) {
                Ok(found) => {
                    debug!("{}: {} candidate(s)", detector.method().as_str(), found.len());
                    method_counts.record(detector.method(), found.len());
                    candidates.extend(found);
                }
                Err(err) => warn!("{err}; counted as zero candidates"),
            }
        }

        let fused = crate::fusion::fuse_candidates(&candidates);
        debug!("fusion: {} of {} candidate(s) kept", fused.len(), candidates.len());
        let detections = crate::color::adjust_confidence(fused, working);
        (detections, method_counts)
    }
}

#[cfg(feature = "full")]
fn standard_detectors() -> Vec<Box<dyn PadDetector>> {
    crate::detectors::default_detectors()
}

#[cfg(not(feature = "full"))]
fn standard_detectors() -> Vec<Box<dyn PadDetector>> {
    Vec::new()
}

/// Downscale so the longer side does not exceed `max_dimension`.
fn clamp_dimension(img: DynamicImage, max_dimension: Option<u32>) -> DynamicImage {
    match max_dimension {
        Some(max) if img.width().max(img.height()) > max => {
            debug!(
                "downscaling {}x{} to fit {max}px",
                img.width(),
                img.height()
            );
            img.resize(max, max, FilterType::Triangle)
        }
        _ => img,
    }
}

/// One-shot convenience around [`PadCounter`].
pub fn count_pads(bytes: &[u8], params: &DetectionParameters) -> Result<DetectionResult, PadCountError> {
    PadCounter::new(params.clone())?.count(bytes)
}
