use padcount_fiducial::CalibrationResult;
use serde::{Deserialize, Serialize};

use crate::annotate::PreviewFormat;
use crate::backend::Backend;
use crate::detectors::DetectionMethod;
use crate::fusion::FusedDetection;
use crate::quality::QualityMetrics;
use crate::radius::RadiusBounds;

/// Candidate counts per strategy, before fusion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCounts {
    pub hough: usize,
    pub contour: usize,
    pub template: usize,
}

impl MethodCounts {
    pub fn record(&mut self, method: DetectionMethod, n: usize) {
        match method {
            DetectionMethod::Hough => self.hough += n,
            DetectionMethod::Contour => self.contour += n,
            DetectionMethod::Template => self.template += n,
        }
    }

    pub fn total(&self) -> usize {
        self.hough + self.contour + self.template
    }
}

/// Everything one counting run produces.
///
/// The encoded preview is kept out of the JSON report; write it separately.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Equals `detections.len()` on the full backend; an area estimate on
    /// the fallback backend.
    pub count: usize,
    #[serde(skip)]
    pub preview_image: Vec<u8>,
    pub preview_format: PreviewFormat,
    pub quality: QualityMetrics,
    pub calibration: CalibrationResult,
    pub detections: Vec<FusedDetection>,
    pub method_counts: MethodCounts,
    pub backend: Backend,
    pub radius_bounds: RadiusBounds,
}

impl DetectionResult {
    /// JSON report without the preview bytes.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
