//! Detection parameters and their JSON helpers.

use std::{fs, path::Path};

use padcount_fiducial::FiducialDictionary;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("radius bounds must be positive (min={min}, max={max})")]
    NonPositiveRadius { min: u32, max: u32 },
    #[error("min_radius_px ({min}) exceeds max_radius_px ({max})")]
    InvertedRadius { min: u32, max: u32 },
    #[error("{name} must be finite and > 0 (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("blur_kernel must be odd and >= 3 (got {0})")]
    BlurKernel(u32),
    #[error("max_dimension_px must be >= 16 (got {0})")]
    MaxDimension(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ParamsError),
}

/// Caller-supplied knobs for one counting run.
///
/// Every field has a default, so a JSON file only needs the overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParameters {
    /// Manual lower radius bound (px); replaced when a scale is available.
    pub min_radius_px: u32,
    /// Manual upper radius bound (px).
    pub max_radius_px: u32,
    /// Inverse accumulator resolution of the Hough detector.
    pub hough_dp: f32,
    /// Canny high threshold; the low threshold is half of it.
    pub edge_threshold_1: f32,
    /// Minimum Hough accumulator votes for a centre.
    pub edge_threshold_2: u32,
    /// Bilateral filter window (odd).
    pub blur_kernel: u32,
    pub use_fiducial: bool,
    pub fiducial_dictionary: FiducialDictionary,
    /// Printed marker side, outer border included.
    pub marker_size_mm: f32,
    pub pad_diameter_mm: f32,
    pub auto_radius_from_mm: bool,
    /// Downscale inputs whose longer side exceeds this.
    pub max_dimension_px: Option<u32>,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            min_radius_px: 10,
            max_radius_px: 60,
            hough_dp: 1.2,
            edge_threshold_1: 100.0,
            edge_threshold_2: 30,
            blur_kernel: 7,
            use_fiducial: true,
            fiducial_dictionary: FiducialDictionary::Dict4x4_50,
            marker_size_mm: 50.0,
            pad_diameter_mm: 10.0,
            auto_radius_from_mm: true,
            max_dimension_px: None,
        }
    }
}

impl DetectionParameters {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let (min, max) = (self.min_radius_px, self.max_radius_px);
        if min == 0 || max == 0 {
            return Err(ParamsError::NonPositiveRadius { min, max });
        }
        if min > max {
            return Err(ParamsError::InvertedRadius { min, max });
        }
        for (name, value) in [
            ("hough_dp", self.hough_dp),
            ("edge_threshold_1", self.edge_threshold_1),
            ("marker_size_mm", self.marker_size_mm),
            ("pad_diameter_mm", self.pad_diameter_mm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParamsError::NonPositive {
                    name,
                    value: value as f64,
                });
            }
        }
        if self.edge_threshold_2 == 0 {
            return Err(ParamsError::NonPositive {
                name: "edge_threshold_2",
                value: 0.0,
            });
        }
        if self.blur_kernel < 3 || self.blur_kernel % 2 == 0 {
            return Err(ParamsError::BlurKernel(self.blur_kernel));
        }
        if let Some(d) = self.max_dimension_px {
            if d < 16 {
                return Err(ParamsError::MaxDimension(d));
            }
        }
        Ok(())
    }

    /// Load and validate a JSON parameter file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Write these parameters to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(DetectionParameters::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: DetectionParameters =
            serde_json::from_str(r#"{"min_radius_px": 20, "use_fiducial": false}"#).unwrap();
        assert_eq!(p.min_radius_px, 20);
        assert!(!p.use_fiducial);
        assert_eq!(p.max_radius_px, 60);
        assert_eq!(p.fiducial_dictionary, FiducialDictionary::Dict4x4_50);
    }

    #[test]
    fn unknown_dictionary_is_rejected() {
        let r = serde_json::from_str::<DetectionParameters>(r#"{"fiducial_dictionary": "5x5-100"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn invalid_values_are_reported() {
        let inverted = DetectionParameters {
            min_radius_px: 40,
            max_radius_px: 20,
            ..Default::default()
        };
        assert_eq!(
            inverted.validate(),
            Err(ParamsError::InvertedRadius { min: 40, max: 20 })
        );

        let even = DetectionParameters {
            blur_kernel: 6,
            ..Default::default()
        };
        assert_eq!(even.validate(), Err(ParamsError::BlurKernel(6)));

        let nan = DetectionParameters {
            hough_dp: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(ParamsError::NonPositive { name: "hough_dp", .. })
        ));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = DetectionParameters {
            pad_diameter_mm: 12.5,
            max_dimension_px: Some(2048),
            ..Default::default()
        };
        params.write_json(&path).unwrap();
        assert_eq!(DetectionParameters::load_json(&path).unwrap(), params);
    }
}
