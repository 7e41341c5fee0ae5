use crate::params::ParamsError;

/// Fatal pipeline failures. Missing fiducials, zero detections and failing
/// strategies are not errors.
#[derive(thiserror::Error, Debug)]
pub enum PadCountError {
    #[error("failed to decode input image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode preview: {0}")]
    Encode(#[source] image::ImageError),
    #[error("invalid detection parameters: {0}")]
    InvalidParams(#[from] ParamsError),
    #[error(
        "image quality below threshold (focus variance {focus_variance:.1}, midtone ratio {midtone_ratio:.2}, {width}x{height})"
    )]
    QualityBelowThreshold {
        focus_variance: f64,
        midtone_ratio: f64,
        width: u32,
        height: u32,
    },
}
