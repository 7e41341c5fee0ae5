//! Coarse count from foreground area when the detector toolkit is unavailable.

use image::GrayImage;
use log::debug;
use padcount_fiducial::otsu_threshold_from_samples;

use crate::RadiusBounds;

/// Global Otsu split; the minority class is taken as pads and its area is
/// divided by the area of one mid-radius disk.
pub fn estimate_count_by_area(gray: &GrayImage, bounds: &RadiusBounds) -> usize {
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0;
    }
    let threshold = otsu_threshold_from_samples(raw);
    let dark = raw.iter().filter(|&&v| v < threshold).count();
    let foreground = dark.min(raw.len() - dark);

    let r = bounds.mid();
    let pad_area = std::f32::consts::PI * r * r;
    let count = (foreground as f32 / pad_area).round() as usize;
    debug!("fallback: threshold {threshold}, {foreground} foreground px, ~{count} pad(s)");
    count
}
