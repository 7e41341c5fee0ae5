//! Preview rendering and encoding.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::fusion::FusedDetection;
use crate::overlay::{draw_count, text_scale};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[cfg(feature = "full")]
const CIRCLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTRE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewFormat {
    #[default]
    Jpeg,
    Png,
}

impl PreviewFormat {
    pub fn image_format(self) -> ImageFormat {
        match self {
            PreviewFormat::Jpeg => ImageFormat::Jpeg,
            PreviewFormat::Png => ImageFormat::Png,
        }
    }
}

/// Copy of `base` with each detection outlined, its centre marked and the
/// count overlaid.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(base, detections), fields(n = detections.len()))
)]
pub fn annotate(base: &RgbImage, detections: &[FusedDetection], count: usize) -> RgbImage {
    let mut out = base.clone();
    draw_detections(&mut out, detections);
    let scale = text_scale(out.width(), out.height());
    draw_count(&mut out, count, scale, TEXT_COLOR);
    out
}

#[cfg(feature = "full")]
fn draw_detections(img: &mut RgbImage, detections: &[FusedDetection]) {
    use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};

    for d in detections {
        draw_hollow_circle_mut(img, (d.x, d.y), d.r, CIRCLE_COLOR);
        draw_hollow_circle_mut(img, (d.x, d.y), d.r + 1, CIRCLE_COLOR);
        draw_cross_mut(img, CENTRE_COLOR, d.x, d.y);
    }
}

/// Centres only; fallback runs report no individual detections anyway.
#[cfg(not(feature = "full"))]
fn draw_detections(img: &mut RgbImage, detections: &[FusedDetection]) {
    for d in detections {
        if d.x >= 0 && d.y >= 0 && (d.x as u32) < img.width() && (d.y as u32) < img.height() {
            img.put_pixel(d.x as u32, d.y as u32, CENTRE_COLOR);
        }
    }
}

pub fn encode_preview(img: &RgbImage, format: PreviewFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone()).write_to(&mut buf, format.image_format())?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectionMethod;

    #[test]
    fn previews_decode_back_to_same_size() {
        let base = RgbImage::from_pixel(120, 80, Rgb([90, 90, 90]));
        let det = FusedDetection {
            x: 60,
            y: 40,
            r: 15,
            confidence: 0.9,
            method: DetectionMethod::Contour,
        };
        let img = annotate(&base, &[det], 1);
        for format in [PreviewFormat::Jpeg, PreviewFormat::Png] {
            let bytes = encode_preview(&img, format).expect("encode");
            assert_eq!(image::guess_format(&bytes).unwrap(), format.image_format());
            let back = image::load_from_memory(&bytes).unwrap();
            assert_eq!((back.width(), back.height()), (120, 80));
        }
    }

    #[cfg(feature = "full")]
    #[test]
    fn outline_is_drawn_at_radius() {
        let base = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let det = FusedDetection {
            x: 60,
            y: 60,
            r: 20,
            confidence: 0.9,
            method: DetectionMethod::Hough,
        };
        let img = annotate(&base, &[det], 1);
        assert_eq!(*img.get_pixel(80, 60), CIRCLE_COLOR);
        assert_eq!(*img.get_pixel(60, 60), CENTRE_COLOR);
        assert_eq!(*img.get_pixel(70, 60), Rgb([0, 0, 0]));
    }
}
