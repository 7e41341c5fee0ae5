//! Core types and utilities for pad counting.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image codec: callers adapt their buffers into the
//! borrowed [`GrayImageView`] / [`RgbImageView`] types.

mod homography;
mod image;
mod integral;
mod logger;

pub use homography::{homography_from_4pt, warp_perspective_rgb_into, Homography};
pub use image::{sample_bilinear_rgb, GrayImage, GrayImageView, RgbImageView};
pub use integral::IntegralImage;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
