//! Embedded built-in dictionaries.
//!
//! The source of truth lives in `padcount-fiducial/data/*_CODES.json`, which
//! keeps the OpenCV byte layout; `build.rs` converts it to black = 1 codes.

#![allow(clippy::unreadable_literal, non_upper_case_globals)]

use crate::Dictionary;

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));
