//! Dictionary metadata and packed marker codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builtins;

/// A fixed square-marker dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: &'static str,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order with **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Cells per side including the one-cell black border.
    #[inline]
    pub fn cells_with_border(&self) -> usize {
        self.marker_size + 2
    }

    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }
}

/// Dictionary selector used in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiducialDictionary {
    /// 50 markers with 4×4 inner bits.
    #[default]
    #[serde(rename = "4x4-50")]
    Dict4x4_50,
}

impl FiducialDictionary {
    pub const ALL: [FiducialDictionary; 1] = [FiducialDictionary::Dict4x4_50];

    pub fn name(self) -> &'static str {
        match self {
            FiducialDictionary::Dict4x4_50 => "4x4-50",
        }
    }

    pub fn dictionary(self) -> Dictionary {
        match self {
            FiducialDictionary::Dict4x4_50 => builtins::DICT_4X4_50,
        }
    }
}

impl fmt::Display for FiducialDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown fiducial dictionary `{0}` (supported: 4x4-50)")]
pub struct UnknownDictionary(pub String);

impl FromStr for FiducialDictionary {
    type Err = UnknownDictionary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        FiducialDictionary::ALL
            .into_iter()
            .find(|d| d.name() == key || format!("dict-{}", d.name()) == key)
            .ok_or_else(|| UnknownDictionary(s.to_string()))
    }
}
