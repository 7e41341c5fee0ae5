//! Processing backend selection.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Fiducial rectification, three detectors, fusion and colour re-weighting.
    Full,
    /// Global threshold and area ratio; no per-pad detections.
    Fallback,
}

impl Backend {
    /// Best backend this build supports.
    pub fn probe() -> Self {
        if Self::full_available() {
            Backend::Full
        } else {
            Backend::Fallback
        }
    }

    pub fn full_available() -> bool {
        cfg!(feature = "full")
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Full => "full",
            Backend::Fallback => "fallback",
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::probe()
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
