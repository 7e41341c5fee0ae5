//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that: `observed_code == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

/// Brute-force matcher over all ids and rotations of a fixed dictionary.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&base| [0u8, 1, 2, 3].map(|rot| rotate_code_u64(base, n, rot)))
            .collect();

        Self {
            dict,
            max_hamming,
            rotated,
        }
    }

    /// Matcher that corrects up to the dictionary's advertised error budget.
    pub fn with_correction(dict: Dictionary) -> Self {
        Self::new(dict, dict.max_correction_bits)
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Find the best match within `max_hamming`. Ties keep the lowest id.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming {
                    continue;
                }
                if best.is_some_and(|prev| prev.hamming <= h) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming: h,
                });
                if h == 0 {
                    return best;
                }
            }
        }

        best
    }
}

/// Rotate a code stored in row-major bits: `idx = y * N + x`.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;

    #[test]
    fn rotate_four_times_is_identity() {
        let code = 0xbeef_u64;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code_u64(r, 4, 1);
        }
        assert_eq!(code, r);
        assert_eq!(
            rotate_code_u64(rotate_code_u64(code, 4, 1), 4, 1),
            rotate_code_u64(code, 4, 2)
        );
    }

    #[test]
    fn matcher_finds_rotated_code() {
        let matcher = Matcher::new(DICT_4X4_50, 0);

        let observed = rotate_code_u64(DICT_4X4_50.codes[7], 4, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.id, 7);
        assert_eq!(m.rotation, 3);
        assert_eq!(m.hamming, 0);
    }

    #[test]
    fn single_bit_error_is_corrected_within_budget() {
        let strict = Matcher::new(DICT_4X4_50, 0);
        let tolerant = Matcher::new(DICT_4X4_50, 1);

        // id 0 is at least three bits from every other rotated code.
        let observed = DICT_4X4_50.codes[0] ^ (1 << 5);
        assert!(strict.match_code(observed).is_none());
        let m = tolerant.match_code(observed).expect("corrected");
        assert_eq!(m.id, 0);
        assert_eq!(m.hamming, 1);
    }
}
