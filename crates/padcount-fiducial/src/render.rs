//! Printable marker rendering.

use padcount_core::GrayImage;

use crate::Dictionary;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("marker id {id} out of range for {dictionary} ({len} markers)")]
    UnknownId {
        id: u32,
        dictionary: &'static str,
        len: usize,
    },
    #[error("marker side {side_px}px is smaller than its {cells} cells")]
    TooSmall { side_px: usize, cells: usize },
}

/// Render marker `id` as a `side_px` square (border included) on a white
/// quiet zone of `quiet_zone_px` on every side.
///
/// Cell boundaries are spread evenly when `side_px` is not a multiple of the
/// cell count, so the outer border is always exactly `side_px` wide.
pub fn render_marker(
    dict: &Dictionary,
    id: u32,
    side_px: usize,
    quiet_zone_px: usize,
) -> Result<GrayImage, RenderError> {
    let code = dict.code(id).ok_or(RenderError::UnknownId {
        id,
        dictionary: dict.name,
        len: dict.codes.len(),
    })?;
    let bits = dict.marker_size;
    let cells = dict.cells_with_border();
    if side_px < cells {
        return Err(RenderError::TooSmall { side_px, cells });
    }

    let total = side_px + 2 * quiet_zone_px;
    let mut img = GrayImage::new(total, total, 255);

    for py in 0..side_px {
        let cy = py * cells / side_px;
        for px in 0..side_px {
            let cx = px * cells / side_px;
            let is_border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let black = is_border || (code >> ((cy - 1) * bits + (cx - 1))) & 1 == 1;
            if black {
                img.data[(py + quiet_zone_px) * total + px + quiet_zone_px] = 0;
            }
        }
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;

    #[test]
    fn border_spans_exact_side() {
        let img = render_marker(&DICT_4X4_50, 0, 100, 10).unwrap();
        assert_eq!(img.width, 120);
        let row = 10 * img.width;
        assert_eq!(img.data[row + 9], 255);
        assert_eq!(img.data[row + 10], 0);
        assert_eq!(img.data[row + 109], 0);
        assert_eq!(img.data[row + 110], 255);
    }

    #[test]
    fn inner_cells_follow_code_bits() {
        let cell = 10;
        let img = render_marker(&DICT_4X4_50, 5, 6 * cell, 0).unwrap();
        let code = DICT_4X4_50.codes[5];
        for by in 0..4 {
            for bx in 0..4 {
                let x = (bx + 1) * cell + cell / 2;
                let y = (by + 1) * cell + cell / 2;
                let black = img.data[y * img.width + x] == 0;
                assert_eq!(black, (code >> (by * 4 + bx)) & 1 == 1);
            }
        }
    }

    #[test]
    fn rejects_bad_requests() {
        assert!(matches!(
            render_marker(&DICT_4X4_50, 50, 100, 0),
            Err(RenderError::UnknownId { id: 50, .. })
        ));
        assert!(matches!(
            render_marker(&DICT_4X4_50, 0, 4, 0),
            Err(RenderError::TooSmall { .. })
        ));
    }
}
