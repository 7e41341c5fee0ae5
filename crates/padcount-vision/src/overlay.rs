//! Bitmap digits for the count overlay.

use image::{Rgb, RgbImage};

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// 5×7 digits, one row per byte, bit 4 is the leftmost column.
const DIGITS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

/// Glyph scale so the text is roughly 1/25 of the shorter side.
pub fn text_scale(width: u32, height: u32) -> u32 {
    (width.min(height) / (25 * GLYPH_H)).max(1)
}

/// Draws `count` in the top-left corner on a dark backdrop.
pub fn draw_count(img: &mut RgbImage, count: usize, scale: u32, color: Rgb<u8>) {
    let text = count.to_string();
    let scale = scale.max(1);
    let pad = 2 * scale;
    let advance = (GLYPH_W + 1) * scale;
    let box_w = text.len() as u32 * advance + 2 * pad;
    let box_h = GLYPH_H * scale + 2 * pad;
    fill_rect(img, 0, 0, box_w, box_h, Rgb([0, 0, 0]));

    for (i, ch) in text.bytes().enumerate() {
        let glyph = &DIGITS[(ch - b'0') as usize];
        let ox = pad + i as u32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x10 >> col) != 0 {
                    fill_rect(
                        img,
                        ox + col * scale,
                        pad + row as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x1 = (x + w).min(img.width());
    let y1 = (y + h).min(img.height());
    for yy in y.min(y1)..y1 {
        for xx in x.min(x1)..x1 {
            img.put_pixel(xx, yy, color);
        }
    }
}
