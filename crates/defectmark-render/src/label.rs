//! Bitmap-font text for labels and captions.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

/// Glyph cell size in font pixels.
pub const GLYPH_SIZE: u32 = 8;

/// Width of `text` in view pixels at an integer font scale.
pub fn measure(text: &str, scale: u32) -> f64 {
    line_height(scale) * text.chars().count() as f64
}

/// Height of one line of text in view pixels.
pub fn line_height(scale: u32) -> f64 {
    f64::from(GLYPH_SIZE.saturating_mul(scale.max(1)))
}

/// Draw `text` with its top-left corner at `(x, y)`.
///
/// Characters outside the basic font are drawn as `?`.
pub fn draw_text(pixmap: &mut Pixmap, text: &str, x: f64, y: f64, scale: u32, color: Color) {
    let scale = scale.max(1);
    let cell = f64::from(scale);
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;

    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + i as f64 * f64::from(GLYPH_SIZE) * cell;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (*bits >> col) & 1 == 0 {
                    continue;
                }
                let px = origin_x + f64::from(col) * cell;
                let py = y + row as f64 * cell;
                if let Some(rect) = Rect::from_xywh(px as f32, py as f32, cell as f32, cell as f32) {
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure() {
        assert!((measure("Dent", 2) - 64.0).abs() < f64::EPSILON);
        assert!((measure("", 2)).abs() < f64::EPSILON);
        // Zero scale is treated as 1.
        assert!((measure("ab", 0) - 16.0).abs() < f64::EPSILON);
        assert!((line_height(3) - 24.0).abs() < f64::EPSILON);
        assert!(measure("a", u32::MAX).is_finite());
    }

    #[test]
    fn test_draw_text_sets_pixels() {
        let mut pixmap = Pixmap::new(40, 20).unwrap();
        draw_text(&mut pixmap, "A", 2.0, 2.0, 2, Color::WHITE);
        let lit = pixmap.pixels().iter().filter(|p| p.alpha() == 255).count();
        assert!(lit > 0);
        // Nothing drawn right of the single 16px glyph.
        for y in 0..20 {
            assert_eq!(pixmap.pixel(30, y).unwrap().alpha(), 0);
        }
    }

    #[test]
    fn test_space_draws_nothing() {
        let mut pixmap = Pixmap::new(16, 16).unwrap();
        draw_text(&mut pixmap, " ", 0.0, 0.0, 1, Color::WHITE);
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }
}
