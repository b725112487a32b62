//! Writes text on the fura template picture.
//!
//! The text is drawn in black with the largest font size that still fits the
//! box at [`TEXT_BOX_OFFSET`], centered inside it.

use crate::errors::{Error, Result};
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument};

/// Top left corner of the text box on the template.
pub const TEXT_BOX_OFFSET: (i32, i32) = (100, 200);
/// Width and height of the text box.
pub const TEXT_BOX_SIZE: (u32, u32) = (250, 50);
/// Name of the attachment sent back.
pub const FILE_NAME: &str = "fura.png";
/// Largest font size tried.
pub const MAX_FONT_SIZE: u16 = 256;

const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Largest font size whose rendered text fits within `bounds`.
///
/// `measure` returns the width and height of the text at a given size. Sizes are
/// tried from zero upwards and the one before the first overflow wins.
pub fn max_font_size<F>(measure: F, bounds: (u32, u32)) -> u16
where
    F: Fn(u16) -> (u32, u32),
{
    for size in 0..=MAX_FONT_SIZE {
        let (width, height) = measure(size);
        if width > bounds.0 || height > bounds.1 {
            return size.saturating_sub(1);
        }
    }
    MAX_FONT_SIZE
}

/// Position that centers text of `text_size` in a box of `box_size` at `box_offset`.
///
/// Halves round down, also when the text is larger than the box.
#[must_use]
pub fn centered_offset(
    text_size: (u32, u32),
    box_size: (u32, u32),
    box_offset: (i32, i32),
) -> (i32, i32) {
    let axis = |text: u32, space: u32, offset: i32| {
        let shift = (i64::from(space) - i64::from(text)).div_euclid(2);
        i32::try_from(i64::from(offset) + shift).unwrap_or(offset)
    };
    (
        axis(text_size.0, box_size.0, box_offset.0),
        axis(text_size.1, box_size.1, box_offset.1),
    )
}

/// Template picture and font, loaded once per render request.
pub struct FuraRenderer {
    template: RgbaImage,
    font: FontVec,
}

impl FuraRenderer {
    /// Loads the template picture and the font from disk.
    pub fn load(template_path: &Path, font_path: &Path) -> Result<Self> {
        let template = image::open(template_path)
            .map_err(|e| Error::Image {
                message: format!("Failed to load template {}: {e}", template_path.display()),
            })?
            .to_rgba8();
        let font_data = std::fs::read(font_path).map_err(|e| Error::Image {
            message: format!("Failed to read font {}: {e}", font_path.display()),
        })?;
        let font = FontVec::try_from_vec(font_data).map_err(|e| Error::Image {
            message: format!("Failed to parse font {}: {e}", font_path.display()),
        })?;
        Ok(Self::new(template, font))
    }

    /// Renderer over an already loaded template and font.
    #[must_use]
    pub fn new(template: RgbaImage, font: FontVec) -> Self {
        Self { template, font }
    }

    /// Draws `text` on a copy of the template and returns it PNG encoded.
    #[instrument(skip(self))]
    pub fn render(&self, text: &str) -> Result<Vec<u8>> {
        let size = max_font_size(
            |size| text_size(PxScale::from(f32::from(size)), &self.font, text),
            TEXT_BOX_SIZE,
        );
        let scale = PxScale::from(f32::from(size));
        let (x, y) = centered_offset(
            text_size(scale, &self.font, text),
            TEXT_BOX_SIZE,
            TEXT_BOX_OFFSET,
        );
        debug!("Drawing at font size {size}, position ({x}, {y})");

        let mut picture = self.template.clone();
        draw_text_mut(&mut picture, TEXT_COLOR, x, y, scale, &self.font, text);

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(picture)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Image {
                message: format!("Failed to encode picture: {e}"),
            })?;
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const SYSTEM_FONTS: [&str; 2] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ];

    #[test]
    fn test_max_font_size_stops_before_overflow() {
        // 10 px wide and 2 px high per size step: width overflows 250 at 26
        let size = max_font_size(|s| (10 * u32::from(s), 2 * u32::from(s)), TEXT_BOX_SIZE);
        assert_eq!(size, 25);

        // height is the binding constraint here
        let size = max_font_size(|s| (u32::from(s), 5 * u32::from(s)), TEXT_BOX_SIZE);
        assert_eq!(size, 10);
    }

    #[test]
    fn test_max_font_size_edges() {
        assert_eq!(max_font_size(|_| (1000, 1000), TEXT_BOX_SIZE), 0);
        assert_eq!(max_font_size(|_| (0, 0), TEXT_BOX_SIZE), MAX_FONT_SIZE);
    }

    #[test]
    fn test_centered_offset() {
        assert_eq!(
            centered_offset((50, 20), TEXT_BOX_SIZE, TEXT_BOX_OFFSET),
            (200, 215)
        );
        // odd leftovers round down
        assert_eq!(
            centered_offset((51, 21), TEXT_BOX_SIZE, TEXT_BOX_OFFSET),
            (199, 214)
        );
        assert_eq!(
            centered_offset((250, 50), TEXT_BOX_SIZE, TEXT_BOX_OFFSET),
            TEXT_BOX_OFFSET
        );
        // text wider than the box starts left of it
        assert_eq!(
            centered_offset((261, 50), TEXT_BOX_SIZE, TEXT_BOX_OFFSET),
            (94, 200)
        );
    }

    #[test]
    fn test_load_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = FuraRenderer::load(&dir.path().join("fura.png"), &dir.path().join("font.ttf"));
        assert!(matches!(result, Err(Error::Image { .. })));
    }

    #[test]
    fn test_load_rejects_bad_font() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("fura.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
            .save(&template)
            .unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"not a font").unwrap();

        let result = FuraRenderer::load(&template, &font);
        assert!(matches!(result, Err(Error::Image { message }) if message.contains("parse font")));
    }

    #[test]
    fn test_render_draws_inside_box() {
        let Some(font_path) = SYSTEM_FONTS.iter().map(Path::new).find(|p| p.exists()) else {
            return;
        };
        let font = FontVec::try_from_vec(std::fs::read(font_path).unwrap()).unwrap();
        let template = RgbaImage::from_pixel(400, 300, Rgba([255, 255, 255, 255]));
        let renderer = FuraRenderer::new(template, font);

        let png = renderer.render("skål").unwrap();
        let picture = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(picture.dimensions(), (400, 300));

        // one pixel of slack for anti-aliasing
        let (left, top) = (TEXT_BOX_OFFSET.0.unsigned_abs() - 1, TEXT_BOX_OFFSET.1.unsigned_abs() - 1);
        let (width, height) = (TEXT_BOX_SIZE.0 + 2, TEXT_BOX_SIZE.1 + 2);
        let mut inside = 0;
        for (x, y, pixel) in picture.enumerate_pixels() {
            if pixel.0[0] < 128 {
                let in_box = (left..left + width).contains(&x) && (top..top + height).contains(&y);
                assert!(in_box, "ink outside the text box at ({x}, {y})");
                inside += 1;
            }
        }
        assert!(inside > 0);
    }
}
