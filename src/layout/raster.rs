//! [`Surface`] over an in-memory RGBA image.
//!
//! Glyphs come from one of two sources:
//!
//! - **Bitmap**: the embedded Spleen fonts (6x12 for small text, 12x24
//!   otherwise), scaled with nearest neighbor to the requested size
//! - **TrueType**: any `.ttf`/`.otf` loaded at runtime, rasterized with
//!   `ab_glyph` for anti-aliased edges
//!
//! Each line of text is rasterized to a coverage mask first. Fill blends the
//! mask directly; stroke blends a copy dilated by half the pen width, which
//! gives rounded joins and caps.

use ab_glyph::{Font, FontArc, ScaleFont};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};
use std::path::Path;

use super::surface::{Color, Surface, TextBaseline};
use crate::error::MemeError;

/// Largest font size rendered from the 6x12 cell.
const SMALL_FONT_MAX: f32 = 14.0;

/// Where glyph shapes come from.
#[derive(Clone, Default)]
pub enum GlyphSource {
    #[default]
    Bitmap,
    TrueType(FontArc),
}

impl std::fmt::Debug for GlyphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlyphSource::Bitmap => f.write_str("Bitmap"),
            GlyphSource::TrueType(_) => f.write_str("TrueType"),
        }
    }
}

impl GlyphSource {
    /// Load a TrueType/OpenType font from disk.
    pub fn from_path(path: &Path) -> Result<Self, MemeError> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| MemeError::Config(format!("Invalid font {}: {}", path.display(), e)))?;
        Ok(GlyphSource::TrueType(font))
    }

    /// The font at `path` if given, else the embedded bitmap font.
    pub fn load(path: Option<&Path>) -> Result<Self, MemeError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(GlyphSource::Bitmap),
        }
    }

    fn measure(&self, text: &str, font_size: f32) -> f32 {
        match self {
            GlyphSource::Bitmap => {
                let cell = BitmapCell::for_size(font_size);
                text.chars().count() as f32 * cell.advance(font_size)
            }
            GlyphSource::TrueType(font) => {
                let scaled = font.as_scaled(font_size);
                text.chars().map(|ch| scaled.h_advance(font.glyph_id(ch))).sum()
            }
        }
    }

    fn rasterize(&self, text: &str, font_size: f32) -> Mask {
        match self {
            GlyphSource::Bitmap => rasterize_bitmap(text, font_size),
            GlyphSource::TrueType(font) => rasterize_truetype(font, text, font_size),
        }
    }
}

// ============================================================================
// COVERAGE MASKS
// ============================================================================

/// Per-pixel coverage in 0.0..=1.0, row-major.
struct Mask {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Mask {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    fn add(&mut self, x: i64, y: i64, coverage: f32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = y as usize * self.width + x as usize;
            self.data[idx] = (self.data[idx] + coverage).min(1.0);
        }
    }

    /// Grow the mask by a disk of `radius`. The result is padded by
    /// `ceil(radius)` on every side.
    fn dilate(&self, radius: f32) -> (Mask, usize) {
        let pad = radius.ceil().max(0.0) as usize;
        if pad == 0 {
            return (
                Mask {
                    width: self.width,
                    height: self.height,
                    data: self.data.clone(),
                },
                0,
            );
        }

        let r = pad as i64;
        let r2 = radius * radius;
        let offsets: Vec<(i64, i64)> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| (dx * dx + dy * dy) as f32 <= r2)
            .collect();

        let mut out = Mask::new(self.width + 2 * pad, self.height + 2 * pad);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.get(x, y);
                if c <= 0.0 {
                    continue;
                }
                let (cx, cy) = ((x + pad) as i64, (y + pad) as i64);
                for &(dx, dy) in &offsets {
                    let idx = (cy + dy) as usize * out.width + (cx + dx) as usize;
                    if out.data[idx] < c {
                        out.data[idx] = c;
                    }
                }
            }
        }
        (out, pad)
    }
}

// ============================================================================
// GLYPH SOURCES
// ============================================================================

#[derive(Clone, Copy)]
struct BitmapCell {
    width: usize,
    height: usize,
    data: &'static [u8],
}

impl BitmapCell {
    fn for_size(font_size: f32) -> Self {
        if font_size <= SMALL_FONT_MAX {
            Self {
                width: 6,
                height: 12,
                data: FONT_6X12,
            }
        } else {
            Self {
                width: 12,
                height: 24,
                data: FONT_12X24,
            }
        }
    }

    fn scale(self, font_size: f32) -> f32 {
        font_size / self.height as f32
    }

    fn advance(self, font_size: f32) -> f32 {
        self.width as f32 * self.scale(font_size)
    }
}

fn rasterize_bitmap(text: &str, font_size: f32) -> Mask {
    let cell = BitmapCell::for_size(font_size);
    let scale = cell.scale(font_size);
    let advance = cell.advance(font_size);
    let glyph_w = advance.round().max(1.0) as usize;
    let glyph_h = font_size.round().max(1.0) as usize;
    let count = text.chars().count();

    let mut mask = Mask::new(((count as f32) * advance).ceil() as usize + 1, glyph_h);
    let Ok(mut font) = PSF2Font::new(cell.data) else {
        return mask;
    };

    let mut bitmap = vec![false; cell.width * cell.height];
    for (i, ch) in text.chars().enumerate() {
        if ch == ' ' {
            continue;
        }
        bitmap.fill(false);
        let utf8 = ch.to_string();
        match font.glyph_for_utf8(utf8.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if row_y < cell.height && col_x < cell.width {
                            bitmap[row_y * cell.width + col_x] = on;
                        }
                    }
                }
            }
            None => draw_box(&mut bitmap, cell.width, cell.height),
        }

        // Nearest-neighbor scale from the cell to the target size
        let origin_x = (i as f32 * advance).round() as i64;
        for dy in 0..glyph_h {
            let sy = ((dy as f32 / scale) as usize).min(cell.height - 1);
            for dx in 0..glyph_w {
                let sx = ((dx as f32 / scale) as usize).min(cell.width - 1);
                if bitmap[sy * cell.width + sx] {
                    mask.add(origin_x + dx as i64, dy as i64, 1.0);
                }
            }
        }
    }
    mask
}

/// Outline box for characters the bitmap font lacks.
fn draw_box(bitmap: &mut [bool], width: usize, height: usize) {
    for x in 1..width - 1 {
        bitmap[width + x] = true;
        bitmap[(height - 2) * width + x] = true;
    }
    for y in 1..height - 1 {
        bitmap[y * width + 1] = true;
        bitmap[y * width + width - 2] = true;
    }
}

fn rasterize_truetype(font: &FontArc, text: &str, font_size: f32) -> Mask {
    let scaled = font.as_scaled(font_size);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let ascent = scaled.ascent();
    let height = (ascent - scaled.descent()).ceil().max(1.0) as usize;
    let mut mask = Mask::new(caret_x.ceil().max(1.0) as usize + 1, height);

    for (glyph_id, glyph_x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(font_size, ab_glyph::point(glyph_x, ascent));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i64 + bounds.min.x as i64;
                let y = py as i64 + bounds.min.y as i64;
                mask.add(x, y, coverage);
            });
        }
    }
    mask
}

// ============================================================================
// SURFACE
// ============================================================================

/// An RGBA raster that implements [`Surface`].
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
    glyphs: GlyphSource,
}

impl RasterSurface {
    /// A transparent surface.
    pub fn new(width: u32, height: u32, glyphs: GlyphSource) -> Self {
        Self::from_image(RgbaImage::new(width.max(1), height.max(1)), glyphs)
    }

    pub fn from_image(image: RgbaImage, glyphs: GlyphSource) -> Self {
        Self { image, glyphs }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Alpha-blend `color` through `mask`, with the mask's top-left at `(left, top)`.
    fn blend_mask(&mut self, mask: &Mask, left: i64, top: i64, color: Color) {
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);
        for my in 0..mask.height {
            let y = top + my as i64;
            if y < 0 || y >= height {
                continue;
            }
            for mx in 0..mask.width {
                let x = left + mx as i64;
                if x < 0 || x >= width {
                    continue;
                }
                let coverage = mask.get(mx, my);
                if coverage > 0.0 {
                    blend_pixel(self.image.get_pixel_mut(x as u32, y as u32), color, coverage);
                }
            }
        }
    }

    /// Top-left of a line box of `mask`'s size placed at `(x, y)`.
    fn origin(mask: &Mask, x: f32, y: f32, baseline: TextBaseline) -> (f32, f32) {
        let left = x - mask.width as f32 / 2.0;
        let top = match baseline {
            TextBaseline::Top => y,
            TextBaseline::Bottom => y - mask.height as f32,
        };
        (left, top)
    }
}

fn blend_pixel(pixel: &mut Rgba<u8>, color: Color, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0) * color.a as f32 / 255.0;
    let mix = |dst: u8, src: u8| (dst as f32 * (1.0 - alpha) + src as f32 * alpha).round() as u8;
    let [r, g, b, a] = pixel.0;
    let out_a = (a as f32 + (255.0 - a as f32) * alpha).round() as u8;
    *pixel = Rgba([mix(r, color.r), mix(g, color.g), mix(b, color.b), out_a]);
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.glyphs.measure(text, font_size)
    }

    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
        font_size: f32,
        line_width: f32,
        color: Color,
    ) {
        if text.is_empty() || font_size <= 0.0 {
            return;
        }
        let mask = self.glyphs.rasterize(text, font_size);
        let (left, top) = Self::origin(&mask, x, y, baseline);
        let (outline, pad) = mask.dilate(line_width / 2.0);
        self.blend_mask(
            &outline,
            left.round() as i64 - pad as i64,
            top.round() as i64 - pad as i64,
            color,
        );
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
        font_size: f32,
        color: Color,
    ) {
        if text.is_empty() || font_size <= 0.0 {
            return;
        }
        let mask = self.glyphs.rasterize(text, font_size);
        let (left, top) = Self::origin(&mask, x, y, baseline);
        self.blend_mask(&mask, left.round() as i64, top.round() as i64, color);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let x0 = x.max(0.0).round() as u32;
        let y0 = y.max(0.0).round() as u32;
        let x1 = ((x + width).round().max(0.0) as u32).min(self.image.width());
        let y1 = ((y + height).round().max(0.0) as u32).min(self.image.height());
        for py in y0..y1 {
            for px in x0..x1 {
                blend_pixel(self.image.get_pixel_mut(px, py), color, 1.0);
            }
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32) {
        let (w, h) = (width.round().max(1.0) as u32, height.round().max(1.0) as u32);
        let scaled;
        let source = if image.dimensions() == (w, h) {
            image
        } else {
            scaled = imageops::resize(image, w, h, FilterType::Triangle);
            &scaled
        };
        imageops::overlay(&mut self.image, source, x.round() as i64, y.round() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(surface: &RasterSurface, color: Color) -> usize {
        surface
            .image()
            .pixels()
            .filter(|p| p.0 == [color.r, color.g, color.b, 255])
            .count()
    }

    #[test]
    fn test_bitmap_measure_scales_with_size() {
        let glyphs = GlyphSource::Bitmap;
        assert_eq!(glyphs.measure("AB", 24.0), 24.0);
        assert_eq!(glyphs.measure("AB", 48.0), 48.0);
        assert_eq!(glyphs.measure("AB", 12.0), 12.0);
        assert_eq!(glyphs.measure("", 24.0), 0.0);
    }

    #[test]
    fn test_fill_text_draws_pixels() {
        let mut surface = RasterSurface::new(200, 100, GlyphSource::Bitmap);
        surface.fill_text("HI", 100.0, 10.0, TextBaseline::Top, 24.0, Color::WHITE);
        assert!(count(&surface, Color::WHITE) > 0);
    }

    #[test]
    fn test_stroke_is_wider_than_fill() {
        let mut filled = RasterSurface::new(200, 100, GlyphSource::Bitmap);
        filled.fill_text("HI", 100.0, 20.0, TextBaseline::Top, 24.0, Color::WHITE);
        let mut stroked = RasterSurface::new(200, 100, GlyphSource::Bitmap);
        stroked.stroke_text("HI", 100.0, 20.0, TextBaseline::Top, 24.0, 4.0, Color::BLACK);
        assert!(count(&stroked, Color::BLACK) > count(&filled, Color::WHITE));
    }

    #[test]
    fn test_bottom_baseline_sits_above_y() {
        let mut surface = RasterSurface::new(100, 100, GlyphSource::Bitmap);
        surface.fill_text("X", 50.0, 50.0, TextBaseline::Bottom, 24.0, Color::WHITE);
        let below = surface
            .image()
            .enumerate_pixels()
            .filter(|(_, y, p)| *y >= 50 && p.0[3] > 0)
            .count();
        assert_eq!(below, 0);
        assert!(count(&surface, Color::WHITE) > 0);
    }

    #[test]
    fn test_fill_rect_clips_to_bounds() {
        let mut surface = RasterSurface::new(10, 10, GlyphSource::Bitmap);
        surface.fill_rect(-5.0, -5.0, 100.0, 100.0, Color::NEUTRAL_GRAY);
        assert_eq!(count(&surface, Color::NEUTRAL_GRAY), 100);
    }

    #[test]
    fn test_draw_image_scales_into_rect() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let mut surface = RasterSurface::new(20, 20, GlyphSource::Bitmap);
        surface.draw_image(&source, 0.0, 0.0, 20.0, 20.0);
        assert!(surface.image().pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn test_dilate_pads_and_grows() {
        let mut mask = Mask::new(3, 3);
        mask.add(1, 1, 1.0);
        let (grown, pad) = mask.dilate(2.0);
        assert_eq!(pad, 2);
        assert_eq!(grown.width, 7);
        let covered = grown.data.iter().filter(|&&c| c > 0.0).count();
        assert!(covered > 1);
    }

    #[test]
    fn test_missing_font_file() {
        let err = GlyphSource::from_path(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, MemeError::Io(_)));
    }
}
