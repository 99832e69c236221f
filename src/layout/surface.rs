//! The drawing capability the layout engine renders through.
//!
//! Text coordinates follow canvas conventions with centered alignment: `x`
//! is the horizontal center of the text, and `y` is either the top or the
//! bottom of the line box depending on the [`TextBaseline`].

use image::RgbaImage;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Placeholder background.
    pub const NEUTRAL_GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Which edge of the line box `y` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    /// `y` is the top of the line; text hangs below it.
    Top,
    /// `y` is the bottom of the line; text sits on it.
    Bottom,
}

/// A 2D surface that can measure and draw text and images.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Advance width of `text` at `font_size`, in pixels.
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// Outline `text` with a pen `line_width` pixels wide.
    #[allow(clippy::too_many_arguments)]
    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
        font_size: f32,
        line_width: f32,
        color: Color,
    );

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        baseline: TextBaseline,
        font_size: f32,
        color: Color,
    );

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    /// Draw `image` scaled into the given rectangle.
    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32);
}
