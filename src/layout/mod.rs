//! # Text Layout
//!
//! Wraps captions and draws them as outlined meme text on a [`Surface`].
//!
//! Full-size renders and thumbnails share one algorithm. They differ only
//! in their [`SizingPolicy`]: full renders size text from the canvas and the
//! user's [`RenderSettings`], thumbnails use a small fixed range and cap the
//! caption at two lines.
//!
//! ## Drawing order
//!
//! Each line is uppercased, stroked in black several times with decreasing
//! pen widths so corners are fully covered, then filled in white.

pub mod raster;
pub mod surface;

pub use raster::{GlyphSource, RasterSurface};
pub use surface::{Color, Surface, TextBaseline};

use serde::{Deserialize, Serialize};

/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.1;

/// Outline pen width as a multiple of the font size.
pub const STROKE_WIDTH_FACTOR: f32 = 0.16;

/// Pen widths (relative to the full stroke) of each outline pass.
const STROKE_PASSES: [f32; 3] = [1.0, 0.75, 0.5];

/// Edge padding as a fraction of canvas width.
const PADDING_FRACTION: f32 = 0.02;

/// Height of the band the vertical offset moves text through, as a fraction of canvas height.
const OFFSET_BAND_FRACTION: f32 = 0.2;

/// Thumbnail font size range, in pixels.
const THUMBNAIL_FONT_MAX: f32 = 13.0;
const THUMBNAIL_FONT_MIN: f32 = 10.0;

/// Thumbnail captions shrink one pixel per this many characters.
const THUMBNAIL_CHARS_PER_STEP: usize = 15;

const THUMBNAIL_MAX_LINES: usize = 2;

const ELLIPSIS: &str = "...";

/// Greedy word wrap.
///
/// Words are added to the current line while the measured candidate line
/// fits in `max_width`. A line only breaks when the next word both overflows
/// and actually widens it, so a word wider than `max_width` is never split
/// and a measure that ignores its input yields a single line.
pub fn wrap(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        let candidate_width = measure(&candidate);
        if candidate_width <= max_width || candidate_width <= measure(&current) {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// [`wrap`] with an optional line cap.
///
/// Lines past the cap are dropped and the last kept line ends in `...`.
pub fn wrap_capped(
    text: &str,
    max_width: f32,
    max_lines: Option<usize>,
    measure: impl Fn(&str) -> f32,
) -> Vec<String> {
    let mut lines = wrap(text, max_width, &measure);
    let Some(cap) = max_lines.filter(|&cap| cap > 0) else {
        return lines;
    };
    if lines.len() <= cap {
        return lines;
    }

    lines.truncate(cap);
    if let Some(last) = lines.last_mut() {
        // Drop trailing words until the ellipsis fits, keeping at least one
        while measure(&format!("{}{}", last, ELLIPSIS)) > max_width {
            match last.rfind(' ') {
                Some(idx) => last.truncate(idx),
                None => break,
            }
        }
        last.push_str(ELLIPSIS);
    }
    lines
}

/// User-adjustable caption placement for full-size renders.
///
/// Scales are percentages (20..=100) where 50 is the default size; offsets are
/// percentages (0..=50) of a band 20% of the canvas height, pushing the
/// caption inward from its edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    pub top_scale: f32,
    pub top_offset: f32,
    pub bottom_scale: f32,
    pub bottom_offset: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            top_scale: 50.0,
            top_offset: 0.0,
            bottom_scale: 50.0,
            bottom_offset: 0.0,
        }
    }
}

impl RenderSettings {
    pub const SCALE_RANGE: (f32, f32) = (20.0, 100.0);
    pub const OFFSET_RANGE: (f32, f32) = (0.0, 50.0);

    /// Clamp every value into its range. Non-finite values take the default.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let clamp = |value: f32, default: f32, (min, max): (f32, f32)| {
            if value.is_finite() {
                value.clamp(min, max)
            } else {
                default
            }
        };
        Self {
            top_scale: clamp(self.top_scale, defaults.top_scale, Self::SCALE_RANGE),
            top_offset: clamp(self.top_offset, defaults.top_offset, Self::OFFSET_RANGE),
            bottom_scale: clamp(self.bottom_scale, defaults.bottom_scale, Self::SCALE_RANGE),
            bottom_offset: clamp(self.bottom_offset, defaults.bottom_offset, Self::OFFSET_RANGE),
        }
    }
}

/// Font size, spacing and line cap for one caption block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingPolicy {
    pub font_size: f32,
    /// Distance from the canvas edge to the caption block.
    pub padding: f32,
    /// Extra inward shift on top of `padding`.
    pub offset: f32,
    pub max_lines: Option<usize>,
}

impl SizingPolicy {
    /// Full-size policy: `scale/50 * min(width/14, height/16)`.
    pub fn full(width: u32, height: u32, scale_percent: f32, offset_percent: f32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let base = (w / 14.0).min(h / 16.0);
        Self {
            font_size: scale_percent / 50.0 * base,
            padding: w * PADDING_FRACTION,
            offset: offset_percent / 100.0 * OFFSET_BAND_FRACTION * h,
            max_lines: None,
        }
    }

    /// Thumbnail policy: 10..=13 px depending on caption length, at most two lines.
    pub fn thumbnail(width: u32, text: &str) -> Self {
        let steps = (text.chars().count() / THUMBNAIL_CHARS_PER_STEP) as f32;
        Self {
            font_size: (THUMBNAIL_FONT_MAX - steps).clamp(THUMBNAIL_FONT_MIN, THUMBNAIL_FONT_MAX),
            padding: width as f32 * PADDING_FRACTION,
            offset: 0.0,
            max_lines: Some(THUMBNAIL_MAX_LINES),
        }
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }
}

/// Draw pre-wrapped lines as outlined text centered on `anchor_x`.
///
/// With [`TextBaseline::Top`] line `i` hangs from `anchor_y + i * line_height`;
/// with [`TextBaseline::Bottom`] the block is stacked upward so the last
/// line sits on `anchor_y`.
pub fn draw_outlined_text<S: Surface + ?Sized>(
    surface: &mut S,
    lines: &[String],
    anchor_x: f32,
    anchor_y: f32,
    font_size: f32,
    alignment: TextBaseline,
) {
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    let stroke_width = font_size * STROKE_WIDTH_FACTOR;
    let count = lines.len();

    for (i, line) in lines.iter().enumerate() {
        let text = line.to_uppercase();
        let y = match alignment {
            TextBaseline::Top => anchor_y + i as f32 * line_height,
            TextBaseline::Bottom => anchor_y - (count - 1 - i) as f32 * line_height,
        };
        for pass in STROKE_PASSES {
            surface.stroke_text(
                &text,
                anchor_x,
                y,
                alignment,
                font_size,
                stroke_width * pass,
                Color::BLACK,
            );
        }
        surface.fill_text(&text, anchor_x, y, alignment, font_size, Color::WHITE);
    }
}

/// Wrap and draw one caption at the top or bottom edge. Returns the drawn lines.
pub fn draw_caption<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    edge: TextBaseline,
    policy: &SizingPolicy,
) -> Vec<String> {
    let text = text.trim().to_uppercase();
    if text.is_empty() || policy.font_size <= 0.0 {
        return Vec::new();
    }

    let (width, height) = (surface.width() as f32, surface.height() as f32);
    let max_width = (width - 2.0 * policy.padding).max(1.0);
    let lines = wrap_capped(&text, max_width, policy.max_lines, |s| {
        surface.measure_text(s, policy.font_size)
    });

    let inset = policy.padding + policy.offset;
    let anchor_y = match edge {
        TextBaseline::Top => inset,
        TextBaseline::Bottom => height - inset,
    };
    draw_outlined_text(surface, &lines, width / 2.0, anchor_y, policy.font_size, edge);
    lines
}
