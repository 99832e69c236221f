//! Meme rendering: template image + outlined captions → PNG.
//!
//! The renderer owns the HTTP client and an in-process cache of downloaded
//! template images keyed by URL, holding at most [`IMAGE_CACHE_CAPACITY`]
//! images with the oldest evicted first. Rasterization itself is synchronous and
//! runs on whatever thread calls it; several thumbnails are rasterized in
//! parallel on the rayon pool.
//!
//! A template image that can't be downloaded or decoded never fails a
//! render. It is logged and replaced by a neutral placeholder.

use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::Template;
use crate::error::MemeError;
use crate::layout::{
    self, Color, GlyphSource, RasterSurface, RenderSettings, SizingPolicy, Surface, TextBaseline,
};

/// Side of the square placeholder drawn when a full-size source fails to load.
pub const PLACEHOLDER_SIZE: u32 = 500;
pub const PLACEHOLDER_LABEL: &str = "FAILED TO LOAD";

/// Side of the square thumbnail surface.
pub const THUMBNAIL_SIZE: u32 = 300;

/// Decoded template images kept in memory before the oldest is evicted.
pub const IMAGE_CACHE_CAPACITY: usize = 64;

/// One thumbnail to draw.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRequest<'a> {
    pub template: &'a Template,
    pub top: &'a str,
    pub bottom: &'a str,
}

/// Decoded images by URL, evicted oldest-first once full.
#[derive(Default)]
struct ImageCache {
    images: HashMap<String, DynamicImage>,
    order: VecDeque<String>,
}

impl ImageCache {
    fn get(&self, url: &str) -> Option<&DynamicImage> {
        self.images.get(url)
    }

    fn insert(&mut self, url: String, image: DynamicImage, capacity: usize) {
        if self.images.contains_key(&url) {
            self.images.insert(url, image);
            return;
        }
        while self.images.len() >= capacity.max(1) {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.images.remove(&oldest);
        }
        self.order.push_back(url.clone());
        self.images.insert(url, image);
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

/// Downloads template images and draws captions on them.
pub struct MemeRenderer {
    client: reqwest::Client,
    glyphs: GlyphSource,
    image_cache: Arc<RwLock<ImageCache>>,
}

impl MemeRenderer {
    pub fn new(glyphs: GlyphSource) -> Result<Self, MemeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("memesmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MemeError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self::with_client(client, glyphs))
    }

    pub fn with_client(client: reqwest::Client, glyphs: GlyphSource) -> Self {
        Self {
            client,
            glyphs,
            image_cache: Arc::new(RwLock::new(ImageCache::default())),
        }
    }

    /// Number of decoded images currently cached.
    pub async fn cached_images(&self) -> usize {
        self.image_cache.read().await.len()
    }

    pub fn glyphs(&self) -> &GlyphSource {
        &self.glyphs
    }

    /// Download and decode an image, using the cache when possible.
    pub async fn fetch_image(&self, url: &str) -> Result<DynamicImage, MemeError> {
        {
            let cache = self.image_cache.read().await;
            if let Some(image) = cache.get(url) {
                return Ok(image.clone());
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MemeError::Image(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(MemeError::Image(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MemeError::Image(format!("Failed to read image data: {}", e)))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| MemeError::Image(format!("Failed to decode image: {}", e)))?;

        self.image_cache
            .write()
            .await
            .insert(url.to_string(), image.clone(), IMAGE_CACHE_CAPACITY);
        Ok(image)
    }

    /// The template's image, or `None` (logged) if it can't be loaded.
    async fn load_source(&self, template: &Template) -> Option<RgbaImage> {
        match self.fetch_image(&template.image_url).await {
            Ok(image) => Some(image.to_rgba8()),
            Err(e) => {
                tracing::warn!(template_id = %template.id, error = %e, "template image unavailable; using placeholder");
                None
            }
        }
    }

    /// Full-size render with user settings.
    pub async fn render(
        &self,
        template: &Template,
        top: &str,
        bottom: &str,
        settings: RenderSettings,
    ) -> RgbaImage {
        let source = self.load_source(template).await;
        compose_full(source.as_ref(), top, bottom, settings, &self.glyphs)
    }

    pub async fn thumbnail(&self, template: &Template, top: &str, bottom: &str) -> RgbaImage {
        let source = self.load_source(template).await;
        compose_thumbnail(source.as_ref(), top, bottom, &self.glyphs)
    }

    /// Thumbnails for several candidates, in request order.
    pub async fn thumbnails(&self, requests: &[ThumbnailRequest<'_>]) -> Vec<RgbaImage> {
        let mut sources = Vec::with_capacity(requests.len());
        for request in requests {
            sources.push(self.load_source(request.template).await);
        }

        requests
            .par_iter()
            .zip(sources.par_iter())
            .map(|(request, source)| {
                compose_thumbnail(source.as_ref(), request.top, request.bottom, &self.glyphs)
            })
            .collect()
    }
}

/// Draw captions over `source` at its native size.
pub fn compose_full(
    source: Option<&RgbaImage>,
    top: &str,
    bottom: &str,
    settings: RenderSettings,
    glyphs: &GlyphSource,
) -> RgbaImage {
    let Some(source) = source else {
        return placeholder(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, glyphs).into_image();
    };

    let settings = settings.clamped();
    let (width, height) = source.dimensions();
    let mut surface = RasterSurface::from_image(source.clone(), glyphs.clone());

    let top_policy = SizingPolicy::full(width, height, settings.top_scale, settings.top_offset);
    layout::draw_caption(&mut surface, top, TextBaseline::Top, &top_policy);

    let bottom_policy =
        SizingPolicy::full(width, height, settings.bottom_scale, settings.bottom_offset);
    layout::draw_caption(&mut surface, bottom, TextBaseline::Bottom, &bottom_policy);

    surface.into_image()
}

/// 300×300 preview: source fitted and centered on black, captions capped at two lines.
pub fn compose_thumbnail(
    source: Option<&RgbaImage>,
    top: &str,
    bottom: &str,
    glyphs: &GlyphSource,
) -> RgbaImage {
    let size = THUMBNAIL_SIZE;
    let mut surface = match source {
        Some(source) => {
            let mut surface = RasterSurface::new(size, size, glyphs.clone());
            surface.fill_rect(0.0, 0.0, size as f32, size as f32, Color::BLACK);
            let (w, h) = fit(source.width(), source.height(), size);
            surface.draw_image(
                source,
                (size - w) as f32 / 2.0,
                (size - h) as f32 / 2.0,
                w as f32,
                h as f32,
            );
            surface
        }
        None => placeholder(size, size, glyphs),
    };

    layout::draw_caption(
        &mut surface,
        top,
        TextBaseline::Top,
        &SizingPolicy::thumbnail(size, top),
    );
    layout::draw_caption(
        &mut surface,
        bottom,
        TextBaseline::Bottom,
        &SizingPolicy::thumbnail(size, bottom),
    );
    surface.into_image()
}

/// Neutral gray surface with a centered label.
pub fn placeholder(width: u32, height: u32, glyphs: &GlyphSource) -> RasterSurface {
    let mut surface = RasterSurface::new(width, height, glyphs.clone());
    let (w, h) = (width as f32, height as f32);
    surface.fill_rect(0.0, 0.0, w, h, Color::NEUTRAL_GRAY);

    let font_size = (w / PLACEHOLDER_LABEL.len() as f32).clamp(10.0, 24.0);
    let lines = [PLACEHOLDER_LABEL.to_string()];
    layout::draw_outlined_text(
        &mut surface,
        &lines,
        w / 2.0,
        (h - font_size) / 2.0,
        font_size,
        TextBaseline::Top,
    );
    surface
}

/// Encode an image as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, MemeError> {
    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| MemeError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(png_bytes)
}

/// Largest size with the source's aspect ratio that fits in a `bound` square.
fn fit(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (bound, bound);
    }
    let scale = (bound as f32 / width as f32).min(bound as f32 / height as f32);
    (
        ((width as f32 * scale).round() as u32).clamp(1, bound),
        ((height as f32 * scale).round() as u32).clamp(1, bound),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([30, 90, 160, 255]))
    }

    fn has_color(image: &RgbaImage, rgb: [u8; 3]) -> bool {
        image.pixels().any(|p| p.0[..3] == rgb)
    }

    #[test]
    fn test_full_render_keeps_source_size() {
        let out = compose_full(
            Some(&source(640, 480)),
            "top text",
            "bottom text",
            RenderSettings::default(),
            &GlyphSource::Bitmap,
        );
        assert_eq!(out.dimensions(), (640, 480));
        assert!(has_color(&out, [255, 255, 255]));
        assert!(has_color(&out, [0, 0, 0]));
        assert!(has_color(&out, [30, 90, 160]));
    }

    #[test]
    fn test_missing_source_renders_placeholder() {
        let out = compose_full(None, "a", "b", RenderSettings::default(), &GlyphSource::Bitmap);
        assert_eq!(out.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        assert!(has_color(&out, [128, 128, 128]));
        assert!(has_color(&out, [255, 255, 255]));
    }

    #[test]
    fn test_thumbnail_is_square() {
        let out = compose_thumbnail(Some(&source(1200, 600)), "a caption", "", &GlyphSource::Bitmap);
        assert_eq!(out.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
        // Letterboxed: the top rows are background, the middle is the image
        assert_eq!(out.get_pixel(150, 150).0, [30, 90, 160, 255]);

        let out = compose_thumbnail(None, "a", "b", &GlyphSource::Bitmap);
        assert_eq!(out.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit(1200, 600, 300), (300, 150));
        assert_eq!(fit(600, 1200, 300), (150, 300));
        assert_eq!(fit(100, 100, 300), (300, 300));
        assert_eq!(fit(0, 10, 300), (300, 300));
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&source(4, 4)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_image_cache_evicts_oldest() {
        let mut cache = ImageCache::default();
        let image =
            |shade: u8| DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([shade, 0, 0, 255])));

        cache.insert("a".to_string(), image(1), 2);
        cache.insert("b".to_string(), image(2), 2);
        cache.insert("a".to_string(), image(3), 2);
        assert_eq!(cache.len(), 2);

        cache.insert("c".to_string(), image(4), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert_eq!(cache.get("c").map(|i| i.to_rgba8().get_pixel(0, 0).0[0]), Some(4));
    }

    #[tokio::test]
    async fn test_unreachable_image_falls_back() {
        let renderer = MemeRenderer::new(GlyphSource::Bitmap).unwrap();
        let template = Template {
            id: "1".to_string(),
            name: "Nowhere".to_string(),
            image_url: "not a url".to_string(),
            width: 10,
            height: 10,
            native_box_count: 2,
        };
        let out = renderer
            .render(&template, "top", "bottom", RenderSettings::default())
            .await;
        assert_eq!(out.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));

        let thumbs = renderer
            .thumbnails(&[ThumbnailRequest {
                template: &template,
                top: "x",
                bottom: "y",
            }])
            .await;
        assert_eq!(thumbs.len(), 1);
        assert_eq!(renderer.cached_images().await, 0);
    }
}
