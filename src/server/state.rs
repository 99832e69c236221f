//! Server state and construction from configuration.

use std::sync::Arc;

use crate::caption::Captioner;
use crate::catalog::{CatalogCache, HttpTemplateSource, Template};
use crate::config::Config;
use crate::error::MemeError;
use crate::generation::OpenAiGenerator;
use crate::layout::GlyphSource;
use crate::matching::MatchOrchestrator;
use crate::render::MemeRenderer;

/// Application state shared across handlers (and used directly by the CLI).
pub struct AppState {
    pub catalog: Arc<CatalogCache>,
    pub orchestrator: MatchOrchestrator,
    pub renderer: MemeRenderer,
    pub captioner: Captioner,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogCache>,
        orchestrator: MatchOrchestrator,
        renderer: MemeRenderer,
        captioner: Captioner,
    ) -> Self {
        Self {
            catalog,
            orchestrator,
            renderer,
            captioner,
        }
    }

    /// Wire up the production collaborators.
    pub fn from_config(config: &Config) -> Result<Self, MemeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("memesmith/", env!("CARGO_PKG_VERSION")))
            .timeout(config.generation.timeout)
            .build()
            .map_err(|e| MemeError::Config(format!("HTTP client error: {}", e)))?;

        if config.generation.api_key.is_none() {
            tracing::warn!("MEMESMITH_API_KEY is not set; matches will use fallback templates");
        }

        let catalog = Arc::new(CatalogCache::new(
            HttpTemplateSource::new(client.clone(), config.catalog_url.clone()),
            config.catalog_ttl,
        ));
        let generator = Arc::new(OpenAiGenerator::new(config.generation.clone())?);
        let orchestrator = MatchOrchestrator::new(generator, catalog.clone());

        let glyphs = GlyphSource::load(config.font_path.as_deref())?;
        let renderer = MemeRenderer::with_client(client.clone(), glyphs);
        let captioner = Captioner::new(client, config.caption_url.clone(), config.captioning.clone());

        Ok(Self::new(catalog, orchestrator, renderer, captioner))
    }

    /// Look up one template in the current catalog.
    pub async fn template(&self, id: &str) -> Result<Template, MemeError> {
        let catalog = self.catalog.get_templates().await?;
        catalog
            .get(id)
            .cloned()
            .ok_or_else(|| MemeError::UnknownTemplate(id.to_string()))
    }
}
