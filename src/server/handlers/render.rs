//! Full-size render handler.

use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use std::sync::Arc;

use super::super::state::AppState;
use super::{ApiError, api_error, png_response};
use crate::layout::RenderSettings;

/// Request body for POST /api/render.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub template_id: String,
    #[serde(default)]
    pub top_text: String,
    #[serde(default)]
    pub bottom_text: String,
    #[serde(default)]
    pub settings: Option<RenderSettings>,
}

/// POST /api/render - Render the captioned template as PNG.
pub async fn render(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, ApiError> {
    let template = state
        .template(&request.template_id)
        .await
        .map_err(api_error)?;
    let image = state
        .renderer
        .render(
            &template,
            &request.top_text,
            &request.bottom_text,
            request.settings.unwrap_or_default(),
        )
        .await;
    png_response(&image)
}
