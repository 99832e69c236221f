//! Template catalog handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::super::state::AppState;
use super::{ApiError, api_error, png_response};
use crate::catalog::Template;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateList {
    pub fetched_at: DateTime<Utc>,
    pub templates: Vec<Template>,
}

/// GET /api/templates - The current catalog, in popularity order.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<TemplateList>, ApiError> {
    let catalog = state.catalog.get_templates().await.map_err(api_error)?;
    Ok(Json(TemplateList {
        fetched_at: catalog.fetched_at(),
        templates: catalog.templates().to_vec(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailQuery {
    #[serde(default)]
    pub top: String,
    #[serde(default)]
    pub bottom: String,
}

/// GET /api/templates/:id/thumbnail - 300×300 PNG preview with captions.
pub async fn thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<Response, ApiError> {
    let template = state.template(&id).await.map_err(api_error)?;
    let image = state
        .renderer
        .thumbnail(&template, &query.top, &query.bottom)
        .await;
    png_response(&image)
}
