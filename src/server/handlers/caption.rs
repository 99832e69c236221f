//! Remote captioning handler.

use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::super::state::AppState;
use super::{ApiError, api_error};
use crate::caption::CaptionedImage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub template_id: String,
    #[serde(default)]
    pub top_text: String,
    #[serde(default)]
    pub bottom_text: String,
}

/// POST /api/caption - Caption through imgflip and return the hosted URL.
pub async fn caption(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptionRequest>,
) -> Result<Json<CaptionedImage>, ApiError> {
    state
        .captioner
        .caption(&request.template_id, &request.top_text, &request.bottom_text)
        .await
        .map(Json)
        .map_err(api_error)
}
