//! Match handler.

use axum::{Json, extract::State};
use std::sync::Arc;

use super::super::state::AppState;
use super::{ApiError, api_error};
use crate::matching::{MatchRequest, MatchResult};

/// POST /api/match - Suggest templates and captions for a tweet.
pub async fn run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResult>, ApiError> {
    state
        .orchestrator
        .match_tweet(&request)
        .await
        .map(Json)
        .map_err(api_error)
}
