//! HTTP handlers for the server.

pub mod caption;
pub mod matching;
pub mod render;
pub mod templates;

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use image::RgbaImage;

use crate::error::MemeError;

/// Status code plus `{ "success": false, "error": ... }` body.
pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn status_for(error: &MemeError) -> StatusCode {
    match error {
        MemeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MemeError::Catalog(_) | MemeError::Transport(_) => StatusCode::BAD_GATEWAY,
        MemeError::UnknownTemplate(_) => StatusCode::NOT_FOUND,
        MemeError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(error: MemeError) -> ApiError {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::warn!(error = %error, "request failed");
    }
    (
        status,
        Json(serde_json::json!({"success": false, "error": error.to_string()})),
    )
}

fn png_response(image: &RgbaImage) -> Result<Response, ApiError> {
    let png_bytes = crate::render::encode_png(image).map_err(api_error)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png_bytes).into_response())
}
