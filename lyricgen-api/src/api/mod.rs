//! HTTP API handlers for lyricgen-api
//!
//! Every JSON response uses the envelope `{ "success": true, "data": ... }`;
//! failures go through [`crate::ApiError`].

pub mod generate;
pub mod health;
pub mod lyrics;
pub mod personas;
pub mod rule;

pub use health::health_routes;
pub use lyrics::lyrics_routes;
pub use personas::persona_routes;
pub use rule::rule_routes;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Serialize;

use crate::{ApiError, ApiResult};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
    })
}

/// Envelope without a payload
pub fn success_empty() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
    })
}

/// Unwrap a JSON body, reporting malformed input as 400
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
