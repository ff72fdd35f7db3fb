//! Lyrics history endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use lyricgen_common::models::{LyricsRecord, LyricsSummary, UpdateStatusRequest};
use uuid::Uuid;

use super::generate::{generate_lyrics, generate_lyrics_stream};
use super::{json_body, success, ApiResponse};
use crate::db;
use crate::{ApiError, ApiResult, AppState};

const LYRICS_NOT_FOUND: &str = "Lyrics not found";

/// GET /api/lyrics
pub async fn list_lyrics(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<LyricsSummary>>>> {
    let summaries = db::lyrics::list_lyrics(&state.db).await?;
    Ok(success(summaries))
}

/// GET /api/lyrics/:id
pub async fn get_lyrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<LyricsRecord>>> {
    let record = db::lyrics::get_lyrics(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(LYRICS_NOT_FOUND.to_string()))?;
    Ok(success(record))
}

/// PATCH /api/lyrics/:id
pub async fn update_lyrics_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<LyricsRecord>>> {
    let request = json_body(body)?;

    let record = db::lyrics::update_status(&state.db, id, request.status)
        .await?
        .ok_or_else(|| ApiError::NotFound(LYRICS_NOT_FOUND.to_string()))?;

    tracing::info!(lyrics_id = %id, status = request.status.as_str(), "Lyrics status updated");
    Ok(success(record))
}

/// Build lyrics routes (history and generation)
pub fn lyrics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lyrics", get(list_lyrics).post(generate_lyrics))
        .route("/api/lyrics/stream", post(generate_lyrics_stream))
        .route("/api/lyrics/:id", get(get_lyrics).patch(update_lyrics_status))
}
