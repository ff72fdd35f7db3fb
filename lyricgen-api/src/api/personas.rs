//! Persona management endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use lyricgen_common::models::{Persona, PersonaInput};
use uuid::Uuid;

use super::{json_body, success, success_empty, ApiResponse};
use crate::db;
use crate::{ApiError, ApiResult, AppState};

const PERSONA_NOT_FOUND: &str = "Persona not found";
const DUPLICATE_NAME: &str = "A persona with the same name already exists";
const PERSONA_IN_USE: &str = "Persona is referenced by stored lyrics and cannot be deleted";

/// GET /api/personas
pub async fn list_personas(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Persona>>>> {
    Ok(success(db::personas::list_personas(&state.db).await?))
}

/// GET /api/personas/:id
pub async fn get_persona(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Persona>>> {
    let persona = db::personas::get_persona(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(PERSONA_NOT_FOUND.to_string()))?;
    Ok(success(persona))
}

/// POST /api/personas
pub async fn create_persona(
    State(state): State<AppState>,
    body: Result<Json<PersonaInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Persona>>> {
    let input = json_body(body)?;
    input.validate()?;

    if db::personas::name_taken(&state.db, &input.name, None).await? {
        return Err(ApiError::BadRequest(DUPLICATE_NAME.to_string()));
    }

    let persona = db::personas::insert_persona(&state.db, &input).await?;
    tracing::info!(persona_id = %persona.id, name = %persona.name, "Persona created");
    Ok(success(persona))
}

/// PUT /api/personas/:id
pub async fn update_persona(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<PersonaInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Persona>>> {
    let input = json_body(body)?;
    input.validate()?;

    if db::personas::name_taken(&state.db, &input.name, Some(id)).await? {
        return Err(ApiError::BadRequest(DUPLICATE_NAME.to_string()));
    }

    let persona = db::personas::update_persona(&state.db, id, &input)
        .await?
        .ok_or_else(|| ApiError::NotFound(PERSONA_NOT_FOUND.to_string()))?;
    Ok(success(persona))
}

/// DELETE /api/personas/:id
///
/// Refused while any stored lyrics reference the persona.
pub async fn delete_persona(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if db::lyrics::has_lyrics_for_persona(&state.db, id).await? {
        return Err(ApiError::BadRequest(PERSONA_IN_USE.to_string()));
    }

    if !db::personas::delete_persona(&state.db, id).await? {
        return Err(ApiError::NotFound(PERSONA_NOT_FOUND.to_string()));
    }

    tracing::info!(persona_id = %id, "Persona deleted");
    Ok(success_empty())
}

pub fn persona_routes() -> Router<AppState> {
    Router::new()
        .route("/api/personas", get(list_personas).post(create_persona))
        .route(
            "/api/personas/:id",
            get(get_persona).put(update_persona).delete(delete_persona),
        )
}
