//! Base rule endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use lyricgen_common::models::{Rule, RuleInput};

use super::{json_body, success, ApiResponse};
use crate::db;
use crate::services::prompt_builder::DEFAULT_BASE_RULE;
use crate::{ApiResult, AppState};

/// GET /api/rule
///
/// Creates the default rule on first access.
pub async fn get_rule(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Rule>>> {
    let rule = match db::rules::get_rule(&state.db).await? {
        Some(rule) => rule,
        None => {
            tracing::info!("No base rule stored, creating default");
            db::rules::upsert_rule(&state.db, DEFAULT_BASE_RULE).await?
        }
    };
    Ok(success(rule))
}

/// PUT /api/rule
pub async fn update_rule(
    State(state): State<AppState>,
    body: Result<Json<RuleInput>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Rule>>> {
    let input = json_body(body)?;
    input.validate()?;

    let rule = db::rules::upsert_rule(&state.db, &input.prompt).await?;
    tracing::info!(chars = input.prompt.chars().count(), "Base rule updated");
    Ok(success(rule))
}

pub fn rule_routes() -> Router<AppState> {
    Router::new().route("/api/rule", get(get_rule).put(update_rule))
}
