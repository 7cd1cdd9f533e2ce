use std::sync::Arc;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;
use crate::core::errors::ApiError;

const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn get_session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.settings.memory.history_limit)
        .clamp(1, MAX_LIMIT);
    let turns = state
        .memory
        .recent_chat_turns(&session_id, limit)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({
        "session_id": session_id,
        "turns": turns
    })))
}

pub async fn get_session_memory(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.memory.limits().summary_limit;
    let summaries = state
        .memory
        .recent_summaries(&session_id, limit)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({
        "session_id": session_id,
        "summaries": summaries
    })))
}
