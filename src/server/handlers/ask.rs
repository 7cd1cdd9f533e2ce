use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::pipeline::{AnswerStatus, FailureKind};
use crate::scrape::ScrapeTarget;
use crate::session::resolve_session_id;
use crate::state::AppState;

pub const SCRAPE_SET_MESSAGE: &str = "Scraping URL set successfully.";
pub const INVALID_URL_MESSAGE: &str = "Invalid or missing URL.";
pub const NO_TARGET_MESSAGE: &str = "No URL has been scraped yet.";
pub const INVALID_QUESTION_MESSAGE: &str = "Invalid or missing question.";
pub const GENERATION_TIMEOUT_MESSAGE: &str = "Answer generation failed.";

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Bodies are parsed leniently: anything that is not a JSON object behaves
/// like an empty one, so field validation decides the response.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}))
}

fn session_from(payload: &Value) -> String {
    resolve_session_id(payload.get("session_id").and_then(|v| v.as_str()))
}

pub async fn scrape_url(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_body(&body);
    let session_id = session_from(&payload);

    let target = payload
        .get("url")
        .and_then(|v| v.as_str())
        .and_then(|raw| ScrapeTarget::parse(raw.trim()).ok())
        .ok_or_else(|| ApiError::BadRequest(INVALID_URL_MESSAGE.to_string()))?;

    if let Some(previous) = state.sessions.set_target(&session_id, target.clone()).await {
        tracing::debug!("Session {} replaced target {}", session_id, previous);
    }
    tracing::info!("Session {} will answer from {}", session_id, target);

    Ok(Json(json!({
        "message": SCRAPE_SET_MESSAGE,
        "session_id": session_id
    })))
}

pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_body(&body);
    let session_id = session_from(&payload);

    let target = state
        .sessions
        .target(&session_id)
        .await
        .ok_or_else(|| ApiError::BadRequest(NO_TARGET_MESSAGE.to_string()))?;

    let question = payload
        .get("question")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest(INVALID_QUESTION_MESSAGE.to_string()))?;

    let timeout = state.settings.app.request_timeout();
    let outcome = tokio::time::timeout(
        timeout,
        state.pipeline.answer_from_web(&session_id, &target, question),
    )
    .await
    .map_err(|_| {
        tracing::error!(
            "Answer for session {} exceeded {}s",
            session_id,
            timeout.as_secs()
        );
        ApiError::upstream(
            GENERATION_TIMEOUT_MESSAGE,
            format!("request timed out after {}s", timeout.as_secs()),
        )
    })?;

    Ok(Json(AskResponse {
        answer: outcome.message().to_string(),
        status: outcome.status(),
        failure: outcome.failure_kind(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_bodies_parse_as_empty() {
        assert_eq!(parse_body(&Bytes::from_static(b"not json")), json!({}));
        assert_eq!(parse_body(&Bytes::from_static(b"[1, 2]")), json!({}));
        assert_eq!(parse_body(&Bytes::new()), json!({}));
    }

    #[test]
    fn session_defaults_when_absent_or_blank() {
        assert_eq!(session_from(&json!({})), "default");
        assert_eq!(session_from(&json!({ "session_id": "  " })), "default");
        assert_eq!(session_from(&json!({ "session_id": 7 })), "default");
        assert_eq!(session_from(&json!({ "session_id": "tab-2" })), "tab-2");
    }
}
