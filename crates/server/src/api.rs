//! Chat API surface.
//!
//! `POST /api/chat` — run one conversation turn: `{ message, session_id }`
//! in, `{ reply, handler_used }` out. Handler failures have already degraded
//! into textual replies inside the engine; only persistence failures surface
//! as 500s here.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use switchboard_agent::TurnEngine;
use switchboard_core::TurnError;

#[derive(Clone)]
pub struct ApiState {
    engine: Arc<TurnEngine>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub handler_used: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn router(engine: Arc<TurnEngine>) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(ApiState { engine })
}

pub async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ApiError>)> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError { error: "message must not be empty".to_string() }),
        ));
    }
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError { error: "session_id must not be empty".to_string() }),
        ));
    }

    let outcome = state.engine.run_turn(session_id, message).await.map_err(turn_error)?;

    info!(
        event_name = "api.chat.completed",
        session_id,
        handler_used = outcome.handler_used.as_str(),
        "chat turn served"
    );

    Ok(Json(ChatResponse { reply: outcome.reply, handler_used: outcome.handler_used.as_str() }))
}

fn turn_error(error: TurnError) -> (StatusCode, Json<ApiError>) {
    error!(event_name = "api.chat.turn_failed", error = %error, "turn aborted");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error: error.user_message().to_string() }))
}
