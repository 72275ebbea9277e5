//! Chat HTTP handler.
//!
//! Endpoint:
//! - POST /api/chat - Run one turn on a new or existing session
//!
//! Always answers 200 with a [`ChatResponse`]; failures populate `error`
//! and, once a session was resolved, `session_id`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use tracing::{debug, warn};

use turnstile_types::chat::{ChatRequest, ChatResponse};
use turnstile_types::error::TurnError;

use crate::state::AppState;

/// Error text for a body that is not a JSON chat request.
pub const INVALID_JSON: &str = "Invalid JSON format";

/// POST /api/chat
///
/// The body is taken as raw bytes so a missing or wrong `Content-Type` and a
/// malformed body get the same JSON error instead of an extractor rejection.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Json<ChatResponse> {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected malformed chat request");
            return Json(ChatResponse::failure(INVALID_JSON, None));
        }
    };

    let outcome = state
        .gateway
        .handle_turn(
            &request.message,
            request.session_id.as_deref(),
            &state.turn_cancel,
        )
        .await;

    match outcome {
        Ok(turn) => Json(ChatResponse::reply(turn.reply, turn.session_id)),
        Err(TurnError::Validation(message)) => Json(ChatResponse::failure(message, None)),
        Err(err) => {
            warn!(
                session_id = err.session_id().unwrap_or_default(),
                error = %err,
                "Chat turn failed"
            );
            let session_id = err.session_id().map(str::to_string);
            Json(ChatResponse::failure(err.to_string(), session_id))
        }
    }
}
