//! Static information endpoints.
//!
//! Endpoints:
//! - GET /          - Service and endpoint catalogue
//! - GET /health    - Liveness check, plain `OK`
//! - GET /api/tools - How tool access works, plus the tool backend URL

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// Service name reported by the catalogue.
pub const SERVICE_NAME: &str = "Turnstile Agent Gateway";

/// GET / - describe the service, its endpoints, and the agent behind it.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chat": {
                "path": "/api/chat",
                "method": "POST",
                "description": "Send a message to the agent",
                "example": {
                    "message": "Hello, how can you help me?",
                    "session_id": "optional-session-id",
                },
            },
            "health": {
                "path": "/health",
                "method": "GET",
                "description": "Health check endpoint",
            },
            "tools": {
                "path": "/api/tools",
                "method": "GET",
                "description": "List available MCP tools",
            },
        },
        "agent": {
            "name": state.gateway.engine_name(),
            "description": &*state.agent_description,
        },
    }))
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// GET /api/tools - tools are discovered by asking the agent, not listed here.
pub async fn tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "MCP tools are available through the agent",
        "note": "To see available tools, ask the agent 'What tools do you have available?' in a chat message",
        "mcp_endpoint": &*state.mcp_endpoint,
    }))
}
