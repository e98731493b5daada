use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::server::AppState;

/// Liveness plus credential presence. Never reveals the credentials.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llm_api_key": state.llm.has_api_key(),
        "github_token": state.settings.github.token.is_some(),
        "workspace": state.workspace.root().display().to_string(),
        "model": state.llm.model(),
    }))
}
