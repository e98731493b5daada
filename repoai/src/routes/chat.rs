use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use repoai_core::contract::ChatMessage;
use repoai_core::prompts;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::require_llm;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    if body.messages.is_empty() {
        return Err(ApiError::Validation("No messages provided".to_string()));
    }
    require_llm(&state)?;

    info!(messages = body.messages.len(), "[CHAT] Forwarding conversation");
    let reply = prompts::chat(state.llm.as_ref(), body.messages).await?;
    Ok(Json(json!({ "reply": reply })))
}
