//! One handler module per endpoint family. Handlers validate input, check
//! credentials, call into `repoai_core`, and shape the JSON reply.

pub mod analyze;
pub mod chat;
pub mod files;
pub mod health;
pub mod repo;
pub mod terminal;

use crate::error::ApiError;
use crate::server::AppState;

/// Trims `value`, failing with `message` when nothing is left.
pub(crate) fn required(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Refuses LLM-backed requests up front when no API key is configured.
pub(crate) fn require_llm(state: &AppState) -> Result<(), ApiError> {
    if state.llm.has_api_key() {
        Ok(())
    } else {
        Err(ApiError::MissingCredential)
    }
}

pub(crate) fn default_true() -> bool {
    true
}
