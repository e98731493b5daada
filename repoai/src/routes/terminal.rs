use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repoai_core::executor::CommandOutput;
use repoai_core::prompts::{self, COMMAND_REFUSAL_PREFIX};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{default_true, require_llm, required};
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RunBody {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AiBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Preview the generated command instead of running it.
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub output: CommandOutput,
    pub command: String,
    pub cwd: String,
}

pub async fn run(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunBody>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(body) = payload?;
    let command = required(&body.command, "No command provided")?;
    let cwd = body
        .cwd
        .unwrap_or_else(|| state.executor.default_cwd().to_path_buf());

    let output = state.executor.run(&command, Some(&cwd)).await;
    Ok(Json(RunResponse {
        output,
        command,
        cwd: cwd.display().to_string(),
    }))
}

/// Turns a plain-English prompt into a shell command, previewing it by default.
pub async fn ai(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AiBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let prompt = required(&body.prompt, "No prompt provided")?;
    require_llm(&state)?;
    let cwd = body
        .cwd
        .unwrap_or_else(|| state.executor.default_cwd().to_path_buf());

    let command = prompts::shell_command(state.llm.as_ref(), &prompt, &cwd).await?;
    if command.starts_with(COMMAND_REFUSAL_PREFIX) {
        warn!(reply = %command, "[TERMINAL] Model refused to produce a command");
        return Err(ApiError::Validation(command));
    }
    info!(command = %command, dry_run = body.dry_run, "[TERMINAL] Generated command");

    if body.dry_run {
        let preview = json!({
            "command": command,
            "dry_run": true,
            "cwd": cwd.display().to_string(),
        });
        return Ok(Json(preview).into_response());
    }

    let output = state.executor.run(&command, Some(&cwd)).await;
    Ok(Json(RunResponse {
        output,
        command,
        cwd: cwd.display().to_string(),
    })
    .into_response())
}
