//! Workspace file passthroughs: tree, read, write, delete and AI-assisted writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require_llm, required};
use crate::error::ApiError;
use crate::server::AppState;

fn default_depth() -> usize {
    2
}

#[derive(Debug, Deserialize)]
pub struct TreeBody {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_depth")]
    pub depth: usize,
}

#[derive(Debug, Deserialize)]
pub struct PathBody {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteBody {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AiWriteBody {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub apply: bool,
}

pub async fn tree(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TreeBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let path = body
        .path
        .unwrap_or_else(|| state.workspace.root().to_path_buf());
    let lines = state.workspace.tree(&path, body.depth).await?;
    Ok(Json(json!({ "tree": lines, "path": path.display().to_string() })))
}

pub async fn read(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PathBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let path = required(&body.path, "No path provided")?;
    let file = state.workspace.read_file(Path::new(&path)).await?;
    Ok(Json(json!({
        "content": file.content,
        "path": path,
        "size": file.size,
    })))
}

pub async fn write(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WriteBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let path = required(&body.path, "No path provided")?;
    let size = state
        .workspace
        .write_file(Path::new(&path), &body.content)
        .await?;
    Ok(Json(json!({ "success": true, "path": path, "size": size })))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PathBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let path = required(&body.path, "No path provided")?;
    state.workspace.delete_file(Path::new(&path)).await?;
    Ok(Json(json!({ "success": true, "path": path })))
}

/// Generates new file content from an instruction. Only writes when `apply`
/// is set; a preview also returns the original content for diffing.
pub async fn ai_write(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AiWriteBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let missing = "Both path and instruction required";
    let path = required(&body.path, missing)?;
    let instruction = required(&body.instruction, missing)?;
    require_llm(&state)?;

    let result = state
        .workspace
        .ai_write(state.llm.as_ref(), Path::new(&path), &instruction, body.apply)
        .await?;

    let mut reply = json!({
        "success": true,
        "path": path,
        "content": result.content,
        "applied": result.applied,
    });
    if !result.applied {
        reply["original"] = json!(result.original);
    }
    Ok(Json(reply))
}
