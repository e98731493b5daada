use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use repoai_core::contract::RepoMetadata;
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RepoInfoBody {
    #[serde(default)]
    pub repo: String,
}

pub async fn info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RepoInfoBody>, JsonRejection>,
) -> Result<Json<RepoMetadata>, ApiError> {
    let Json(body) = payload?;
    let (owner, name) = body
        .repo
        .trim()
        .split_once('/')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Invalid repo format".to_string()))?;

    let metadata = state.fetcher.repo_info(owner, name).await?;
    Ok(Json(metadata))
}
