//! `/analyze`: runs one pipeline session and streams its events as SSE.
//!
//! Each [`PipelineEvent`] becomes one `data: <json>\n\n` frame. The response
//! body owns the session's receiver, so a client that disconnects drops it
//! and the session stops at its next emit.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use repoai_core::contract::RepoRef;
use repoai_core::pipeline::{AnalysisRequest, PipelineEvent};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use super::{default_true, require_llm};
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Falls back to the configured default; 0 means no cap.
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub summary: bool,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let repo = RepoRef::parse(&body.repo, body.branch.as_deref())
        .ok_or_else(|| ApiError::Validation("Use owner/repo format".to_string()))?;
    require_llm(&state)?;

    info!(repo = %repo.full_name(), branch = %repo.branch, "[ANALYZE] Opening event stream");
    let events = state.pipeline.spawn(AnalysisRequest {
        repo,
        max_files: body.max_files,
        extensions: body.extensions,
        summary: body.summary,
    });

    let stream = ReceiverStream::new(events).map(|event| Ok::<_, Infallible>(sse_frame(&event)));

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    Ok(response)
}

/// Encodes one event as an SSE `data:` frame.
pub fn sse_frame(event: &PipelineEvent) -> Bytes {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "[ANALYZE][ERROR] Failed to encode event");
            r#"{"type":"error","message":"Failed to encode event"}"#.to_string()
        }
    };
    Bytes::from(format!("data: {json}\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_data_lines_with_blank_separator() {
        let frame = sse_frame(&PipelineEvent::Done { total_analyzed: 3 });
        assert_eq!(
            frame,
            Bytes::from_static(b"data: {\"type\":\"done\",\"total_analyzed\":3}\n\n")
        );
    }
}
