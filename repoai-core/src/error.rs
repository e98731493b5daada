//! Error types shared by the core components.
//!
//! Each collaborator gets its own enum so callers can tell a missing
//! repository apart from a flaky network, and a missing file apart from a
//! refused delete. The HTTP crate maps these onto status codes.

use thiserror::Error;

/// Failures talking to the source-hosting API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The repository, branch or tree does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status.
    #[error("GitHub returned {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Failures talking to the chat-completion endpoint.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key not set")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Network(String),

    #[error("LLM endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM response contained no choices")]
    EmptyResponse,

    #[error("could not decode LLM response: {0}")]
    Decode(String),
}

/// Failures of the workspace file passthroughs.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl WorkspaceError {
    /// Maps an I/O error for `path`, turning `ErrorKind::NotFound` into [`WorkspaceError::NotFound`].
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            WorkspaceError::NotFound(path.display().to_string())
        } else {
            WorkspaceError::Io(err)
        }
    }
}
