//! # contract: seams between the analysis pipeline and its collaborators
//!
//! This module defines the two traits the pipeline and the HTTP handlers talk
//! through, and the plain data types that cross them:
//!
//! - [`RepositoryFetcher`]: lists a branch's files and fetches raw content
//!   (implemented for GitHub by [`crate::github::GithubFetcher`]).
//! - [`LlmClient`]: one chat-completion round trip
//!   (implemented by [`crate::llm::ChatClient`]).
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`. With the default
//! `test-export-mocks` feature the generated `MockRepositoryFetcher` and
//! `MockLlmClient` are public, so integration tests in this crate and in the
//! server crate can script upstream behaviour without a network.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, LlmError};

/// Branch used when a request does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// One branch of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepoRef {
    /// Parses an `owner/name` slug. Returns `None` unless both halves are non-empty.
    ///
    /// Everything after the first `/` is the name, so `a/b/c` yields owner `a`
    /// and name `b/c`; GitHub will reject that later with a 404.
    pub fn parse(slug: &str, branch: Option<&str>) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH);
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        })
    }

    /// `owner/name`, as shown to users and to the LLM.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Kind of an entry in a recursive tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule commits and anything GitHub adds later.
    #[serde(other)]
    Other,
}

/// A single entry of a repository listing. Immutable after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha: Option<String>,
}

impl FileEntry {
    /// Convenience constructor for a blob entry without size or sha.
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
            size: None,
            sha: None,
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// Repository metadata surfaced by `/repo/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message, in the shape both the browser client and the
/// completion endpoint use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Input of a single completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Sent as a leading system-role message when present.
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Source-hosting API used by the pipeline and `/repo/info`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Lists the blob entries of the branch's tree, recursively.
    async fn list_tree(&self, repo: &RepoRef) -> Result<Vec<FileEntry>, FetchError>;

    /// Fetches the raw text of one file. Any failure yields `None`.
    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Option<String>;

    /// Fetches repository metadata.
    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoMetadata, FetchError>;
}

/// Chat-completion endpoint.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the request and returns the first choice's text.
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// Model identifier reported by `/health`.
    fn model(&self) -> String;

    /// Whether an API key is configured; handlers refuse early without one.
    fn has_api_key(&self) -> bool;
}
