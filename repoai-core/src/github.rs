//! Repository Fetcher backed by the GitHub REST API and the raw content host.
//!
//! - [`GithubFetcher::list_tree`] resolves branch → commit → tree and returns
//!   the blob entries of the recursive listing.
//! - [`GithubFetcher::fetch_file`] downloads one file's raw text and swallows
//!   every failure into `None`, so the pipeline can skip the file.
//! - [`GithubFetcher::repo_info`] backs the `/repo/info` endpoint.
//!
//! Outbound HTTP only; nothing is cached or written locally.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::GithubSettings;
use crate::contract::{FileEntry, RepoMetadata, RepoRef, RepositoryFetcher};
use crate::error::FetchError;

const API_TIMEOUT: Duration = Duration::from_secs(10);
const RAW_TIMEOUT: Duration = Duration::from_secs(15);

pub struct GithubFetcher {
    client: Client,
    settings: GithubSettings,
}

#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    tree: TreeRef,
}

#[derive(Deserialize)]
struct TreeRef {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<FileEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct RepoResponse {
    full_name: Option<String>,
    description: Option<String>,
    language: Option<String>,
    stargazers_count: Option<u64>,
    forks_count: Option<u64>,
    default_branch: Option<String>,
}

impl From<RepoResponse> for RepoMetadata {
    fn from(r: RepoResponse) -> Self {
        RepoMetadata {
            name: r.full_name,
            description: r.description,
            language: r.language,
            stars: r.stargazers_count,
            forks: r.forks_count,
            default_branch: r.default_branch,
        }
    }
}

impl GithubFetcher {
    pub fn new(settings: GithubSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .default_headers(default_headers(settings.token.as_deref()))
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build GitHub HTTP client");
                FetchError::Network(e.to_string())
            })?;
        info!(
            api_base = %settings.api_base,
            token_set = settings.token.is_some(),
            "Initialized GithubFetcher"
        );
        Ok(Self { client, settings })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base.trim_end_matches('/'), path)
    }

    fn branch_url(&self, repo: &RepoRef) -> String {
        self.api_url(&format!(
            "/repos/{}/{}/branches/{}",
            repo.owner, repo.name, repo.branch
        ))
    }

    fn tree_url(&self, repo: &RepoRef, sha: &str) -> String {
        self.api_url(&format!(
            "/repos/{}/{}/git/trees/{}?recursive=1",
            repo.owner, repo.name, sha
        ))
    }

    fn raw_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.settings.raw_base.trim_end_matches('/'),
            repo.owner,
            repo.name,
            repo.branch,
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url = %url, "GitHub API request");
        let resp = self
            .client
            .get(url)
            .timeout(API_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "GitHub request failed");
                FetchError::Network(e.to_string())
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            warn!(url = %url, "GitHub returned 404");
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "GitHub API returned error. Response body: {body}");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<T>().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to decode GitHub response");
            FetchError::Decode(e.to_string())
        })
    }
}

fn default_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("repoai"));
    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = ?e, "GitHub token is not a valid header value, sending requests unauthenticated"),
        }
    }
    headers
}

#[async_trait]
impl RepositoryFetcher for GithubFetcher {
    async fn list_tree(&self, repo: &RepoRef) -> Result<Vec<FileEntry>, FetchError> {
        let branch: BranchResponse = self.get_json(&self.branch_url(repo)).await?;
        let sha = branch.commit.commit.tree.sha;
        debug!(repo = %repo.full_name(), branch = %repo.branch, tree_sha = %sha, "Resolved branch to tree");

        let tree: TreeResponse = self.get_json(&self.tree_url(repo, &sha)).await?;
        if tree.truncated {
            warn!(repo = %repo.full_name(), "GitHub truncated the recursive tree listing");
        }
        let blobs: Vec<FileEntry> = tree.tree.into_iter().filter(FileEntry::is_blob).collect();
        info!(repo = %repo.full_name(), branch = %repo.branch, blobs = blobs.len(), "Listed repository tree");
        Ok(blobs)
    }

    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Option<String> {
        let url = self.raw_url(repo, path);
        let resp = match self.client.get(&url).timeout(RAW_TIMEOUT).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = ?e, url = %url, "Raw file fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), url = %url, "Raw file fetch returned error status");
            return None;
        }
        match resp.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = ?e, url = %url, "Raw file body could not be read");
                None
            }
        }
    }

    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoMetadata, FetchError> {
        let url = self.api_url(&format!("/repos/{owner}/{name}"));
        let repo: RepoResponse = self.get_json(&url).await?;
        Ok(repo.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(api_base: &str, raw_base: &str) -> GithubFetcher {
        GithubFetcher::new(GithubSettings {
            token: None,
            api_base: api_base.into(),
            raw_base: raw_base.into(),
        })
        .unwrap()
    }

    fn repo() -> RepoRef {
        RepoRef::parse("octo/hello", Some("dev")).unwrap()
    }

    #[test]
    fn builds_api_urls() {
        let f = fetcher("https://api.github.com/", "https://raw.githubusercontent.com");
        assert_eq!(
            f.branch_url(&repo()),
            "https://api.github.com/repos/octo/hello/branches/dev"
        );
        assert_eq!(
            f.tree_url(&repo(), "abc123"),
            "https://api.github.com/repos/octo/hello/git/trees/abc123?recursive=1"
        );
    }

    #[test]
    fn builds_raw_urls() {
        let f = fetcher("https://api.github.com", "https://raw.githubusercontent.com/");
        assert_eq!(
            f.raw_url(&repo(), "src/main.rs"),
            "https://raw.githubusercontent.com/octo/hello/dev/src/main.rs"
        );
    }

    #[test]
    fn token_is_sent_as_bearer() {
        let headers = default_headers(Some("ghp_abc"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer ghp_abc");
        assert!(default_headers(None).get(AUTHORIZATION).is_none());
    }

    #[test]
    fn decodes_branch_and_repo_payloads() {
        let branch: BranchResponse = serde_json::from_str(
            r#"{"name": "main", "commit": {"sha": "c", "commit": {"tree": {"sha": "tree-sha"}}}}"#,
        )
        .unwrap();
        assert_eq!(branch.commit.commit.tree.sha, "tree-sha");

        let repo: RepoResponse = serde_json::from_str(
            r#"{"full_name": "octo/hello", "description": null, "language": "Rust",
                "stargazers_count": 3, "forks_count": 1, "default_branch": "main"}"#,
        )
        .unwrap();
        let meta: RepoMetadata = repo.into();
        assert_eq!(meta.name.as_deref(), Some("octo/hello"));
        assert_eq!(meta.stars, Some(3));
    }
}
