//! Streaming analysis pipeline: list → filter → review each file → summarise.
//!
//! One [`AnalysisPipeline::spawn`] call is one *session*. The session runs in
//! its own task and reports every state transition as a [`PipelineEvent`] on a
//! bounded channel of capacity one, so events reach the caller in order and
//! are never buffered beyond a single event.
//!
//! # States
//! 1. Scanning: `status`, then the repository listing. A listing failure emits
//!    one `error` and ends the session.
//! 2. Filtering: `status` with the survivor count. No survivors emits one
//!    `error` and ends the session.
//! 3. Per-file loop, strictly sequential: `progress`, fetch, size check,
//!    review. Every per-file failure becomes a `file_skip` and the loop
//!    carries on. A fixed delay follows each file that reached the LLM.
//! 4. Summarising (optional): `status`, then `summary`, or `error` if the
//!    summary call fails; the session still finishes.
//! 5. Done: `done` with the number of files analysed.
//!
//! # Cancellation
//! When the receiver is dropped (the HTTP client went away) the next send
//! fails and the session stops without further upstream calls.
//!
//! # Session boundary
//! A panic inside a session is caught by the supervising task and turned into
//! a single `error` event; it never reaches the host process.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AnalysisSettings;
use crate::contract::{LlmClient, RepoRef, RepositoryFetcher};
use crate::filter::FileFilter;
use crate::prompts;

pub const SKIP_FETCH_FAILED: &str = "fetch failed";
pub const SKIP_TOO_LARGE: &str = "too large";

/// One event of a session, serialised with a `type` tag for the SSE stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Status {
        message: String,
    },
    Progress {
        current: usize,
        total: usize,
        file: String,
    },
    FileResult {
        file: String,
        analysis: String,
    },
    FileSkip {
        file: String,
        reason: String,
    },
    Summary {
        summary: String,
    },
    Error {
        message: String,
    },
    Done {
        total_analyzed: usize,
    },
}

/// Parameters of one session.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub repo: RepoRef,
    /// `None` uses the configured default; `Some(0)` means no cap.
    pub max_files: Option<usize>,
    /// Empty means the default extension set.
    pub extensions: Vec<String>,
    pub summary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAnalysis {
    pub path: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionOutcome {
    /// `done` was emitted.
    Completed,
    /// An `error` ended the session before the per-file loop.
    Aborted(String),
    /// The receiver went away.
    #[default]
    Disconnected,
}

/// What a session produced, for in-process callers.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub analyses: Vec<FileAnalysis>,
    pub skipped: Vec<SkippedFile>,
    pub summary: Option<String>,
    pub outcome: SessionOutcome,
}

/// The receiving side of a session's channel is gone.
#[derive(Debug)]
struct Disconnected;

struct EventSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl EventSink {
    async fn emit(&self, event: PipelineEvent) -> Result<(), Disconnected> {
        debug!(?event, "[ANALYZE] Emitting event");
        self.tx.send(event).await.map_err(|_| Disconnected)
    }
}

#[derive(Clone)]
pub struct AnalysisPipeline {
    fetcher: Arc<dyn RepositoryFetcher>,
    llm: Arc<dyn LlmClient>,
    settings: AnalysisSettings,
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: Arc<dyn RepositoryFetcher>,
        llm: Arc<dyn LlmClient>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            fetcher,
            llm,
            settings,
        }
    }

    /// Starts a session in the background and returns its event stream.
    pub fn spawn(&self, request: AnalysisRequest) -> mpsc::Receiver<PipelineEvent> {
        let (tx, rx) = mpsc::channel(1);
        let boundary_tx = tx.clone();
        let pipeline = self.clone();
        let session_id = Uuid::new_v4();
        let span = info_span!(
            "analysis",
            session_id = %session_id,
            repo = %request.repo.full_name(),
            branch = %request.repo.branch
        );

        let session = tokio::spawn(
            async move { pipeline.run(request, tx).await }.instrument(span.clone()),
        );
        tokio::spawn(
            async move {
                match session.await {
                    Ok(report) => {
                        info!(
                            analyzed = report.analyses.len(),
                            skipped = report.skipped.len(),
                            outcome = ?report.outcome,
                            "[ANALYZE] Session finished"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "[ANALYZE][ERROR] Session task failed");
                        let _ = boundary_tx
                            .send(PipelineEvent::Error {
                                message: format!("Internal error: {e}"),
                            })
                            .await;
                    }
                }
            }
            .instrument(span),
        );
        rx
    }

    /// Runs one session to completion on the current task, emitting into `tx`.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> AnalysisReport {
        let sink = EventSink { tx };
        let mut report = AnalysisReport::default();
        if self.drive(&request, &sink, &mut report).await.is_err() {
            warn!("[ANALYZE] Receiver dropped, stopping session");
            report.outcome = SessionOutcome::Disconnected;
        }
        report
    }

    async fn drive(
        &self,
        request: &AnalysisRequest,
        sink: &EventSink,
        report: &mut AnalysisReport,
    ) -> Result<(), Disconnected> {
        let repo = &request.repo;
        let repo_name = repo.full_name();
        info!("[ANALYZE] Starting analysis session");

        // Scanning
        sink.emit(PipelineEvent::Status {
            message: format!("Scanning {} ({})...", repo_name, repo.branch),
        })
        .await?;
        let tree = match self.fetcher.list_tree(repo).await {
            Ok(tree) => tree,
            Err(e) => {
                error!(error = %e, "[ANALYZE][ERROR] Repository listing failed");
                let message = format!("GitHub error: {e}");
                report.outcome = SessionOutcome::Aborted(message.clone());
                sink.emit(PipelineEvent::Error { message }).await?;
                return Ok(());
            }
        };

        // Filtering
        let filter = FileFilter::default()
            .with_extensions(&request.extensions)
            .with_max_files(Some(
                request.max_files.unwrap_or(self.settings.default_max_files),
            ));
        let files = filter.apply(&tree);
        info!(listed = tree.len(), selected = files.len(), "[ANALYZE] Filtered repository listing");
        sink.emit(PipelineEvent::Status {
            message: format!("{} files to analyze", files.len()),
        })
        .await?;
        if files.is_empty() {
            let message = "No matching files found.".to_string();
            report.outcome = SessionOutcome::Aborted(message.clone());
            sink.emit(PipelineEvent::Error { message }).await?;
            return Ok(());
        }

        // Per-file loop
        let total = files.len();
        for (idx, path) in files.iter().enumerate() {
            sink.emit(PipelineEvent::Progress {
                current: idx + 1,
                total,
                file: path.clone(),
            })
            .await?;

            let content = match self.fetcher.fetch_file(repo, path).await {
                Some(content) if !content.is_empty() => content,
                _ => {
                    warn!(file = %path, "[ANALYZE] Could not fetch file, skipping");
                    self.skip(sink, report, path, SKIP_FETCH_FAILED).await?;
                    continue;
                }
            };

            let chars = content.chars().count();
            if chars > self.settings.max_file_chars {
                warn!(file = %path, chars, "[ANALYZE] File too large, skipping");
                self.skip(sink, report, path, SKIP_TOO_LARGE).await?;
                continue;
            }

            match prompts::review_file(self.llm.as_ref(), &repo_name, path, &content).await {
                Ok(analysis) => {
                    info!(file = %path, "[ANALYZE] File analysed");
                    report.analyses.push(FileAnalysis {
                        path: path.clone(),
                        analysis: analysis.clone(),
                    });
                    sink.emit(PipelineEvent::FileResult {
                        file: path.clone(),
                        analysis,
                    })
                    .await?;
                }
                Err(e) => {
                    error!(file = %path, error = %e, "[ANALYZE][ERROR] Review failed, skipping");
                    self.skip(sink, report, path, &e.to_string()).await?;
                }
            }

            if idx + 1 < total && !self.settings.file_delay().is_zero() {
                tokio::time::sleep(self.settings.file_delay()).await;
            }
        }

        // Summarising
        if request.summary && !report.analyses.is_empty() {
            sink.emit(PipelineEvent::Status {
                message: "Generating summary...".to_string(),
            })
            .await?;
            match prompts::summarize(self.llm.as_ref(), &repo_name, &report.analyses).await {
                Ok(summary) => {
                    report.summary = Some(summary.clone());
                    sink.emit(PipelineEvent::Summary { summary }).await?;
                }
                Err(e) => {
                    error!(error = %e, "[ANALYZE][ERROR] Summary failed");
                    sink.emit(PipelineEvent::Error {
                        message: format!("Summary error: {e}"),
                    })
                    .await?;
                }
            }
        }

        // Done
        sink.emit(PipelineEvent::Done {
            total_analyzed: report.analyses.len(),
        })
        .await?;
        report.outcome = SessionOutcome::Completed;
        Ok(())
    }

    async fn skip(
        &self,
        sink: &EventSink,
        report: &mut AnalysisReport,
        path: &str,
        reason: &str,
    ) -> Result<(), Disconnected> {
        report.skipped.push(SkippedFile {
            path: path.to_string(),
            reason: reason.to_string(),
        });
        sink.emit(PipelineEvent::FileSkip {
            file: path.to_string(),
            reason: reason.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_type_tag() {
        let event = PipelineEvent::Progress {
            current: 1,
            total: 3,
            file: "src/lib.rs".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "progress", "current": 1, "total": 3, "file": "src/lib.rs"})
        );

        let skip = serde_json::to_value(PipelineEvent::FileSkip {
            file: "a".into(),
            reason: SKIP_TOO_LARGE.into(),
        })
        .unwrap();
        assert_eq!(skip["type"], "file_skip");

        let done = serde_json::to_value(PipelineEvent::Done { total_analyzed: 2 }).unwrap();
        assert_eq!(done, serde_json::json!({"type": "done", "total_analyzed": 2}));
    }
}
