/// # repoai CLI
///
/// Command parsing and the async [`run`] entrypoint shared by `main` and the
/// integration tests. All domain logic lives in `repoai-core`; this module
/// only loads settings, applies flag overrides and picks what to start.
///
/// ## Subcommands
/// - `serve`: run the HTTP backend until Ctrl+C / SIGTERM.
/// - `analyze <owner/name>`: run one analysis session in-process and print
///   every event as a JSON line on stdout.
use crate::load_config::load_config;
use crate::server::{startup, AppState};
use anyhow::Result;
use clap::{Parser, Subcommand};
use repoai_core::contract::RepoRef;
use repoai_core::pipeline::{AnalysisRequest, PipelineEvent};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// CLI for repoai: the RepoAI backend.
#[derive(Parser)]
#[clap(
    name = "repoai",
    version,
    about = "Chat, streaming repository analysis, terminal and file passthroughs for RepoAI"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Interface to bind, overriding config and HOST
        #[clap(long)]
        host: Option<String>,
        /// Port to bind, overriding config and PORT
        #[clap(long)]
        port: Option<u16>,
    },
    /// Analyse one repository and print the event stream as JSON lines
    Analyze {
        /// Repository as owner/name
        repo: String,
        #[clap(long)]
        branch: Option<String>,
        /// Maximum number of files to review (0 for no cap)
        #[clap(long)]
        max_files: Option<usize>,
        /// Skip the cross-file summary
        #[clap(long)]
        no_summary: bool,
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut settings = load_config(config.as_deref())?;
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            settings.trace_loaded();
            tracing::info!(command = "serve", "Starting server");
            startup(settings).await
        }
        Commands::Analyze {
            repo,
            branch,
            max_files,
            no_summary,
            config,
        } => {
            let repo = RepoRef::parse(&repo, branch.as_deref())
                .ok_or_else(|| anyhow::anyhow!("Use owner/repo format, got {repo:?}"))?;
            let settings = load_config(config.as_deref())?;
            settings.trace_loaded();
            let state = AppState::from_settings(settings)?;
            if !state.llm.has_api_key() {
                return Err(anyhow::anyhow!("GROQ_API_KEY not set"));
            }

            tracing::info!(command = "analyze", repo = %repo.full_name(), "Starting analysis");
            let events = state.pipeline.spawn(AnalysisRequest {
                repo,
                max_files,
                extensions: Vec::new(),
                summary: !no_summary,
            });
            let mut stdout = std::io::stdout();
            let completed = print_events(events, &mut stdout).await?;
            if completed {
                tracing::info!(command = "analyze", "Analysis complete");
                Ok(())
            } else {
                tracing::error!(command = "analyze", "Analysis ended without completing");
                Err(anyhow::anyhow!("Analysis did not complete"))
            }
        }
    }
}

/// Writes each event as one JSON line. Returns whether a `done` event was seen.
pub async fn print_events<W: Write>(
    mut events: mpsc::Receiver<PipelineEvent>,
    out: &mut W,
) -> Result<bool> {
    let mut completed = false;
    while let Some(event) = events.recv().await {
        completed |= matches!(event, PipelineEvent::Done { .. });
        serde_json::to_writer(&mut *out, &event)?;
        writeln!(out)?;
        out.flush()?;
    }
    Ok(completed)
}
