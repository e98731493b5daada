//! HTTP server: shared state, router assembly, startup and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use repoai_core::config::Settings;
use repoai_core::contract::{LlmClient, RepositoryFetcher};
use repoai_core::executor::CommandExecutor;
use repoai_core::github::GithubFetcher;
use repoai_core::llm::ChatClient;
use repoai_core::pipeline::AnalysisPipeline;
use repoai_core::workspace::Workspace;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;

/// Components shared by every handler. Built once at startup, never mutated.
pub struct AppState {
    pub settings: Settings,
    pub fetcher: Arc<dyn RepositoryFetcher>,
    pub llm: Arc<dyn LlmClient>,
    pub pipeline: AnalysisPipeline,
    pub executor: CommandExecutor,
    pub workspace: Workspace,
}

impl AppState {
    /// Wires the remaining components around the given collaborators.
    pub fn new(
        settings: Settings,
        fetcher: Arc<dyn RepositoryFetcher>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let pipeline =
            AnalysisPipeline::new(fetcher.clone(), llm.clone(), settings.analysis.clone());
        let executor = CommandExecutor::new(settings.workspace.root.clone(), &settings.terminal);
        let workspace = Workspace::new(
            settings.workspace.root.clone(),
            settings.workspace.delete_root().clone(),
        );
        Self {
            settings,
            fetcher,
            llm,
            pipeline,
            executor,
            workspace,
        }
    }

    /// Builds the GitHub and LLM clients from settings.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let fetcher = GithubFetcher::new(settings.github.clone())
            .context("Failed to build GitHub client")?;
        let llm = ChatClient::new(settings.llm.clone()).context("Failed to build LLM client")?;
        Ok(Self::new(settings, Arc::new(fetcher), Arc::new(llm)))
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = create_cors_layer(state.settings.server.cors_allowed_origins.clone());

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/chat", post(routes::chat::chat))
        .route("/analyze", post(routes::analyze::analyze))
        .route("/terminal/run", post(routes::terminal::run))
        .route("/terminal/ai", post(routes::terminal::ai))
        .route("/fs/tree", post(routes::files::tree))
        .route("/file/read", post(routes::files::read))
        .route("/file/write", post(routes::files::write))
        .route("/file/delete", post(routes::files::delete))
        .route("/file/ai-write", post(routes::files::ai_write))
        .route("/repo/info", post(routes::repo::info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn startup(settings: Settings) -> Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = Arc::new(AppState::from_settings(settings)?);
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}

fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .into_iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    cors.max_age(Duration::from_secs(3600))
}
