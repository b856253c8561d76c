//! Shared startup path for the binaries.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use crate::core::config::{AppPaths, ConfigService};
use crate::core::logging;
use crate::server::{app_router, launcher_router};
use crate::state::AppState;
use crate::themes::ThemeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Landing page plus every theme under its mount path.
    Launcher,
    /// One theme served at the root.
    Single(ThemeId),
}

impl LaunchMode {
    /// Prefix of the daily log file, so concurrently running binaries do
    /// not interleave their output.
    pub fn log_prefix(&self) -> &'static str {
        match self {
            LaunchMode::Launcher => "corpus.log",
            LaunchMode::Single(ThemeId::Legal) => "legal_eagle.log",
            LaunchMode::Single(ThemeId::Ghost) => "ouija_board.log",
        }
    }
}

pub async fn run(mode: LaunchMode) -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, mode.log_prefix());

    let config = ConfigService::new(paths.clone())
        .load()
        .context("Failed to load configuration")?;
    tracing::debug!(config = ?config.redacted(), "configuration loaded");

    let themes: Vec<ThemeId> = match mode {
        LaunchMode::Launcher => vec![ThemeId::Legal, ThemeId::Ghost],
        LaunchMode::Single(id) => vec![id],
    };
    let states = AppState::initialize(&paths, &config, &themes)
        .await
        .context("Failed to initialize application state")?;

    let app: Router = match mode {
        LaunchMode::Launcher => launcher_router(&states),
        LaunchMode::Single(_) => states
            .first()
            .cloned()
            .map(app_router)
            .context("no theme state was built")?,
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    for state in &states {
        let path = match mode {
            LaunchMode::Launcher => state.theme.mount_path.as_str(),
            LaunchMode::Single(_) => "/",
        };
        tracing::info!("{} available at http://{}{}", state.theme.app_name, addr, path);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
