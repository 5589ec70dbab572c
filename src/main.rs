//! Entry point for the slpk-server binary.
//!
//! Parses configuration, builds the archive catalog and serves it over HTTP.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use slpk_server::{AppState, ArchiveCatalog, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(base = %cli.base.display(), layout = ?cli.layout, "starting slpk-server");

    let catalog = Arc::new(ArchiveCatalog::new(&cli.base, cli.layout));
    let refresh = catalog.refresh()?;
    if refresh.snapshot.is_empty() {
        tracing::warn!("no archives found under {}", cli.base.display());
    }

    let state = Arc::new(AppState::new(catalog));
    slpk_server::http::serve(cli.bind_address(), state).await
}
