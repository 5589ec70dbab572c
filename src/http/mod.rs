//! I3S SceneServer HTTP surface built on axum.
//!
//! Routes:
//! - `GET /` lists cataloged archives
//! - `GET /reload` rescans the storage root
//! - `GET /{collection}/{archive}/SceneServer/...` and
//!   `GET /{archive}/SceneServer/...` serve scene resources

use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::ArchiveCatalog;
use crate::resolver::SceneResolver;

pub mod handlers;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    resolver: SceneResolver,
}

impl AppState {
    pub fn new(catalog: Arc<ArchiveCatalog>) -> Self {
        Self {
            resolver: SceneResolver::new(catalog),
        }
    }

    pub fn resolver(&self) -> &SceneResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &Arc<ArchiveCatalog> {
        self.resolver.catalog()
    }
}

/// Build the router.
///
/// Responses are not compressed by the server: decoded payloads go out as
/// is and geometry is already gzip.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_archives))
        .route("/reload", get(handlers::reload_catalog))
        .route("/{*path}", get(handlers::scene_resource))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: impl ToSocketAddrs, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
