//! Registry HTTP Server
//!
//! Read-only REST API over `ItemService`. One service instance is shared by
//! all requests; each request resolves with its own per-call cache.
//!
//! # Usage
//!
//! ```bash
//! # Serve a JSON snapshot
//! REGISTRY_SNAPSHOT=./registry.json cargo run --bin registry-server
//!
//! # Serve a libsql database on another port
//! REGISTRY_DB_PATH=./data/registry.db REGISTRY_SERVER_PORT=8080 cargo run --bin registry-server
//! ```
//!
//! See [`settings`] for every environment variable.

use axum::{http::Method, Router};
use registry_core::{ItemService, LibsqlStore, MemoryStore, RegistryStore};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod http_error;
mod item_endpoints;
pub mod settings;

pub use http_error::HttpError;
pub use settings::{ServerSettings, StoreSource};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ItemService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(item_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// The API is read-only, so any origin may issue GET requests
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Open the configured store
pub async fn open_store(source: &StoreSource) -> anyhow::Result<Arc<dyn RegistryStore>> {
    match source {
        StoreSource::Snapshot(path) => {
            let store = MemoryStore::load(path).await?;
            tracing::info!(
                path = %path.display(),
                nodes = store.node_count(),
                "Loaded registry snapshot"
            );
            Ok(Arc::new(store))
        }
        StoreSource::Database(path) => Ok(Arc::new(LibsqlStore::new(path.clone()).await?)),
    }
}

/// Build the service from `settings` and serve until shutdown
///
/// # Errors
///
/// Returns error if the store cannot be opened or the server fails to bind.
pub async fn start_server(settings: ServerSettings) -> anyhow::Result<()> {
    let store = open_store(&settings.store).await?;
    let service = ItemService::new(store, settings.resolver)?;
    let app = create_router(AppState {
        service: Arc::new(service),
    });

    let addr = format!("127.0.0.1:{}", settings.port);
    tracing::info!("Registry server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
