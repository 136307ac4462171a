//! Registry server binary
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "registry_core=trace")
//! - `REGISTRY_*`: see `registry_server::settings`

use registry_server::{start_server, ServerSettings, StoreSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = ServerSettings::from_env()?;

    tracing::info!("Port: {}", settings.port);
    match &settings.store {
        StoreSource::Snapshot(path) => tracing::info!("Snapshot: {}", path.display()),
        StoreSource::Database(path) => tracing::info!("Database: {}", path.display()),
    }
    tracing::info!(
        master_language = %settings.resolver.master_language,
        allow_empty_fields = settings.resolver.allow_empty_fields,
        "Resolver configured"
    );

    start_server(settings).await
}
