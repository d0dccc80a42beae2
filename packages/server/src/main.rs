use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::config::StorageBackend;
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::state::AppState;
use server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::seed_admin(&db, &config.admin)
        .await
        .context("Failed to seed admin account")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    let object_store = init_object_store(&config)
        .await
        .context("Failed to initialize object store")?;
    info!(
        backend = ?config.storage.backend,
        public_base_url = %object_store.public_base_url(),
        "Object store ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        object_store,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn init_object_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let storage = &config.storage;
    let store: Arc<dyn ObjectStore> = match storage.backend {
        StorageBackend::Filesystem => Arc::new(
            FilesystemObjectStore::new(
                storage.root.clone(),
                storage.public_base_url.clone(),
                storage.max_object_size,
            )
            .await?,
        ),
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(storage)?),
    };
    Ok(store)
}
