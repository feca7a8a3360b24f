use std::sync::Arc;
use std::time::Duration;

use streamflix::{
    config::{Config, StoreBackend},
    create_router,
    db::{create_pool, DocumentStore, MemoryStore, PgDocumentStore},
    models::ImageUrls,
    services::{auth::FirebaseAuthProvider, catalog::TmdbCatalog},
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streamflix=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = match config.document_store {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            Arc::new(PgDocumentStore::connect(pool, &config.database_url).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; wishlists are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::new(
        Arc::new(TmdbCatalog::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
        )),
        Arc::new(FirebaseAuthProvider::new(
            config.auth_api_key.clone(),
            config.auth_api_url.clone(),
        )),
        store,
        ImageUrls::new(config.tmdb_image_url.clone()),
    ));

    let _sweeper = state.spawn_idle_sweeper(Duration::from_secs(config.session_idle_secs));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
