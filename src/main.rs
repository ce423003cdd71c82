use std::sync::Arc;

use anyhow::Context;

use deptkb::app::{build_router, AppState};
use deptkb::config::AppConfig;
use deptkb::db::repositories::Repositories;
use deptkb::storage::client::{S3StorageClient, StorageClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deptkb=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting deptkb server...");

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to MongoDB
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let repos = Repositories::mongo(&mongo_client, &config.mongodb.database).await?;

    tracing::info!("Connected to MongoDB at {}", config.mongodb.uri);

    // Connect to S3
    let storage: Arc<dyn StorageClient> = Arc::new(S3StorageClient::from_config(&config.s3).await?);

    tracing::info!(bucket = %config.s3.bucket, "S3 storage client initialized");

    if config.demo_mode {
        deptkb::demo_seeder::seed_demo_data(&repos).await?;
    }

    let app = build_router(AppState {
        repos,
        storage,
        demo_mode: config.demo_mode,
    });

    tracing::info!("Listening on http://{}", config.server.addr);
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
