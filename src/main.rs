//! VidStream Account API Server
//!
//! HTTP server for the user account backend.

use sqlx::postgres::PgPoolOptions;

use vidstream_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidstream_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load and validate configuration
    let config = AppConfig::from_env()?;
    config.validate()?;

    // Connect to the database
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    // Wire the application
    let app = vidstream_api::init(&config, db).await?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Account API server listening on http://{}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
