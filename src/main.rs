use anyhow::{Context, Result};
use site_content::{build_service, build_store, config::Config, server};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_content=info".parse()?),
        )
        .init();

    info!("Starting site content service");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Step 1: Connect the content store
    let store = build_store(&config).await?;
    info!("Using {} content store", store.name());

    // Step 2: Build the service and warm the cache
    let service = build_service(&config, store)?;
    let preload = config.preload_section_keys()?;
    if !preload.is_empty() {
        let report = service.preload(&preload).await;
        if report.failed > 0 {
            warn!("{} bundle(s) will be fetched on first request", report.failed);
        }
    }

    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY not set, cache invalidation endpoint is disabled");
    }

    // Step 3: Serve
    let app = server::create_router(server::AppState::new(service, config.admin_api_key.clone()));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
