use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use school_api::{build_router, AppState};
use school_core::repositories::{EntityRepository, MemoryRepository};
use school_core::schema::Catalog;
use school_infrastructure::database::{bootstrap_schema, create_pool, PgEntityRepository};
use school_shared::config::{AppConfig, DatabaseBackend};

async fn build_repository(config: &AppConfig, catalog: Arc<Catalog>) -> anyhow::Result<Arc<dyn EntityRepository>> {
    match config.database.backend {
        DatabaseBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("database.url is required for the postgres backend")?;

            info!("Connecting to database...");
            let pool = create_pool(url, &config.database)
                .await
                .context("failed to connect to database")?;
            info!("Database connection established.");

            if config.database.auto_migrate {
                bootstrap_schema(&pool, &catalog)
                    .await
                    .context("failed to bootstrap schema")?;
            }
            Ok(Arc::new(PgEntityRepository::new(pool)))
        }
        DatabaseBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryRepository::new(catalog)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry; the guard flushes the file writer on exit
    let _log_guard = school_shared::telemetry::init_telemetry(&config.log)?;
    info!(env = %config.app.env, "{} starting...", config.app.name);

    let catalog = Arc::new(Catalog::school()?);
    info!(entities = catalog.entities().len(), relations = catalog.relations().len(), "catalog loaded");

    let repo = build_repository(&config, catalog.clone()).await?;
    let state = AppState::new(repo, catalog, config.clone());
    let app = build_router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
