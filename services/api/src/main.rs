use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod assets;
mod config;
mod error;
mod extract;
mod jwt;
mod mailer;
mod middleware;
mod models;
mod response;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod validation;

use common::database::{self, DatabaseConfig, init_pool};
use common::document::{DocumentStore, PgDocumentStore};
use common::storage::{S3Storage, StorageConfig};

use crate::{
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    mailer::{DisabledMailer, Mailer, MailerConfig, SmtpMailer},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting portfolio API service");

    let server_config = ServerConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let document_store = PgDocumentStore::new(pool);
    document_store.migrate().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(document_store);

    let storage_config = StorageConfig::from_env()?;
    let storage = S3Storage::from_config(&storage_config).await;

    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    let mailer: Arc<dyn Mailer> = match MailerConfig::from_env()? {
        Some(mailer_config) => Arc::new(SmtpMailer::new(&mailer_config)?),
        None => {
            warn!("SMTP_HOST not set, password recovery emails are disabled");
            Arc::new(DisabledMailer)
        }
    };

    let bind_address = server_config.bind_address();
    let app_state = AppState::new(
        store.clone(),
        Arc::new(storage),
        jwt_service,
        mailer,
        server_config,
    );

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("API service listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("API service stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
