//! unibaby-pool server entry point.
//!
//! Starts the Axum HTTP server with the REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use unibaby_pool::api;
use unibaby_pool::app_state::AppState;
use unibaby_pool::config::{AppConfig, LogFormat};
use unibaby_pool::domain::PackageCatalog;
use unibaby_pool::gateway::{CheckoutGateway, StripeGateway};
use unibaby_pool::persistence::{MemoryStore, PostgresStore, RegistrationStore, TransactionStore};
use unibaby_pool::service::EnrollmentService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config =
        AppConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting unibaby-pool");

    // Package catalog
    let catalog = match &config.package_catalog_path {
        Some(path) => PackageCatalog::from_json_file(path)
            .with_context(|| format!("loading package catalog {}", path.display()))?,
        None => PackageCatalog::builtin(),
    };
    tracing::info!(packages = catalog.len(), "package catalog loaded");

    // Persistence
    let (registrations, transactions) = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        store.migrate().await.context("running migrations")?;
        tracing::info!("PostgreSQL persistence ready");
        stores(Arc::new(store))
    } else {
        tracing::warn!("persistence disabled, documents are kept in memory");
        stores(Arc::new(MemoryStore::new()))
    };

    // Payment gateway
    let gateway: Option<Arc<dyn CheckoutGateway>> = match config.stripe_settings() {
        Some(settings) => Some(Arc::new(StripeGateway::new(settings))),
        None => {
            tracing::warn!("STRIPE_API_KEY not set, payment endpoints are disabled");
            None
        }
    };

    // Build service layer
    let enrollment = EnrollmentService::new(Arc::new(catalog), registrations, transactions, gateway);
    let app_state = AppState::new(enrollment);

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Exposes one store through both persistence ports.
fn stores<S>(store: Arc<S>) -> (Arc<dyn RegistrationStore>, Arc<dyn TransactionStore>)
where
    S: RegistrationStore + TransactionStore + 'static,
{
    (
        Arc::clone(&store) as Arc<dyn RegistrationStore>,
        store as Arc<dyn TransactionStore>,
    )
}
