// define modules in crate
mod auth;
mod config;
mod cqrs;
mod domain;
mod dtos;
mod errors;
mod metrics;
mod repositories;
mod routes;
mod state;

use std::{fs::File, sync::Arc};

use anyhow::Context;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use config::{Config, StoreBackend};
use dotenv::dotenv;
use metrics::ProductMetrics;
use repositories::{InMemoryVentureRepository, MongoDbVentureRepository, VentureRepository};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{event, Level};

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .with_ansi(false)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true);

    match &config.log_path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_writer(file).init();
        }
        None => builder.init(),
    }
    Ok(())
}

async fn build_repository(store: &StoreBackend) -> anyhow::Result<Arc<dyn VentureRepository>> {
    let repository: Arc<dyn VentureRepository> = match store {
        StoreBackend::MongoDb(info) => Arc::new(MongoDbVentureRepository::new(info).await?),
        StoreBackend::InMemory { seed_path: Some(path) } => Arc::new(InMemoryVentureRepository::from_seed_file(path)?),
        StoreBackend::InMemory { seed_path: None } => {
            event!(Level::WARN, "Using an empty in-memory venture store");
            Arc::new(InMemoryVentureRepository::new())
        }
    };
    Ok(repository)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config)?;

    let repository = build_repository(&config.store).await?;
    let product_metrics = Arc::new(ProductMetrics::new()?);
    let state = Arc::new(AppState::new(repository, product_metrics.clone(), config.auth.clone()));

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    event!(
        Level::INFO,
        port = config.port,
        auth = config.auth.is_some(),
        "Product registry listening"
    );

    axum::serve(
        listener,
        routes::router(state)
            .route(
                "/metrics",
                get(move || async move { format!("{}{}", metrics_handle.render(), product_metrics.render()) }),
            )
            .layer(prometheus_layer)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            ),
    )
    .await?;

    Ok(())
}
