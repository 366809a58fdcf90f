//! ICE aggregation service binary entrypoint.
//! Boots the Axum HTTP server: fetch fan-out, ingest hand-off, query façade,
//! Prometheus metrics.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ice_aggregator::api::{create_router, AppState};
use ice_aggregator::config::AppConfig;
use ice_aggregator::fetch::build_http_client;
use ice_aggregator::index::{KnowledgeIndex, RagHttpClient};
use ice_aggregator::metrics::Metrics;
use ice_aggregator::Aggregator;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ice_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env();
    let metrics = Metrics::init(cfg.confidence_threshold);

    let aggregator = Arc::new(Aggregator::from_config(&cfg)?);
    tracing::info!(
        available = ?aggregator.registry().list_available(),
        "service registry built"
    );

    let index: Option<Arc<dyn KnowledgeIndex>> = match &cfg.rag_service_url {
        Some(url) => {
            let client = build_http_client(cfg.fetch_timeout_secs)?;
            Some(Arc::new(RagHttpClient::new(
                url.clone(),
                cfg.openai_api_key.clone(),
                client,
            )))
        }
        None => {
            tracing::warn!("RAG_SERVICE_URL unset; /ingest and /query disabled");
            None
        }
    };

    let state = AppState { aggregator, index };
    let router = create_router(state).merge(metrics.router());

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
