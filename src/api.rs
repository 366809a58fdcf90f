use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::{Aggregator, FetchRequest, FetchResult};
use crate::index::{KnowledgeIndex, QueryAnswer, QueryMode};
use crate::registry::ServiceDescriptor;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Absent when no RAG service is configured; /ingest and /query answer 503.
    pub index: Option<Arc<dyn KnowledgeIndex>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/services", get(list_services))
        .route("/fetch", post(fetch))
        .route("/ingest", post(ingest))
        .route("/query", post(query))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn list_services(State(state): State<AppState>) -> Json<Vec<ServiceDescriptor>> {
    Json(state.aggregator.registry().descriptors().to_vec())
}

async fn fetch(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Json<FetchResult> {
    Json(state.aggregator.fetch_comprehensive_data(&request).await)
}

#[derive(serde::Serialize)]
struct IngestResp {
    inserted: usize,
    insert_failures: usize,
    breakdown: std::collections::BTreeMap<String, usize>,
    failed_symbols: Vec<String>,
}

async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<IngestResp>, (StatusCode, String)> {
    let Some(index) = state.index.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no RAG service configured".to_string(),
        ));
    };

    let result = state.aggregator.fetch_comprehensive_data(&request).await;

    let mut inserted = 0usize;
    let mut insert_failures = 0usize;
    for doc in &result.documents {
        match index.insert(&doc.text).await {
            Ok(()) => inserted += 1,
            Err(e) => {
                tracing::warn!(error = ?e, source = %doc.source, "index insert failed");
                insert_failures += 1;
            }
        }
    }

    Ok(Json(IngestResp {
        inserted,
        insert_failures,
        breakdown: result.breakdown,
        failed_symbols: result.failed_symbols,
    }))
}

#[derive(serde::Deserialize)]
struct QueryReq {
    question: String,
    /// One of the five retrieval modes; anything else is a 400.
    mode: String,
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryReq>,
) -> Result<Json<QueryAnswer>, (StatusCode, String)> {
    let Some(index) = state.index.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no RAG service configured".to_string(),
        ));
    };

    let mode: QueryMode = req
        .mode
        .parse()
        .map_err(|e: anyhow::Error| (StatusCode::BAD_REQUEST, e.to_string()))?;

    match index.query(&req.question, mode).await {
        Ok(answer) => Ok(Json(answer)),
        Err(e) => {
            tracing::warn!(error = ?e, "query against RAG service failed");
            Err((StatusCode::BAD_GATEWAY, "query failed".to_string()))
        }
    }
}
