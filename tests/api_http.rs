// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /services
// - POST /fetch
// - POST /ingest (with and without a configured index)
// - POST /query  (mode validation)

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use ice_aggregator::{
    api::{create_router, AppState},
    Aggregator, Category, Document, KnowledgeIndex, QueryAnswer, QueryMode, ServiceDescriptor,
    ServiceRegistry, SourceFetcher,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct StubFetcher;

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        Ok((0..limit.min(2))
            .map(|i| Document::new("NEWS", symbol, format!("headline {i} about {symbol}")))
            .collect())
    }
    fn name(&self) -> &'static str {
        "NEWS"
    }
    fn category(&self) -> Category {
        Category::News
    }
}

#[derive(Default)]
struct RecordingIndex {
    inserted: Mutex<Vec<String>>,
}

#[async_trait]
impl KnowledgeIndex for RecordingIndex {
    async fn insert(&self, document_text: &str) -> Result<()> {
        self.inserted.lock().unwrap().push(document_text.to_string());
        Ok(())
    }

    async fn query(&self, question: &str, mode: QueryMode) -> Result<QueryAnswer> {
        Ok(QueryAnswer {
            answer: format!("[{mode}] {question}"),
            status: "success".to_string(),
            metrics: None,
        })
    }
}

fn stub_aggregator() -> Arc<Aggregator> {
    let registry = ServiceRegistry::from_descriptors(vec![ServiceDescriptor {
        name: "NEWS",
        category: Category::News,
        available: true,
    }]);
    Arc::new(Aggregator::new(registry, vec![Arc::new(StubFetcher)]))
}

fn test_router(index: Option<Arc<RecordingIndex>>) -> Router {
    let state = AppState {
        aggregator: stub_aggregator(),
        index: index.map(|i| i as Arc<dyn KnowledgeIndex>),
    };
    create_router(state)
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = test_router(None);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn services_lists_the_registry_snapshot() {
    let app = test_router(None);
    let resp = app
        .oneshot(Request::builder().uri("/services").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body[0]["name"], "NEWS");
    assert_eq!(body[0]["category"], "news");
    assert_eq!(body[0]["available"], true);
}

#[tokio::test]
async fn fetch_returns_tagged_documents_and_breakdown() {
    let app = test_router(None);
    let req = post_json("/fetch", json!({ "symbols": ["NVDA"], "news_limit": 2 }));
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["breakdown"]["NEWS"], 2);
    assert_eq!(body["failed_symbols"].as_array().unwrap().len(), 0);
    let text = body["documents"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("[SOURCE:NEWS|SYMBOL:NVDA]"));
}

#[tokio::test]
async fn ingest_without_configured_index_is_503() {
    let app = test_router(None);
    let resp = app
        .oneshot(post_json("/ingest", json!({ "symbols": ["NVDA"] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn ingest_hands_every_document_to_the_index() {
    let index = Arc::new(RecordingIndex::default());
    let app = test_router(Some(index.clone()));

    let resp = app
        .oneshot(post_json(
            "/ingest",
            json!({ "symbols": ["NVDA"], "news_limit": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["insert_failures"], 0);

    let inserted = index.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 2);
    assert!(inserted[0].starts_with("[SOURCE:NEWS|SYMBOL:NVDA]"));
}

#[tokio::test]
async fn query_round_trips_through_the_index() {
    let app = test_router(Some(Arc::new(RecordingIndex::default())));
    let resp = app
        .oneshot(post_json(
            "/query",
            json!({ "question": "What moved NVDA?", "mode": "hybrid" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["answer"], "[hybrid] What moved NVDA?");
}

#[tokio::test]
async fn removed_kg_mode_is_a_bad_request() {
    let app = test_router(Some(Arc::new(RecordingIndex::default())));
    let resp = app
        .oneshot(post_json(
            "/query",
            json!({ "question": "anything", "mode": "kg" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
