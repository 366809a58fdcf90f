//! NewsAPI.org `/v2/everything` adapter (category: news).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

pub struct NewsApiFetcher {
    api_key: String,
    client: reqwest::Client,
    base: String,
}

impl NewsApiFetcher {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    /// Point at a local stub server; used by tests.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn render(symbol: &str, envelope: Envelope, limit: usize) -> Vec<Document> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();
        for a in envelope.articles.into_iter().take(limit) {
            if a.title.as_deref().unwrap_or_default().is_empty()
                && a.description.as_deref().unwrap_or_default().is_empty()
            {
                continue;
            }
            let outlet = a
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "unknown outlet".to_string());
            let body = normalize_text(&format!(
                "{} ({}, {}): {}",
                a.title.as_deref().unwrap_or_default(),
                outlet,
                a.published_at.as_deref().unwrap_or("undated"),
                a.description.as_deref().unwrap_or_default(),
            ));
            if body.is_empty() {
                continue;
            }
            out.push(Document::new("NEWSAPI", symbol, body));
        }
        histogram!("fetch_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_documents_total", "provider" => "NEWSAPI").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for NewsApiFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/v2/everything", self.base);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(&[
                ("q", symbol.to_string()),
                ("pageSize", limit.to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("apiKey", self.api_key.clone()),
            ])
            .send()
            .await
            .context("newsapi get")?
            .error_for_status()
            .context("newsapi status")?
            .json()
            .await
            .context("newsapi json")?;
        Ok(Self::render(symbol, envelope, limit))
    }

    fn name(&self) -> &'static str {
        "NEWSAPI"
    }

    fn category(&self) -> Category {
        Category::News
    }
}
