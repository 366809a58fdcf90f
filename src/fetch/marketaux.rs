//! MarketAux `/v1/news/all` adapter (category: news).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://api.marketaux.com";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    snippet: Option<String>,
    published_at: Option<String>,
}

pub struct MarketAuxFetcher {
    api_token: String,
    client: reqwest::Client,
    base: String,
}

impl MarketAuxFetcher {
    pub fn new(api_token: String, client: reqwest::Client) -> Self {
        Self {
            api_token,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn render(symbol: &str, envelope: Envelope, limit: usize) -> Vec<Document> {
        let mut out = Vec::new();
        for item in envelope.data.into_iter().take(limit) {
            if item.title.as_deref().unwrap_or_default().is_empty()
                && item.description.as_deref().unwrap_or_default().is_empty()
                && item.snippet.as_deref().unwrap_or_default().is_empty()
            {
                continue;
            }
            let detail = item
                .description
                .or(item.snippet)
                .unwrap_or_default();
            let body = normalize_text(&format!(
                "{} ({}): {}",
                item.title.as_deref().unwrap_or_default(),
                item.published_at.as_deref().unwrap_or("undated"),
                detail,
            ));
            if body.is_empty() {
                continue;
            }
            out.push(Document::new("MARKETAUX", symbol, body));
        }
        counter!("fetch_documents_total", "provider" => "MARKETAUX").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for MarketAuxFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/news/all", self.base);
        let envelope: Envelope = self
            .client
            .get(&url)
            .query(&[
                ("symbols", symbol.to_string()),
                ("limit", limit.to_string()),
                ("api_token", self.api_token.clone()),
            ])
            .send()
            .await
            .context("marketaux get")?
            .error_for_status()
            .context("marketaux status")?
            .json()
            .await
            .context("marketaux json")?;
        Ok(Self::render(symbol, envelope, limit))
    }

    fn name(&self) -> &'static str {
        "MARKETAUX"
    }

    fn category(&self) -> Category {
        Category::News
    }
}
