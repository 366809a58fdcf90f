//! Financial Modeling Prep press-releases adapter (category: financial).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::document::Document;
use crate::fetch::{normalize_text, SourceFetcher};
use crate::registry::Category;

const DEFAULT_BASE: &str = "https://financialmodelingprep.com";

#[derive(Debug, Deserialize)]
struct PressRelease {
    title: Option<String>,
    text: Option<String>,
    date: Option<String>,
}

pub struct FmpFetcher {
    api_key: String,
    client: reqwest::Client,
    base: String,
}

impl FmpFetcher {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            base: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn render(symbol: &str, releases: Vec<PressRelease>, limit: usize) -> Vec<Document> {
        let mut out = Vec::new();
        for pr in releases.into_iter().take(limit) {
            if pr.title.as_deref().unwrap_or_default().is_empty()
                && pr.text.as_deref().unwrap_or_default().is_empty()
            {
                continue;
            }
            let body = normalize_text(&format!(
                "{} ({}): {}",
                pr.title.as_deref().unwrap_or_default(),
                pr.date.as_deref().unwrap_or("undated"),
                pr.text.as_deref().unwrap_or_default(),
            ));
            if body.is_empty() {
                continue;
            }
            out.push(Document::new("FMP", symbol, body));
        }
        counter!("fetch_documents_total", "provider" => "FMP").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for FmpFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/v3/press-releases/{}", self.base, symbol);
        let releases: Vec<PressRelease> = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("apikey", self.api_key.clone())])
            .send()
            .await
            .context("fmp get")?
            .error_for_status()
            .context("fmp status")?
            .json()
            .await
            .context("fmp json")?;
        Ok(Self::render(symbol, releases, limit))
    }

    fn name(&self) -> &'static str {
        "FMP"
    }

    fn category(&self) -> Category {
        Category::Financial
    }
}
