//! # Knowledge-index façade
//!
//! Thin boundary to the external graph-RAG service: documents go in as
//! formatted text, answers come out. Entity extraction, community detection,
//! and graph storage all live on the other side of this trait.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The five retrieval modes the query service accepts. There is no `kg`
/// mode; strings other than these five fail to parse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Naive,
    Local,
    Global,
    Hybrid,
    Mix,
}

impl QueryMode {
    pub const ALL: [QueryMode; 5] = [
        QueryMode::Naive,
        QueryMode::Local,
        QueryMode::Global,
        QueryMode::Hybrid,
        QueryMode::Mix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Naive => "naive",
            QueryMode::Local => "local",
            QueryMode::Global => "global",
            QueryMode::Hybrid => "hybrid",
            QueryMode::Mix => "mix",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(QueryMode::Naive),
            "local" => Ok(QueryMode::Local),
            "global" => Ok(QueryMode::Global),
            "hybrid" => Ok(QueryMode::Hybrid),
            "mix" => Ok(QueryMode::Mix),
            other => anyhow::bail!(
                "unknown query mode {other:?}; expected one of naive, local, global, hybrid, mix"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

/// Insert/query boundary with the external RAG library.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    async fn insert(&self, document_text: &str) -> Result<()>;
    async fn query(&self, question: &str, mode: QueryMode) -> Result<QueryAnswer>;
}

/// HTTP-backed implementation against a deployed RAG service.
pub struct RagHttpClient {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl RagHttpClient {
    pub fn new(base: impl Into<String>, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl KnowledgeIndex for RagHttpClient {
    async fn insert(&self, document_text: &str) -> Result<()> {
        let url = format!("{}/documents", self.base);
        self.authorized(self.client.post(&url))
            .json(&serde_json::json!({ "text": document_text }))
            .send()
            .await
            .context("rag insert post")?
            .error_for_status()
            .context("rag insert status")?;
        Ok(())
    }

    async fn query(&self, question: &str, mode: QueryMode) -> Result<QueryAnswer> {
        let url = format!("{}/query", self.base);
        let answer = self
            .authorized(self.client.post(&url))
            .json(&serde_json::json!({ "question": question, "mode": mode }))
            .send()
            .await
            .context("rag query post")?
            .error_for_status()
            .context("rag query status")?
            .json()
            .await
            .context("rag query json")?;
        Ok(answer)
    }
}
