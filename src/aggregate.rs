//! # Aggregator
//!
//! The "comprehensive fetch": fan-out across every available fetcher for one
//! or more symbols, single pass, no cross-request state. Provider failures
//! are isolated here: a fetcher's `Err` becomes a warning plus an error
//! counter, never an exception for the caller. The public entrypoint is
//! total: it always returns a [`FetchResult`].

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, CategoryLimits, LimitPolicy};
use crate::document::{parse_source_marker, Document};
use crate::extract::EntityExtractor;
use crate::fetch::{
    alpha_vantage::AlphaVantageFetcher, benzinga::BenzingaFetcher, build_http_client,
    email::MailboxFetcher, finnhub::FinnhubFetcher, fmp::FmpFetcher, marketaux::MarketAuxFetcher,
    newsapi::NewsApiFetcher, polygon::PolygonFetcher, sec_edgar::SecEdgarFetcher, validate_symbol,
    SourceFetcher,
};
use crate::registry::{Category, ServiceRegistry};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_requests_total", "Aggregate fetch requests served.");
        describe_counter!(
            "fetch_documents_total",
            "Documents produced, labeled by provider."
        );
        describe_counter!(
            "fetch_provider_errors_total",
            "Provider fetch/parse errors, labeled by provider."
        );
        describe_counter!(
            "fetch_failed_symbols_total",
            "Symbols that yielded zero documents across all sources."
        );
        describe_histogram!("fetch_parse_ms", "Provider payload parse time in milliseconds.");
        describe_gauge!("fetch_last_run_ts", "Unix ts of the last aggregate fetch.");
    });
}

/// Input to the aggregator. Absent per-category limits fall back to the
/// configured defaults; a limit of zero skips the category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub news_limit: Option<usize>,
    #[serde(default)]
    pub email_limit: Option<usize>,
    #[serde(default)]
    pub financial_limit: Option<usize>,
    #[serde(default)]
    pub market_limit: Option<usize>,
    #[serde(default)]
    pub sec_limit: Option<usize>,
    #[serde(default)]
    pub research_limit: Option<usize>,
}

impl FetchRequest {
    pub fn for_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn requested_limit(&self, category: Category) -> Option<usize> {
        match category {
            Category::News => self.news_limit,
            Category::Email => self.email_limit,
            Category::Financial => self.financial_limit,
            Category::Market => self.market_limit,
            Category::Sec => self.sec_limit,
            Category::Research => self.research_limit,
        }
    }
}

/// Output of the aggregator. `breakdown` is re-derived by parsing the
/// `[SOURCE:..]` marker back out of each document rather than tracked on the
/// side, so the same statistics can be recovered from persisted text later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchResult {
    pub documents: Vec<Document>,
    pub breakdown: BTreeMap<String, usize>,
    pub failed_symbols: Vec<String>,
}

/// Count documents per provider by parsing the inline source marker.
pub fn breakdown_by_marker(documents: &[Document]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for doc in documents {
        let key = parse_source_marker(&doc.text)
            .map(|(source, _)| source)
            .unwrap_or_else(|| "UNKNOWN".to_string());
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

pub struct Aggregator {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    registry: ServiceRegistry,
    default_limits: CategoryLimits,
    limit_policy: LimitPolicy,
    extractor: EntityExtractor,
}

impl Aggregator {
    /// Wire explicit fetchers against a registry snapshot. Registration
    /// order is the stable merge order of the fan-out.
    pub fn new(registry: ServiceRegistry, fetchers: Vec<Arc<dyn SourceFetcher>>) -> Self {
        Self {
            fetchers,
            registry,
            default_limits: CategoryLimits::default(),
            limit_policy: LimitPolicy::default(),
            extractor: EntityExtractor::new(),
        }
    }

    pub fn with_default_limits(mut self, limits: CategoryLimits) -> Self {
        self.default_limits = limits;
        self
    }

    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }

    /// Build the production fetcher set from configuration. Providers whose
    /// credential is missing are simply not constructed; the registry keeps
    /// them listed as unavailable.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = build_http_client(cfg.fetch_timeout_secs)?;
        let registry = ServiceRegistry::from_config(cfg);

        let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();
        if let Some(k) = &cfg.newsapi_key {
            fetchers.push(Arc::new(NewsApiFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.marketaux_key {
            fetchers.push(Arc::new(MarketAuxFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.benzinga_key {
            fetchers.push(Arc::new(BenzingaFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.alpha_vantage_key {
            fetchers.push(Arc::new(AlphaVantageFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.polygon_key {
            fetchers.push(Arc::new(PolygonFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.fmp_key {
            fetchers.push(Arc::new(FmpFetcher::new(k.clone(), client.clone())));
        }
        if let Some(k) = &cfg.finnhub_key {
            fetchers.push(Arc::new(FinnhubFetcher::new(k.clone(), client.clone())));
        }
        if let Some(ua) = &cfg.sec_user_agent {
            fetchers.push(Arc::new(SecEdgarFetcher::new(ua.clone(), client.clone())));
        }
        if let Some(dir) = &cfg.mailbox_dir {
            fetchers.push(Arc::new(MailboxFetcher::new(dir.clone())));
        }

        Ok(Self::new(registry, fetchers)
            .with_default_limits(cfg.default_limits.clone())
            .with_limit_policy(cfg.limit_policy))
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    fn available_fetchers(&self, category: Category) -> Vec<&Arc<dyn SourceFetcher>> {
        self.fetchers
            .iter()
            .filter(|f| f.category() == category && self.registry.is_available(f.name()))
            .collect()
    }

    /// Per-fetcher limits for one category under the configured policy.
    fn shares(&self, limit: usize, fetcher_count: usize) -> Vec<usize> {
        match self.limit_policy {
            LimitPolicy::PerProvider => vec![limit; fetcher_count],
            LimitPolicy::SplitAcrossCategory => {
                let base = limit / fetcher_count;
                let extra = limit % fetcher_count;
                (0..fetcher_count)
                    .map(|i| base + usize::from(i < extra))
                    .collect()
            }
        }
    }

    /// Fan out across all available fetchers for every requested symbol.
    ///
    /// Failure semantics, in order of precedence: an invalid symbol fails
    /// only that symbol; an unavailable category is skipped silently; a
    /// failing fetcher contributes zero documents; a symbol with zero
    /// documents overall lands in `failed_symbols`. Nothing aborts the batch.
    pub async fn fetch_comprehensive_data(&self, request: &FetchRequest) -> FetchResult {
        ensure_metrics_described();
        counter!("fetch_requests_total").increment(1);

        let mut documents = Vec::new();
        let mut failed_symbols = Vec::new();

        for symbol in &request.symbols {
            if let Err(e) = validate_symbol(symbol) {
                tracing::warn!(symbol = %symbol, error = %e, "rejecting symbol");
                failed_symbols.push(symbol.clone());
                continue;
            }

            let before = documents.len();
            for category in Category::ALL {
                let limit = request
                    .requested_limit(category)
                    .unwrap_or_else(|| self.default_limits.get(category));
                if limit == 0 {
                    continue;
                }

                let fetchers = self.available_fetchers(category);
                if fetchers.is_empty() {
                    // Not an error: the whole category is simply absent.
                    continue;
                }

                let shares = self.shares(limit, fetchers.len());
                for (fetcher, share) in fetchers.into_iter().zip(shares) {
                    if share == 0 {
                        continue;
                    }
                    match fetcher.fetch(symbol, share).await {
                        Ok(docs) => {
                            for mut doc in docs.into_iter().take(share) {
                                let (annotated, _) = self.extractor.annotate(symbol, &doc.text);
                                doc.text = annotated;
                                doc.tag_source();
                                documents.push(doc);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                provider = fetcher.name(),
                                symbol = %symbol,
                                error = ?e,
                                "provider call failed; continuing without it"
                            );
                            counter!("fetch_provider_errors_total", "provider" => fetcher.name())
                                .increment(1);
                        }
                    }
                }
            }

            if documents.len() == before {
                counter!("fetch_failed_symbols_total").increment(1);
                failed_symbols.push(symbol.clone());
            }
        }

        gauge!("fetch_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        let breakdown = breakdown_by_marker(&documents);
        debug_assert_eq!(breakdown.values().sum::<usize>(), documents.len());

        FetchResult {
            documents,
            breakdown,
            failed_symbols,
        }
    }
}
