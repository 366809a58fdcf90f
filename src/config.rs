//! # Configuration
//!
//! Environment-variable driven snapshot, taken once at startup and immutable
//! afterward. Credential names are the external contract
//! (`NEWSAPI_ORG_API_KEY`, `ALPHA_VANTAGE_API_KEY`, `FMP_API_KEY`,
//! `FINNHUB_API_KEY`, `POLYGON_API_KEY`, `OPENAI_API_KEY`, ...).
//!
//! An optional `config/providers.toml` can disable providers or change
//! default per-category limits without touching the environment:
//!
//! ```toml
//! disabled = ["BENZINGA"]
//!
//! [limits]
//! news = 10
//! sec = 3
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::Category;

pub const ENV_PROVIDERS_CONFIG_PATH: &str = "ICE_PROVIDERS_CONFIG_PATH";
const DEFAULT_PROVIDERS_CONFIG_PATH: &str = "config/providers.toml";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.80;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CATEGORY_LIMIT: usize = 5;

/// How a per-category limit is applied across multiple providers of the same
/// category (the fan-out ambiguity is resolved by making it explicit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitPolicy {
    /// `news_limit=2` with two news providers yields up to 4 news documents.
    #[default]
    PerProvider,
    /// The category limit is divided across its providers (remainder to the
    /// earliest-registered ones).
    SplitAcrossCategory,
}

impl LimitPolicy {
    fn from_env_value(v: &str) -> Option<Self> {
        match v.to_ascii_lowercase().as_str() {
            "per-provider" | "per_provider" => Some(LimitPolicy::PerProvider),
            "split-across-category" | "split_across_category" => {
                Some(LimitPolicy::SplitAcrossCategory)
            }
            _ => None,
        }
    }
}

/// Default number of documents requested per category when a FetchRequest
/// leaves the category's limit unset.
#[derive(Debug, Clone)]
pub struct CategoryLimits {
    limits: HashMap<Category, usize>,
}

impl Default for CategoryLimits {
    fn default() -> Self {
        let limits = Category::ALL
            .iter()
            .map(|c| (*c, DEFAULT_CATEGORY_LIMIT))
            .collect();
        Self { limits }
    }
}

impl CategoryLimits {
    pub fn get(&self, category: Category) -> usize {
        self.limits
            .get(&category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_LIMIT)
    }

    pub fn set(&mut self, category: Category, limit: usize) {
        self.limits.insert(category, limit);
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Provider credentials; absence means the provider is unavailable.
    pub newsapi_key: Option<String>,
    pub marketaux_key: Option<String>,
    pub benzinga_key: Option<String>,
    pub alpha_vantage_key: Option<String>,
    pub polygon_key: Option<String>,
    pub fmp_key: Option<String>,
    pub finnhub_key: Option<String>,
    /// EDGAR has no API key but refuses anonymous clients; the UA string is
    /// its effective credential.
    pub sec_user_agent: Option<String>,
    /// Directory the email channel reads `.txt`/`.eml` files from.
    pub mailbox_dir: Option<PathBuf>,

    // Knowledge-index boundary.
    pub openai_api_key: Option<String>,
    pub rag_service_url: Option<String>,

    pub default_limits: CategoryLimits,
    pub limit_policy: LimitPolicy,
    /// Markers at or above this are "validated" at query time.
    pub confidence_threshold: f32,
    pub fetch_timeout_secs: u64,
    pub port: u16,

    /// Providers force-disabled via `config/providers.toml`.
    pub disabled_providers: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            newsapi_key: None,
            marketaux_key: None,
            benzinga_key: None,
            alpha_vantage_key: None,
            polygon_key: None,
            fmp_key: None,
            finnhub_key: None,
            sec_user_agent: None,
            mailbox_dir: None,
            openai_api_key: None,
            rag_service_url: None,
            default_limits: CategoryLimits::default(),
            limit_policy: LimitPolicy::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            port: 8080,
            disabled_providers: Vec::new(),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_nonempty(name).and_then(|v| v.parse().ok())
}

impl AppConfig {
    /// Snapshot the environment, then apply the optional TOML override file.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            newsapi_key: env_nonempty("NEWSAPI_ORG_API_KEY"),
            marketaux_key: env_nonempty("MARKETAUX_API_KEY"),
            benzinga_key: env_nonempty("BENZINGA_API_KEY"),
            alpha_vantage_key: env_nonempty("ALPHA_VANTAGE_API_KEY"),
            polygon_key: env_nonempty("POLYGON_API_KEY"),
            fmp_key: env_nonempty("FMP_API_KEY"),
            finnhub_key: env_nonempty("FINNHUB_API_KEY"),
            sec_user_agent: env_nonempty("SEC_EDGAR_USER_AGENT"),
            mailbox_dir: env_nonempty("ICE_MAILBOX_DIR").map(PathBuf::from),
            openai_api_key: env_nonempty("OPENAI_API_KEY"),
            rag_service_url: env_nonempty("RAG_SERVICE_URL"),
            ..Self::default()
        };

        if let Some(t) = env_parse::<f32>("CONFIDENCE_THRESHOLD") {
            cfg.confidence_threshold = t.clamp(0.0, 1.0);
        }
        if let Some(t) = env_parse::<u64>("FETCH_TIMEOUT_SECS") {
            cfg.fetch_timeout_secs = t;
        }
        if let Some(p) = env_parse::<u16>("PORT") {
            cfg.port = p;
        }
        if let Some(policy) = env_nonempty("FETCH_LIMIT_POLICY").and_then(|v| LimitPolicy::from_env_value(&v))
        {
            cfg.limit_policy = policy;
        }

        for (category, var) in [
            (Category::News, "NEWS_LIMIT"),
            (Category::Email, "EMAIL_LIMIT"),
            (Category::Financial, "FINANCIAL_LIMIT"),
            (Category::Market, "MARKET_LIMIT"),
            (Category::Sec, "SEC_LIMIT"),
            (Category::Research, "RESEARCH_LIMIT"),
        ] {
            if let Some(l) = env_parse::<usize>(var) {
                cfg.default_limits.set(category, l);
            }
        }

        if let Err(e) = cfg.apply_providers_file_default() {
            tracing::warn!(error = ?e, "provider override file ignored");
        }

        cfg
    }

    /// Apply overrides from `$ICE_PROVIDERS_CONFIG_PATH`, falling back to
    /// `config/providers.toml`. A missing file is not an error.
    fn apply_providers_file_default(&mut self) -> Result<()> {
        let path = std::env::var(ENV_PROVIDERS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PROVIDERS_CONFIG_PATH));
        if !path.exists() {
            return Ok(());
        }
        self.apply_providers_file(&path)
    }

    pub fn apply_providers_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading provider overrides from {}", path.display()))?;
        let overrides: ProviderOverrides =
            toml::from_str(&content).context("parsing provider overrides toml")?;

        self.disabled_providers = overrides
            .disabled
            .into_iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(limits) = overrides.limits {
            for (category, value) in [
                (Category::News, limits.news),
                (Category::Email, limits.email),
                (Category::Financial, limits.financial),
                (Category::Market, limits.market),
                (Category::Sec, limits.sec),
                (Category::Research, limits.research),
            ] {
                if let Some(v) = value {
                    self.default_limits.set(category, v);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderOverrides {
    #[serde(default)]
    disabled: Vec<String>,
    #[serde(default)]
    limits: Option<LimitOverrides>,
}

#[derive(Debug, Deserialize)]
struct LimitOverrides {
    news: Option<usize>,
    email: Option<usize>,
    financial: Option<usize>,
    market: Option<usize>,
    sec: Option<usize>,
    research: Option<usize>,
}
