//! # Service availability registry
//!
//! Answers "is provider X usable right now?" over a configuration snapshot
//! taken at startup. Availability is derived from the presence of each
//! provider's credential (or, for EDGAR, a User-Agent string; for the email
//! channel, a mailbox path). Read-only after construction, so it can be
//! shared freely across concurrent requests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Data category a provider serves. One provider serves exactly one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Email,
    Financial,
    Market,
    Sec,
    Research,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::News,
        Category::Email,
        Category::Financial,
        Category::Market,
        Category::Sec,
        Category::Research,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Email => "email",
            Category::Financial => "financial",
            Category::Market => "market",
            Category::Sec => "sec",
            Category::Research => "research",
        }
    }
}

/// One external provider, as seen by the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub category: Category,
    pub available: bool,
}

/// Immutable availability snapshot, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Derive the snapshot from configuration. A provider is available iff
    /// its credential is present and it is not disabled by the TOML override
    /// file.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let entries: [(&'static str, Category, bool); 9] = [
            ("NEWSAPI", Category::News, cfg.newsapi_key.is_some()),
            ("MARKETAUX", Category::News, cfg.marketaux_key.is_some()),
            ("BENZINGA", Category::Research, cfg.benzinga_key.is_some()),
            ("ALPHAVANTAGE", Category::Market, cfg.alpha_vantage_key.is_some()),
            ("POLYGON", Category::Market, cfg.polygon_key.is_some()),
            ("FMP", Category::Financial, cfg.fmp_key.is_some()),
            ("FINNHUB", Category::Financial, cfg.finnhub_key.is_some()),
            ("EDGAR", Category::Sec, cfg.sec_user_agent.is_some()),
            ("EMAIL", Category::Email, cfg.mailbox_dir.is_some()),
        ];

        let services = entries
            .into_iter()
            .map(|(name, category, configured)| ServiceDescriptor {
                name,
                category,
                available: configured && !cfg.disabled_providers.iter().any(|d| d.eq_ignore_ascii_case(name)),
            })
            .collect();

        Self { services }
    }

    /// Build a registry from explicit descriptors. Used by tests and by
    /// callers wiring mock fetchers.
    pub fn from_descriptors(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }

    /// Unknown names answer `false` rather than erroring, which keeps the
    /// aggregator's fan-out loop total.
    pub fn is_available(&self, name: &str) -> bool {
        self.services
            .iter()
            .any(|s| s.available && s.name.eq_ignore_ascii_case(name))
    }

    pub fn list_available(&self) -> BTreeSet<&'static str> {
        self.services
            .iter()
            .filter(|s| s.available)
            .map(|s| s.name)
            .collect()
    }

    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.services
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.category)
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.services
    }
}
