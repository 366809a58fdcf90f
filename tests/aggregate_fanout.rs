// tests/aggregate_fanout.rs
//
// Fan-out behavior of the aggregator against deterministic mock fetchers:
// per-source limits, graceful degradation, failure isolation, and the
// breakdown re-derived from inline source markers.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use ice_aggregator::{
    parse_source_marker, Aggregator, Category, Document, FetchRequest, LimitPolicy,
    ServiceDescriptor, ServiceRegistry, SourceFetcher,
};

struct StubFetcher {
    name: &'static str,
    category: Category,
    available_docs: usize,
    fail: bool,
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Document>> {
        if self.fail {
            anyhow::bail!("simulated outage for {}", self.name);
        }
        Ok((0..self.available_docs.min(limit))
            .map(|i| {
                Document::new(
                    self.name,
                    symbol,
                    format!("{} item {} about {}", self.name, i, symbol),
                )
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }
}

fn descriptor(name: &'static str, category: Category, available: bool) -> ServiceDescriptor {
    ServiceDescriptor {
        name,
        category,
        available,
    }
}

/// One news, one email, one sec provider; email availability is a knob.
fn three_source_aggregator(email_available: bool) -> Aggregator {
    let registry = ServiceRegistry::from_descriptors(vec![
        descriptor("NEWS", Category::News, true),
        descriptor("EMAIL", Category::Email, email_available),
        descriptor("SEC", Category::Sec, true),
    ]);
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![
        Arc::new(StubFetcher {
            name: "NEWS",
            category: Category::News,
            available_docs: 10,
            fail: false,
        }),
        Arc::new(StubFetcher {
            name: "EMAIL",
            category: Category::Email,
            available_docs: 10,
            fail: false,
        }),
        Arc::new(StubFetcher {
            name: "SEC",
            category: Category::Sec,
            available_docs: 10,
            fail: false,
        }),
    ];
    Aggregator::new(registry, fetchers)
}

fn nvda_request() -> FetchRequest {
    FetchRequest {
        news_limit: Some(2),
        email_limit: Some(3),
        sec_limit: Some(2),
        financial_limit: Some(0),
        market_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["NVDA"])
    }
}

#[tokio::test]
async fn comprehensive_fetch_with_all_sources_up() {
    let result = three_source_aggregator(true)
        .fetch_comprehensive_data(&nvda_request())
        .await;

    assert_eq!(result.documents.len(), 7);
    assert_eq!(result.breakdown.get("NEWS"), Some(&2));
    assert_eq!(result.breakdown.get("EMAIL"), Some(&3));
    assert_eq!(result.breakdown.get("SEC"), Some(&2));
    assert!(result.failed_symbols.is_empty());
    assert_eq!(
        result.breakdown.values().sum::<usize>(),
        result.documents.len()
    );
}

#[tokio::test]
async fn unavailable_provider_degrades_without_error() {
    let result = three_source_aggregator(false)
        .fetch_comprehensive_data(&nvda_request())
        .await;

    assert_eq!(result.documents.len(), 4);
    assert_eq!(result.breakdown.get("NEWS"), Some(&2));
    assert_eq!(result.breakdown.get("SEC"), Some(&2));
    assert!(result.breakdown.get("EMAIL").is_none());
    assert!(result.failed_symbols.is_empty());
}

#[tokio::test]
async fn symbol_with_no_data_lands_in_failed_symbols() {
    let registry =
        ServiceRegistry::from_descriptors(vec![descriptor("NEWS", Category::News, true)]);
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![Arc::new(StubFetcher {
        name: "NEWS",
        category: Category::News,
        available_docs: 0,
        fail: false,
    })];
    let agg = Aggregator::new(registry, fetchers);

    let result = agg
        .fetch_comprehensive_data(&FetchRequest::for_symbols(["ZZZZ"]))
        .await;
    assert!(result.documents.is_empty());
    assert_eq!(result.failed_symbols, vec!["ZZZZ".to_string()]);
}

#[tokio::test]
async fn one_failing_fetcher_does_not_take_down_the_rest() {
    let registry = ServiceRegistry::from_descriptors(vec![
        descriptor("NEWS", Category::News, true),
        descriptor("WOBBLY", Category::News, true),
        descriptor("SEC", Category::Sec, true),
    ]);
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![
        Arc::new(StubFetcher {
            name: "NEWS",
            category: Category::News,
            available_docs: 5,
            fail: false,
        }),
        Arc::new(StubFetcher {
            name: "WOBBLY",
            category: Category::News,
            available_docs: 5,
            fail: true,
        }),
        Arc::new(StubFetcher {
            name: "SEC",
            category: Category::Sec,
            available_docs: 5,
            fail: false,
        }),
    ];
    let agg = Aggregator::new(registry, fetchers);

    let request = FetchRequest {
        news_limit: Some(2),
        sec_limit: Some(1),
        email_limit: Some(0),
        financial_limit: Some(0),
        market_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["NVDA"])
    };
    let result = agg.fetch_comprehensive_data(&request).await;

    assert_eq!(result.breakdown.get("NEWS"), Some(&2));
    assert_eq!(result.breakdown.get("SEC"), Some(&1));
    assert!(result.breakdown.get("WOBBLY").is_none());
    // The broken provider is not a failed *symbol*.
    assert!(result.failed_symbols.is_empty());
}

#[tokio::test]
async fn per_source_counts_never_exceed_the_requested_limit() {
    let result = three_source_aggregator(true)
        .fetch_comprehensive_data(&nvda_request())
        .await;
    assert!(*result.breakdown.get("NEWS").unwrap() <= 2);
    assert!(*result.breakdown.get("EMAIL").unwrap() <= 3);
    assert!(*result.breakdown.get("SEC").unwrap() <= 2);
}

#[tokio::test]
async fn per_provider_limit_applies_to_each_provider_of_a_category() {
    let registry = ServiceRegistry::from_descriptors(vec![
        descriptor("NEWS", Category::News, true),
        descriptor("WIRE", Category::News, true),
    ]);
    let make = |name| -> Arc<dyn SourceFetcher> {
        Arc::new(StubFetcher {
            name,
            category: Category::News,
            available_docs: 10,
            fail: false,
        })
    };
    let agg = Aggregator::new(registry, vec![make("NEWS"), make("WIRE")]);

    let request = FetchRequest {
        news_limit: Some(2),
        email_limit: Some(0),
        financial_limit: Some(0),
        market_limit: Some(0),
        sec_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["NVDA"])
    };
    let result = agg.fetch_comprehensive_data(&request).await;

    // Two providers, two documents each.
    assert_eq!(result.documents.len(), 4);
    assert_eq!(result.breakdown.get("NEWS"), Some(&2));
    assert_eq!(result.breakdown.get("WIRE"), Some(&2));
}

#[tokio::test]
async fn split_policy_divides_the_category_limit() {
    let registry = ServiceRegistry::from_descriptors(vec![
        descriptor("NEWS", Category::News, true),
        descriptor("WIRE", Category::News, true),
    ]);
    let make = |name| -> Arc<dyn SourceFetcher> {
        Arc::new(StubFetcher {
            name,
            category: Category::News,
            available_docs: 10,
            fail: false,
        })
    };
    let agg = Aggregator::new(registry, vec![make("NEWS"), make("WIRE")])
        .with_limit_policy(LimitPolicy::SplitAcrossCategory);

    let request = FetchRequest {
        news_limit: Some(3),
        email_limit: Some(0),
        financial_limit: Some(0),
        market_limit: Some(0),
        sec_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["NVDA"])
    };
    let result = agg.fetch_comprehensive_data(&request).await;

    assert_eq!(result.documents.len(), 3);
    assert_eq!(result.breakdown.get("NEWS"), Some(&2));
    assert_eq!(result.breakdown.get("WIRE"), Some(&1));
}

#[tokio::test]
async fn identical_requests_yield_identical_content_and_order() {
    let agg = three_source_aggregator(true);
    let a = agg.fetch_comprehensive_data(&nvda_request()).await;
    let b = agg.fetch_comprehensive_data(&nvda_request()).await;

    let texts = |r: &ice_aggregator::FetchResult| {
        r.documents.iter().map(|d| d.text.clone()).collect::<Vec<_>>()
    };
    assert_eq!(texts(&a), texts(&b));
    assert_eq!(a.breakdown, b.breakdown);
    assert_eq!(a.failed_symbols, b.failed_symbols);
}

#[tokio::test]
async fn every_marker_names_a_currently_available_service() {
    let agg = three_source_aggregator(false);
    let result = agg.fetch_comprehensive_data(&nvda_request()).await;
    let available = agg.registry().list_available();

    for doc in &result.documents {
        let (source, symbol) = parse_source_marker(&doc.text).expect("document must be tagged");
        assert!(available.contains(source.as_str()), "untracked source {source}");
        assert_eq!(symbol, "NVDA");
    }
}

#[tokio::test]
async fn empty_symbol_fails_alone_without_aborting_the_batch() {
    let agg = three_source_aggregator(true);
    let request = FetchRequest {
        news_limit: Some(1),
        email_limit: Some(0),
        sec_limit: Some(0),
        financial_limit: Some(0),
        market_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["", "NVDA"])
    };
    let result = agg.fetch_comprehensive_data(&request).await;

    assert_eq!(result.failed_symbols, vec!["".to_string()]);
    assert_eq!(result.documents.len(), 1);
    let (_, symbol) = parse_source_marker(&result.documents[0].text).unwrap();
    assert_eq!(symbol, "NVDA");
}

#[tokio::test]
async fn category_without_any_registered_fetcher_is_skipped_silently() {
    // Only a news fetcher exists, but the request asks for sec too.
    let registry =
        ServiceRegistry::from_descriptors(vec![descriptor("NEWS", Category::News, true)]);
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![Arc::new(StubFetcher {
        name: "NEWS",
        category: Category::News,
        available_docs: 10,
        fail: false,
    })];
    let agg = Aggregator::new(registry, fetchers);

    let request = FetchRequest {
        news_limit: Some(2),
        sec_limit: Some(5),
        email_limit: Some(0),
        financial_limit: Some(0),
        market_limit: Some(0),
        research_limit: Some(0),
        ..FetchRequest::for_symbols(["NVDA"])
    };
    let result = agg.fetch_comprehensive_data(&request).await;

    assert_eq!(result.documents.len(), 2);
    assert!(result.failed_symbols.is_empty());
}
