// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod document;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod markers;
pub mod metrics;
pub mod registry;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{breakdown_by_marker, Aggregator, FetchRequest, FetchResult};
pub use crate::api::{create_router, AppState};
pub use crate::config::{AppConfig, CategoryLimits, LimitPolicy};
pub use crate::document::{format_source_marker, parse_source_marker, Document};
pub use crate::extract::EntityExtractor;
pub use crate::fetch::SourceFetcher;
pub use crate::index::{KnowledgeIndex, QueryAnswer, QueryMode, RagHttpClient};
pub use crate::markers::{filter_validated, parse_markers, Entity, EntityMarker, Provenance};
pub use crate::registry::{Category, ServiceDescriptor, ServiceRegistry};
