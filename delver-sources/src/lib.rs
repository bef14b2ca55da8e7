//! # Delver Sources
//!
//! Concrete [`SourceAdapter`] implementations for the Delver research
//! engine: web search (DuckDuckGo), Wikipedia, arXiv, and Semantic
//! Scholar. Each adapter degrades to a source-unavailable error on
//! failure; the orchestrator treats that as zero findings, never as a run
//! failure.

pub mod arxiv;
mod html;
pub mod semantic_scholar;
pub mod web;
pub mod wikipedia;

pub use arxiv::ArxivAdapter;
pub use semantic_scholar::SemanticScholarAdapter;
pub use web::DuckDuckGoAdapter;
pub use wikipedia::WikipediaAdapter;

use delver_core::adapter::SourceAdapter;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const USER_AGENT: &str = "delver/0.1 (research-bot)";

/// HTTP client shared setup: research-bot user agent, bounded redirects,
/// and the caller's per-call timeout applied client-wide.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
}

/// The standard adapter set: web, encyclopedia, and two academic indexes.
pub fn default_adapters() -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(DuckDuckGoAdapter::new()),
        Arc::new(WikipediaAdapter::new()),
        Arc::new(ArxivAdapter::new()),
        Arc::new(SemanticScholarAdapter::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_core::adapter::SourceType;

    #[test]
    fn default_set_covers_all_source_types() {
        let adapters = default_adapters();
        assert_eq!(adapters.len(), 4);
        let types: Vec<SourceType> = adapters.iter().map(|a| a.source_type()).collect();
        assert!(types.contains(&SourceType::Web));
        assert!(types.contains(&SourceType::Wikipedia));
        assert_eq!(
            types.iter().filter(|t| **t == SourceType::Academic).count(),
            2
        );
    }
}
