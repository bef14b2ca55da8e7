//! Source adapter contract.
//!
//! Every external search provider sits behind [`SourceAdapter`]: a plain
//! query string plus a per-call timeout in, a finite batch of raw findings
//! (or a source-unavailable error) out. New sources register with the
//! orchestrator without modifying it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AdapterError;

/// Category of an information source, used for base credibility weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Web,
    Wikipedia,
    Academic,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::Wikipedia => "wikipedia",
            SourceType::Academic => "academic",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved item as an adapter hands it over, before content
/// processing and credibility scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(default)]
    pub content: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl RawFinding {
    pub fn new(url: impl Into<String>, title: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: String::new(),
            content: String::new(),
            source_type,
            published_at: None,
        }
    }
}

/// A polymorphic search capability over one external provider.
///
/// Implementations must return within the given timeout where possible; the
/// orchestrator enforces it as a hard bound regardless. Failures surface as
/// [`AdapterError`] and are downgraded to warnings, never run failures.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in warnings and logs, e.g. `"wikipedia"`.
    fn name(&self) -> &str;

    /// The source category this adapter produces.
    fn source_type(&self) -> SourceType;

    /// Search the provider and return a finite batch of raw findings.
    async fn search(&self, query: &str, timeout: Duration)
        -> Result<Vec<RawFinding>, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_round_trips_through_serde() {
        let json = serde_json::to_string(&SourceType::Wikipedia).unwrap();
        assert_eq!(json, "\"wikipedia\"");
        let back: SourceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SourceType::Wikipedia);
    }

    #[test]
    fn raw_finding_defaults_are_empty() {
        let raw = RawFinding::new("https://example.com", "Example", SourceType::Web);
        assert!(raw.snippet.is_empty());
        assert!(raw.content.is_empty());
        assert!(raw.published_at.is_none());
    }
}
