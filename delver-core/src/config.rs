//! Configuration for the Delver research engine.
//!
//! Uses `figment` for layered configuration: defaults -> `delver.toml` ->
//! `DELVER_`-prefixed environment variables. The engine itself never reads
//! globals; it receives an explicit [`ResearchConfig`] at construction and
//! one run never shares state with another.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::adapter::SourceType;
use crate::error::DelverError;

/// Top-level configuration for a research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Hard cap on search/evaluate passes. Guarantees termination even if
    /// completeness evaluation reports gaps forever.
    pub max_iterations: usize,
    /// Per-adapter call timeout in seconds. A slow adapter degrades to zero
    /// findings; it never stalls the sub-query.
    pub adapter_timeout_secs: u64,
    /// Findings scoring below this stay in state for the audit trail but
    /// are excluded from synthesis input.
    pub credibility_threshold: f64,
    /// Maximum sub-queries searched concurrently within one iteration.
    pub max_concurrent_queries: usize,
    /// Sub-queries requested from the first decomposition (3-5).
    pub max_sub_queries: usize,
    /// Sub-queries requested from gap-filling decompositions (1-3).
    pub max_followup_queries: usize,
    /// Upper bound on cleaned content length per finding, in characters.
    pub max_content_length: usize,
    /// Completeness score at or above which the loop exits early.
    pub min_completeness: f64,
    /// Credibility scoring weights and domain reputation table.
    pub scoring: ScoringConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            adapter_timeout_secs: 10,
            credibility_threshold: 0.0,
            max_concurrent_queries: 4,
            max_sub_queries: 5,
            max_followup_queries: 3,
            max_content_length: 4000,
            min_completeness: 0.8,
            scoring: ScoringConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Load configuration with figment layering:
    /// defaults -> `delver.toml` -> `DELVER_*` environment variables.
    pub fn load() -> Result<Self, DelverError> {
        Figment::from(Serialized::defaults(ResearchConfig::default()))
            .merge(Toml::file("delver.toml"))
            .merge(Env::prefixed("DELVER_").split("__"))
            .extract()
            .map_err(|e| DelverError::Config {
                message: e.to_string(),
            })
    }
}

/// Credibility scoring configuration: source-type base weights plus a
/// signed domain-reputation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub source_weights: SourceWeights,
    /// Signed adjustments added to the base weight. Positive for known
    /// high-trust domains, negative for known low-trust domains. Parent
    /// domains match subdomains (`ncbi.nlm.nih.gov` matches `nih.gov`).
    pub domain_adjustments: HashMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            source_weights: SourceWeights::default(),
            domain_adjustments: default_domain_adjustments(),
        }
    }
}

impl ScoringConfig {
    /// Base weight for a source type: academic > wikipedia > web.
    pub fn weight_for(&self, source_type: SourceType) -> f64 {
        match source_type {
            SourceType::Academic => self.source_weights.academic,
            SourceType::Wikipedia => self.source_weights.wikipedia,
            SourceType::Web => self.source_weights.web,
        }
    }
}

/// Base credibility weight per source type, on the [-1, 1] scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceWeights {
    pub academic: f64,
    pub wikipedia: f64,
    pub web: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            academic: 0.55,
            wikipedia: 0.35,
            web: 0.10,
        }
    }
}

/// Pre-scored domain reputation adjustments.
fn default_domain_adjustments() -> HashMap<String, f64> {
    let table: &[(&str, f64)] = &[
        // Authoritative
        ("nature.com", 0.45),
        ("science.org", 0.45),
        ("arxiv.org", 0.43),
        ("pubmed.ncbi.nlm.nih.gov", 0.45),
        ("scholar.google.com", 0.40),
        ("ieee.org", 0.43),
        ("acm.org", 0.42),
        ("semanticscholar.org", 0.40),
        ("who.int", 0.45),
        ("cdc.gov", 0.43),
        ("nih.gov", 0.44),
        ("wikipedia.org", 0.32),
        ("en.wikipedia.org", 0.32),
        ("britannica.com", 0.38),
        ("mit.edu", 0.40),
        ("stanford.edu", 0.40),
        ("harvard.edu", 0.40),
        // Reputable news
        ("reuters.com", 0.38),
        ("apnews.com", 0.38),
        ("bbc.com", 0.35),
        ("bbc.co.uk", 0.35),
        ("nytimes.com", 0.34),
        ("washingtonpost.com", 0.33),
        ("theguardian.com", 0.32),
        ("economist.com", 0.35),
        ("wsj.com", 0.34),
        ("ft.com", 0.34),
        ("bloomberg.com", 0.33),
        ("arstechnica.com", 0.30),
        ("techcrunch.com", 0.28),
        ("wired.com", 0.28),
        ("theverge.com", 0.25),
        // User-generated / aggregated
        ("medium.com", -0.05),
        ("substack.com", -0.05),
        ("reddit.com", -0.15),
        ("quora.com", -0.20),
    ];
    table.iter().map(|(d, s)| (d.to_string(), *s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.adapter_timeout_secs, 10);
        assert_eq!(config.credibility_threshold, 0.0);
        assert!(config.max_sub_queries >= 3 && config.max_sub_queries <= 5);
        assert!(config.max_followup_queries >= 1 && config.max_followup_queries <= 3);
    }

    #[test]
    fn source_weights_rank_academic_highest() {
        let scoring = ScoringConfig::default();
        assert!(
            scoring.weight_for(SourceType::Academic) > scoring.weight_for(SourceType::Wikipedia)
        );
        assert!(scoring.weight_for(SourceType::Wikipedia) > scoring.weight_for(SourceType::Web));
    }

    #[test]
    fn domain_table_has_signed_entries() {
        let scoring = ScoringConfig::default();
        assert!(scoring.domain_adjustments["nature.com"] > 0.0);
        assert!(scoring.domain_adjustments["quora.com"] < 0.0);
    }
}
