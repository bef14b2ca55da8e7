//! Per-run research state.
//!
//! One [`ResearchState`] exists per run, owned exclusively by the engine
//! driving that run. Parallel adapter results merge into it through a
//! single insertion point, which is what keeps the URL-uniqueness
//! invariant cheap to uphold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::adapter::SourceType;

/// A narrower question derived from the user's original query, searched
/// independently and consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    pub text: String,
    /// Iteration (0-based) whose decomposition produced this sub-query.
    pub origin_iteration: usize,
}

impl SubQuery {
    pub fn new(text: impl Into<String>, origin_iteration: usize) -> Self {
        Self {
            text: text.into(),
            origin_iteration,
        }
    }
}

/// One retrieved item after normalization and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub content: String,
    pub source_type: SourceType,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Bounded trust estimate in [-1, 1].
    pub credibility_score: f64,
}

/// Phase of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Decomposing,
    Searching,
    Evaluating,
    Synthesizing,
    Done,
    Failed,
}

/// A pair of findings flagged as asserting materially different claims
/// about the same topic. Advisory: surfaced in the report, never a gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub first_url: String,
    pub first_title: String,
    pub second_url: String,
    pub second_title: String,
    /// Human-readable trigger, e.g. `'increase' vs 'decrease'`.
    pub signal: String,
}

/// Canonical dedup key for a finding URL: case-insensitive and
/// trailing-slash-insensitive.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

/// Accumulated state of one research run.
#[derive(Debug)]
pub struct ResearchState {
    pub id: Uuid,
    pub original_query: String,
    pub phase: RunPhase,
    /// 0-based count of completed search passes, monotone, bounded by the
    /// configured maximum.
    pub iteration: usize,
    findings: Vec<Finding>,
    seen_urls: HashSet<String>,
    pub covered_aspects: BTreeSet<String>,
    pub gaps: Vec<String>,
    pub warnings: Vec<String>,
    pub contradictions: Vec<Contradiction>,
}

impl ResearchState {
    pub fn new(original_query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_query: original_query.into(),
            phase: RunPhase::Decomposing,
            iteration: 0,
            findings: Vec::new(),
            seen_urls: HashSet::new(),
            covered_aspects: BTreeSet::new(),
            gaps: Vec::new(),
            warnings: Vec::new(),
            contradictions: Vec::new(),
        }
    }

    pub fn transition(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    /// Insert a finding unless its normalized URL was already accepted.
    /// Returns whether the finding was accepted (first-seen wins).
    pub fn insert(&mut self, finding: Finding) -> bool {
        let key = normalize_url(&finding.url);
        if key.is_empty() || !self.seen_urls.insert(key) {
            return false;
        }
        self.findings.push(finding);
        true
    }

    /// All findings in discovery order, including below-threshold ones.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings at or above the credibility threshold, ordered by
    /// descending credibility with discovery order breaking ties.
    pub fn retained(&self, threshold: f64) -> Vec<&Finding> {
        let mut retained: Vec<&Finding> = self
            .findings
            .iter()
            .filter(|f| f.credibility_score >= threshold)
            .collect();
        // Stable sort: equal scores keep discovery order.
        retained.sort_by(|a, b| {
            b.credibility_score
                .partial_cmp(&a.credibility_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        retained
    }

    /// Record a completeness evaluation: aspects that stop appearing as
    /// gaps count as covered from here on.
    pub fn record_evaluation(&mut self, gaps: Vec<String>) {
        for old_gap in self.gaps.drain(..) {
            if !gaps.contains(&old_gap) {
                self.covered_aspects.insert(old_gap);
            }
        }
        self.gaps = gaps;
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finding(url: &str, score: f64) -> Finding {
        Finding {
            url: url.to_string(),
            title: format!("Title for {url}"),
            snippet: String::new(),
            content: String::new(),
            source_type: SourceType::Web,
            domain: String::new(),
            published_at: None,
            credibility_score: score,
        }
    }

    #[test]
    fn normalize_url_is_case_and_slash_insensitive() {
        assert_eq!(
            normalize_url("https://Example.com/Path/"),
            normalize_url("https://example.com/path")
        );
        assert_eq!(normalize_url("  https://a.com/ "), "https://a.com");
    }

    #[test]
    fn insert_dedups_by_normalized_url_first_seen_wins() {
        let mut state = ResearchState::new("q");
        assert!(state.insert(finding("https://example.com/a", 0.9)));
        assert!(!state.insert(finding("https://EXAMPLE.com/a/", 0.1)));
        assert_eq!(state.findings().len(), 1);
        assert_eq!(state.findings()[0].credibility_score, 0.9);
    }

    #[test]
    fn insert_rejects_empty_urls() {
        let mut state = ResearchState::new("q");
        assert!(!state.insert(finding("", 0.5)));
        assert!(state.findings().is_empty());
    }

    #[test]
    fn retained_filters_and_sorts_stably() {
        let mut state = ResearchState::new("q");
        state.insert(finding("https://a.com", 0.3));
        state.insert(finding("https://b.com", 0.8));
        state.insert(finding("https://c.com", 0.8));
        state.insert(finding("https://d.com", -0.2));

        let retained = state.retained(0.0);
        let urls: Vec<&str> = retained.iter().map(|f| f.url.as_str()).collect();
        // b before c: same score, discovery order preserved.
        assert_eq!(urls, vec!["https://b.com", "https://c.com", "https://a.com"]);
        // The below-threshold finding stays in the audit trail.
        assert_eq!(state.findings().len(), 4);
    }

    #[test]
    fn record_evaluation_promotes_closed_gaps() {
        let mut state = ResearchState::new("q");
        state.record_evaluation(vec!["economic impact".into(), "history".into()]);
        state.record_evaluation(vec!["history".into()]);
        assert!(state.covered_aspects.contains("economic impact"));
        assert_eq!(state.gaps, vec!["history".to_string()]);
    }
}
