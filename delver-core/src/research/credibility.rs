//! Rule-based credibility scoring and contradiction flagging.
//!
//! Scores are deterministic and bounded to [-1, 1]: a base weight per
//! source type, a signed domain-reputation adjustment, and content-quality
//! signals. Low scorers are retained in state for the audit trail and only
//! excluded from synthesis input.

use crate::adapter::SourceType;
use crate::config::ScoringConfig;
use crate::research::state::{Contradiction, Finding};
use std::collections::HashSet;

/// Vocabulary suggesting factual, sourced content.
const DATA_MARKERS: &[&str] = &[
    "%",
    "study",
    "research",
    "data",
    "according to",
    "published",
    "found that",
    "results",
    "evidence",
    "analysis",
];

/// Opposing-polarity word pairs used by the contradiction flagger.
const POLARITY_PAIRS: &[(&str, &str)] = &[
    ("increase", "decrease"),
    ("rise", "fall"),
    ("higher", "lower"),
    ("growth", "decline"),
    ("benefit", "harm"),
    ("support", "oppose"),
    ("effective", "ineffective"),
    ("safe", "dangerous"),
    ("proven", "unproven"),
    ("confirm", "deny"),
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
    "could", "of", "in", "to", "for", "with", "on", "at", "from", "by", "about", "as", "into",
    "through", "this", "that", "these", "those", "it", "its", "and", "but", "or",
];

/// Minimum keyword overlap before two findings are considered to address
/// the same topic.
const MIN_TOPIC_OVERLAP: f64 = 0.1;

/// Assigns each finding a trust score in [-1, 1].
pub struct CredibilityScorer {
    scoring: ScoringConfig,
}

impl CredibilityScorer {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Score one finding in place and return the score.
    pub fn score(&self, finding: &mut Finding) -> f64 {
        let total = self.scoring.weight_for(finding.source_type)
            + self.domain_adjustment(&finding.domain)
            + self.content_adjustment(finding);
        finding.credibility_score = (total.clamp(-1.0, 1.0) * 1000.0).round() / 1000.0;
        finding.credibility_score
    }

    pub fn score_all(&self, findings: &mut [Finding]) {
        for finding in findings.iter_mut() {
            self.score(finding);
        }
    }

    /// Signed reputation adjustment for a domain. Exact match first, then
    /// parent-domain suffixes, then TLD heuristics.
    fn domain_adjustment(&self, domain: &str) -> f64 {
        if domain.is_empty() {
            return -0.10;
        }
        if let Some(adjustment) = self.scoring.domain_adjustments.get(domain) {
            return *adjustment;
        }
        let parts: Vec<&str> = domain.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            if let Some(adjustment) = self.scoring.domain_adjustments.get(&parts[i..].join(".")) {
                return *adjustment;
            }
        }
        if domain.ends_with(".edu") || domain.ends_with(".ac.uk") {
            return 0.30;
        }
        if domain.ends_with(".gov") {
            return 0.33;
        }
        if domain.ends_with(".org") {
            return 0.10;
        }
        0.0
    }

    /// Content-quality signals: substance length, factual-marker
    /// vocabulary, a publication date, and the academic bonus. Empty
    /// content is penalized.
    fn content_adjustment(&self, finding: &Finding) -> f64 {
        let content = if finding.content.is_empty() {
            &finding.snippet
        } else {
            &finding.content
        };
        if content.is_empty() {
            return -0.25;
        }

        let mut adjustment = 0.0;
        if content.len() > 1000 {
            adjustment += 0.10;
        } else if content.len() > 500 {
            adjustment += 0.06;
        }

        let lower = content.to_lowercase();
        let markers = DATA_MARKERS.iter().filter(|m| lower.contains(**m)).count();
        adjustment += (markers as f64 * 0.02).min(0.10);

        if finding.published_at.is_some() {
            adjustment += 0.05;
        }
        if finding.source_type == SourceType::Academic {
            adjustment += 0.05;
        }
        adjustment
    }

    /// Flag pairs of findings that address the same topic (keyword
    /// overlap) while using opposing polarity vocabulary or materially
    /// different numbers. Advisory only.
    pub fn detect_contradictions(&self, findings: &[Finding]) -> Vec<Contradiction> {
        let mut contradictions = Vec::new();
        let texts: Vec<String> = findings
            .iter()
            .map(|f| format!("{} {}", f.content, f.snippet).to_lowercase())
            .collect();
        let keywords: Vec<HashSet<String>> = texts.iter().map(|t| extract_keywords(t)).collect();

        for i in 0..findings.len() {
            for j in (i + 1)..findings.len() {
                if keyword_overlap(&keywords[i], &keywords[j]) < MIN_TOPIC_OVERLAP {
                    continue;
                }
                if let Some(signal) = polarity_signal(&keywords[i], &keywords[j])
                    .or_else(|| numeric_signal(&texts[i], &texts[j]))
                {
                    contradictions.push(Contradiction {
                        first_url: findings[i].url.clone(),
                        first_title: findings[i].title.clone(),
                        second_url: findings[j].url.clone(),
                        second_title: findings[j].title.clone(),
                        signal,
                    });
                }
            }
        }
        contradictions
    }
}

fn extract_keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '%' && c != '.')
        .map(|w| w.trim_matches('.'))
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

fn polarity_signal(a: &HashSet<String>, b: &HashSet<String>) -> Option<String> {
    for (positive, negative) in POLARITY_PAIRS {
        if a.contains(*positive) && b.contains(*negative) {
            return Some(format!("'{positive}' vs '{negative}'"));
        }
        if a.contains(*negative) && b.contains(*positive) {
            return Some(format!("'{negative}' vs '{positive}'"));
        }
    }
    None
}

fn numeric_signal(a: &str, b: &str) -> Option<String> {
    let numbers_a = extract_numbers(a);
    let numbers_b = extract_numbers(b);
    for na in &numbers_a {
        for nb in &numbers_b {
            if (na - nb).abs() > f64::EPSILON && (na - nb).abs() / na.abs().max(1.0) > 0.1 {
                return Some(format!("{na} vs {nb}"));
            }
        }
    }
    None
}

fn extract_numbers(text: &str) -> Vec<f64> {
    text.split(|c: char| !c.is_ascii_digit() && c != '.')
        .filter(|s| !s.is_empty() && s.chars().any(|c| c.is_ascii_digit()))
        .filter_map(|s| s.trim_matches('.').parse::<f64>().ok())
        .collect()
}
