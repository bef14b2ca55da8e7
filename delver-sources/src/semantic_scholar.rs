//! Semantic Scholar adapter over the Graph API.
//!
//! Papers without an abstract are skipped; there is nothing for the
//! scorer or synthesizer to work with. Papers without a landing URL fall
//! back to their DOI link.

use async_trait::async_trait;
use delver_core::adapter::{RawFinding, SourceAdapter, SourceType};
use delver_core::error::AdapterError;
use serde_json::Value;
use std::time::Duration;

const API_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const FIELDS: &str = "title,abstract,authors,year,citationCount,url,externalIds";

pub struct SemanticScholarAdapter {
    max_results: usize,
}

impl SemanticScholarAdapter {
    pub fn new() -> Self {
        Self::with_max_results(5)
    }

    pub fn with_max_results(max_results: usize) -> Self {
        Self { max_results }
    }
}

impl Default for SemanticScholarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Academic
    }

    async fn search(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        tracing::debug!(query, "semantic scholar search");
        let client = crate::http_client(timeout).map_err(|e| AdapterError::Unavailable {
            source: "semantic_scholar".into(),
            message: e.to_string(),
        })?;
        let limit = self.max_results.to_string();
        let response = client
            .get(API_URL)
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", FIELDS),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable {
                source: "semantic_scholar".into(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::Unavailable {
                source: "semantic_scholar".into(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let body: Value = response.json().await.map_err(|e| AdapterError::Malformed {
            source: "semantic_scholar".into(),
            message: e.to_string(),
        })?;
        Ok(parse_papers(&body))
    }
}

fn parse_papers(body: &Value) -> Vec<RawFinding> {
    body["data"]
        .as_array()
        .map(|papers| papers.iter().filter_map(parse_paper).collect())
        .unwrap_or_default()
}

fn parse_paper(paper: &Value) -> Option<RawFinding> {
    let title = paper["title"].as_str()?;
    let abstract_text = paper["abstract"].as_str().filter(|a| !a.is_empty())?;
    let url = paper_url(paper)?;

    let authors: Vec<&str> = paper["authors"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| a["name"].as_str())
                .collect()
        })
        .unwrap_or_default();
    let author_line = if authors.len() > 5 {
        format!("{} et al.", authors[..5].join(", "))
    } else {
        authors.join(", ")
    };

    let year = paper["year"]
        .as_i64()
        .map(|y| y.to_string())
        .unwrap_or_else(|| "unknown".into());
    let citations = paper["citationCount"].as_i64().unwrap_or(0);

    let mut finding = RawFinding::new(&url, title, SourceType::Academic);
    finding.snippet = abstract_text.chars().take(300).collect();
    finding.content = format!(
        "{title}\n\nAuthors: {author_line}\nYear: {year}\nCitations: {citations}\n\nAbstract: {abstract_text}"
    );
    Some(finding)
}

fn paper_url(paper: &Value) -> Option<String> {
    if let Some(url) = paper["url"].as_str().filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    paper["externalIds"]["DOI"]
        .as_str()
        .filter(|doi| !doi.is_empty())
        .map(|doi| format!("https://doi.org/{doi}"))
}
