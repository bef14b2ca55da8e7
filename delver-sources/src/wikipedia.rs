//! Wikipedia adapter: MediaWiki search followed by intro extracts.
//!
//! Two-step flow: `list=search` finds page titles, then `prop=extracts`
//! pulls the plain-text introduction for each page. Extracts fetch
//! concurrently; a page whose extract fails simply arrives without content.

use async_trait::async_trait;
use delver_core::adapter::{RawFinding, SourceAdapter, SourceType};
use delver_core::error::AdapterError;
use serde_json::Value;
use std::time::Duration;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaAdapter {
    max_results: usize,
}

impl WikipediaAdapter {
    pub fn new() -> Self {
        Self::with_max_results(3)
    }

    pub fn with_max_results(max_results: usize) -> Self {
        Self { max_results }
    }

    async fn fetch_extract(&self, client: &reqwest::Client, title: &str) -> Option<String> {
        let response = client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .ok()?;
        let body: Value = response.json().await.ok()?;
        parse_extract(&body)
    }
}

impl Default for WikipediaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Wikipedia
    }

    async fn search(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        tracing::debug!(query, "wikipedia search");
        let client = crate::http_client(timeout).map_err(|e| AdapterError::Unavailable {
            source: "wikipedia".into(),
            message: e.to_string(),
        })?;
        let limit = self.max_results.to_string();
        let response = client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable {
                source: "wikipedia".into(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::Unavailable {
                source: "wikipedia".into(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let body: Value = response.json().await.map_err(|e| AdapterError::Malformed {
            source: "wikipedia".into(),
            message: e.to_string(),
        })?;
        let titles = parse_search_titles(&body);

        let extracts = futures::future::join_all(
            titles.iter().map(|title| self.fetch_extract(&client, title)),
        )
        .await;

        Ok(titles
            .into_iter()
            .zip(extracts)
            .map(|(title, extract)| {
                let content = extract.unwrap_or_default();
                let mut finding = RawFinding::new(page_url(&title), &title, SourceType::Wikipedia);
                finding.snippet = content.chars().take(300).collect();
                finding.content = content;
                finding
            })
            .collect())
    }
}

fn page_url(title: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/{}",
        title.replace(' ', "_")
    )
}

fn parse_search_titles(body: &Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|pages| {
            pages
                .iter()
                .filter_map(|page| page["title"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_extract(body: &Value) -> Option<String> {
    let pages = body["query"]["pages"].as_object()?;
    pages
        .values()
        .next()
        .and_then(|page| page["extract"].as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_search_titles() {
        let body = json!({
            "query": { "search": [
                { "title": "Photosynthesis" },
                { "title": "C4 carbon fixation" }
            ]}
        });
        assert_eq!(
            parse_search_titles(&body),
            vec!["Photosynthesis", "C4 carbon fixation"]
        );
    }

    #[test]
    fn parses_extract_from_pages_map() {
        let body = json!({
            "query": { "pages": {
                "12345": { "title": "Photosynthesis", "extract": "Photosynthesis is a process." }
            }}
        });
        assert_eq!(
            parse_extract(&body).as_deref(),
            Some("Photosynthesis is a process.")
        );
    }

    #[test]
    fn missing_fields_yield_empty_results() {
        assert!(parse_search_titles(&json!({})).is_empty());
        assert!(parse_extract(&json!({})).is_none());
    }

    #[test]
    fn page_url_underscores_spaces() {
        assert_eq!(
            page_url("C4 carbon fixation"),
            "https://en.wikipedia.org/wiki/C4_carbon_fixation"
        );
    }
}
