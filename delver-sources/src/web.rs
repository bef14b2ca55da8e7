//! Web search adapter backed by the DuckDuckGo instant-answer API.
//!
//! No API key required. The instant answer and related topics become raw
//! findings; full page content is then fetched for the top results so the
//! scorer and synthesizer have substance to work with.

use async_trait::async_trait;
use delver_core::adapter::{RawFinding, SourceAdapter, SourceType};
use delver_core::error::AdapterError;
use serde_json::Value;
use std::time::Duration;

use crate::html::html_to_text;

const API_URL: &str = "https://api.duckduckgo.com/";
/// How many results get a full page fetch.
const FETCH_TOP: usize = 3;
/// Raw cap before the core processor applies its own bound.
const MAX_FETCHED_CHARS: usize = 8000;

pub struct DuckDuckGoAdapter {
    max_results: usize,
}

impl DuckDuckGoAdapter {
    pub fn new() -> Self {
        Self::with_max_results(10)
    }

    pub fn with_max_results(max_results: usize) -> Self {
        Self { max_results }
    }

    async fn fetch_page(&self, client: &reqwest::Client, url: &str) -> Option<String> {
        let response = client
            .get(url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(false);
        let body = response.text().await.ok()?;
        let text = if is_html { html_to_text(&body) } else { body };
        Some(text.chars().take(MAX_FETCHED_CHARS).collect())
    }
}

impl Default for DuckDuckGoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for DuckDuckGoAdapter {
    fn name(&self) -> &str {
        "web"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Web
    }

    async fn search(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        tracing::debug!(query, "web search");
        let client = crate::http_client(timeout).map_err(|e| AdapterError::Unavailable {
            source: "web".into(),
            message: e.to_string(),
        })?;
        let url = format!(
            "{API_URL}?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable {
                source: "web".into(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::Unavailable {
                source: "web".into(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let body: Value = response.json().await.map_err(|e| AdapterError::Malformed {
            source: "web".into(),
            message: e.to_string(),
        })?;

        let mut findings = parse_instant_answer(&body, self.max_results);

        // Fetch page content for the top results, concurrently.
        let fetches = findings
            .iter()
            .take(FETCH_TOP)
            .map(|f| self.fetch_page(&client, &f.url));
        let contents = futures::future::join_all(fetches).await;
        for (finding, content) in findings.iter_mut().zip(contents) {
            if let Some(content) = content {
                finding.content = content;
            }
        }
        Ok(findings)
    }
}

/// Turn an instant-answer payload into raw findings: the abstract first,
/// then related topics, capped at `max_results`.
fn parse_instant_answer(body: &Value, max_results: usize) -> Vec<RawFinding> {
    let mut findings = Vec::new();

    let abstract_text = body["AbstractText"].as_str().unwrap_or_default();
    let abstract_url = body["AbstractURL"].as_str().unwrap_or_default();
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let title = body["Heading"]
            .as_str()
            .filter(|h| !h.is_empty())
            .unwrap_or(abstract_url);
        let mut finding = RawFinding::new(abstract_url, title, SourceType::Web);
        finding.snippet = abstract_text.chars().take(300).collect();
        finding.content = abstract_text.to_string();
        findings.push(finding);
    }

    if let Some(topics) = body["RelatedTopics"].as_array() {
        for topic in topics {
            if findings.len() >= max_results {
                break;
            }
            // Grouped topics nest one level deeper.
            if let Some(nested) = topic["Topics"].as_array() {
                for inner in nested {
                    if findings.len() >= max_results {
                        break;
                    }
                    if let Some(finding) = topic_to_finding(inner) {
                        findings.push(finding);
                    }
                }
            } else if let Some(finding) = topic_to_finding(topic) {
                findings.push(finding);
            }
        }
    }

    findings.truncate(max_results);
    findings
}

fn topic_to_finding(topic: &Value) -> Option<RawFinding> {
    let url = topic["FirstURL"].as_str()?;
    let text = topic["Text"].as_str()?;
    if url.is_empty() || text.is_empty() {
        return None;
    }
    // The text leads with the topic name; use its first clause as a title.
    let title = text.split(" - ").next().unwrap_or(text);
    let mut finding = RawFinding::new(url, title, SourceType::Web);
    finding.snippet = text.chars().take(300).collect();
    Some(finding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_abstract_and_related_topics() {
        let body = json!({
            "Heading": "Photosynthesis",
            "AbstractText": "Photosynthesis is a process used by plants.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Photosynthesis",
            "RelatedTopics": [
                { "FirstURL": "https://duckduckgo.com/c4", "Text": "C4 carbon fixation - a pathway" },
                { "Topics": [
                    { "FirstURL": "https://duckduckgo.com/chl", "Text": "Chlorophyll - a pigment" }
                ]}
            ]
        });
        let findings = parse_instant_answer(&body, 10);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].title, "Photosynthesis");
        assert_eq!(findings[1].title, "C4 carbon fixation");
        assert_eq!(findings[2].url, "https://duckduckgo.com/chl");
        assert!(findings.iter().all(|f| f.source_type == SourceType::Web));
    }

    #[test]
    fn respects_max_results() {
        let topics: Vec<Value> = (0..20)
            .map(|i| json!({ "FirstURL": format!("https://x.com/{i}"), "Text": format!("Topic {i} - detail") }))
            .collect();
        let body = json!({ "AbstractText": "", "AbstractURL": "", "RelatedTopics": topics });
        let findings = parse_instant_answer(&body, 5);
        assert_eq!(findings.len(), 5);
    }

    #[test]
    fn skips_topics_without_urls() {
        let body = json!({
            "AbstractText": "",
            "AbstractURL": "",
            "RelatedTopics": [
                { "Text": "No url here" },
                { "FirstURL": "", "Text": "Empty url" },
                { "FirstURL": "https://ok.com", "Text": "Fine - ok" }
            ]
        });
        let findings = parse_instant_answer(&body, 10);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].url, "https://ok.com");
    }
}
