//! arXiv adapter over the export API's Atom feed.
//!
//! The feed is small and regular, so entries are pulled out with
//! lightweight tag extraction instead of a full XML parser.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use delver_core::adapter::{RawFinding, SourceAdapter, SourceType};
use delver_core::error::AdapterError;
use std::time::Duration;

const API_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivAdapter {
    max_results: usize,
}

impl ArxivAdapter {
    pub fn new() -> Self {
        Self::with_max_results(5)
    }

    pub fn with_max_results(max_results: usize) -> Self {
        Self { max_results }
    }
}

impl Default for ArxivAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Academic
    }

    async fn search(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        tracing::debug!(query, "arxiv search");
        let client = crate::http_client(timeout).map_err(|e| AdapterError::Unavailable {
            source: "arxiv".into(),
            message: e.to_string(),
        })?;
        let url = format!(
            "{API_URL}?search_query=all:{}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            urlencoding::encode(query),
            self.max_results,
        );
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable {
                source: "arxiv".into(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::Unavailable {
                source: "arxiv".into(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let xml = response.text().await.map_err(|e| AdapterError::Malformed {
            source: "arxiv".into(),
            message: e.to_string(),
        })?;
        Ok(parse_feed(&xml))
    }
}

/// Parse an Atom feed into raw findings, skipping unusable entries.
fn parse_feed(xml: &str) -> Vec<RawFinding> {
    extract_blocks(xml, "entry")
        .into_iter()
        .filter_map(|entry| parse_entry(&entry))
        .collect()
}

fn parse_entry(entry: &str) -> Option<RawFinding> {
    let url = tag_text(entry, "id")?;
    let title = normalize_whitespace(&tag_text(entry, "title")?);
    let summary = normalize_whitespace(&tag_text(entry, "summary").unwrap_or_default());
    let published = tag_text(entry, "published").and_then(|p| parse_date(&p));

    let authors: Vec<String> = extract_blocks(entry, "author")
        .iter()
        .filter_map(|block| tag_text(block, "name"))
        .collect();
    let author_line = if authors.len() > 5 {
        format!("{} et al. ({} authors)", authors[..5].join(", "), authors.len())
    } else {
        authors.join(", ")
    };

    let mut finding = RawFinding::new(&url, &title, SourceType::Academic);
    finding.snippet = summary.chars().take(300).collect();
    finding.content = format!(
        "{title}\n\nAuthors: {author_line}\nPublished: {}\n\nAbstract: {summary}",
        published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".into()),
    );
    finding.published_at = published;
    Some(finding)
}

/// All `<tag>...</tag>` blocks in the document, tags included.
fn extract_blocks(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(start) = xml[from..].find(&open) {
        let start = from + start;
        let Some(end) = xml[start..].find(&close) else {
            break;
        };
        let end = start + end + close.len();
        blocks.push(xml[start..end].to_string());
        from = end;
    }
    blocks
}

/// Text inside the first `<tag>...</tag>` pair.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    let text = xml[start..end].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Attention Mechanisms
        in Plants</title>
    <summary>We study attention.</summary>
    <published>2021-01-01T00:00:00Z</published>
    <author><name>Ada One</name></author>
    <author><name>Bob Two</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002v1</id>
    <title>Second Paper</title>
    <summary>More findings.</summary>
    <published>not-a-date</published>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_from_feed() {
        let findings = parse_feed(FEED);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].url, "http://arxiv.org/abs/2101.00001v1");
        assert_eq!(findings[0].title, "Attention Mechanisms in Plants");
        assert!(findings[0].content.contains("Ada One, Bob Two"));
        assert!(findings[0].published_at.is_some());
        assert!(findings[1].published_at.is_none());
    }

    #[test]
    fn abbreviates_long_author_lists() {
        let entry = format!(
            "<entry><id>http://arxiv.org/abs/1</id><title>T</title><summary>S</summary>{}</entry>",
            (1..=7)
                .map(|i| format!("<author><name>Author {i}</name></author>"))
                .collect::<String>(),
        );
        let finding = parse_entry(&entry).unwrap();
        assert!(finding.content.contains("et al. (7 authors)"));
    }

    #[test]
    fn empty_feed_yields_no_findings() {
        assert!(parse_feed("<feed></feed>").is_empty());
    }

    #[test]
    fn entry_without_id_is_skipped() {
        let findings = parse_feed("<feed><entry><title>T</title></entry></feed>");
        assert!(findings.is_empty());
    }
}
