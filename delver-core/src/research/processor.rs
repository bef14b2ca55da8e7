//! Content processing: cleaning, truncation, and domain extraction.
//!
//! Pure and infallible: malformed input yields a best-effort (possibly
//! empty) finding, never an error. Processing is idempotent so a finding
//! that passes through twice is unchanged.

use regex::Regex;
use url::Url;

use crate::adapter::RawFinding;
use crate::research::state::Finding;

/// Turns raw adapter output into normalized findings.
pub struct ContentProcessor {
    max_content_length: usize,
    squeeze_newlines: Regex,
    squeeze_spaces: Regex,
    boilerplate: Vec<Regex>,
    bare_urls: Regex,
    sentence_boundary: Regex,
}

impl ContentProcessor {
    pub fn new(max_content_length: usize) -> Self {
        Self {
            max_content_length,
            squeeze_newlines: Regex::new(r"\n{3,}").unwrap(),
            squeeze_spaces: Regex::new(r" {2,}").unwrap(),
            boilerplate: vec![
                Regex::new(r"(?i)subscribe.{0,80}?newsletter").unwrap(),
                Regex::new(r"(?i)advertisement").unwrap(),
                Regex::new(r"(?i)cookie\s*(policy|consent|notice)[^\n]*\n?").unwrap(),
            ],
            bare_urls: Regex::new(r"https?://\S+").unwrap(),
            sentence_boundary: Regex::new(r"(?s)[.!?]\s").unwrap(),
        }
    }

    /// Process one raw finding: clean and truncate its text, derive the
    /// domain from the URL. Credibility is filled in by the scorer.
    pub fn process(&self, raw: RawFinding) -> Finding {
        let content = self.truncate(&self.clean(&raw.content));
        let snippet = self.clean(&raw.snippet);
        Finding {
            domain: extract_domain(&raw.url),
            url: raw.url,
            title: raw.title.trim().to_string(),
            snippet,
            content,
            source_type: raw.source_type,
            published_at: raw.published_at,
            credibility_score: 0.0,
        }
    }

    /// Strip boilerplate and collapse whitespace.
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut cleaned = text.to_string();
        for pattern in &self.boilerplate {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned = self.bare_urls.replace_all(&cleaned, "").into_owned();
        cleaned = self.squeeze_newlines.replace_all(&cleaned, "\n\n").into_owned();
        cleaned = self.squeeze_spaces.replace_all(&cleaned, " ").into_owned();
        cleaned.trim().to_string()
    }

    /// Truncate to the configured bound, breaking at the last sentence
    /// boundary when one lands in the final 30% of the cut. Output never
    /// exceeds the bound, so re-truncation is the identity.
    pub fn truncate(&self, text: &str) -> String {
        if text.len() <= self.max_content_length {
            return text.to_string();
        }
        let mut cut = self.max_content_length.saturating_sub(3);
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = &text[..cut];
        if let Some(last_period) = truncated.rfind('.') {
            if last_period > self.max_content_length * 7 / 10 {
                return truncated[..=last_period].to_string();
            }
        }
        format!("{truncated}...")
    }

    /// Extract up to `max_sentences` mid-length sentences as a digest for
    /// completeness evaluation.
    pub fn extract_key_sentences(&self, text: &str, max_sentences: usize) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut sentences = Vec::new();
        let mut last = 0;
        for m in self.sentence_boundary.find_iter(text) {
            let candidate = text[last..m.end()].trim();
            if candidate.len() > 20 && candidate.len() < 500 {
                sentences.push(candidate);
                if sentences.len() == max_sentences {
                    return sentences.join(" ");
                }
            }
            last = m.end();
        }
        let tail = text[last..].trim();
        if tail.len() > 20 && tail.len() < 500 && sentences.len() < max_sentences {
            sentences.push(tail);
        }
        sentences.join(" ")
    }
}

/// Host portion of a URL, lowercased with any leading `www.` stripped.
/// Unparsable input yields an empty domain rather than an error.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .map(|host| host.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}
