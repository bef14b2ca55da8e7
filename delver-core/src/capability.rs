//! Language-model capability boundary.
//!
//! The engine treats the model as a black box behind [`LanguageCapability`]:
//! prompt in, text out. Decomposition, completeness evaluation, and
//! synthesis each consume it and each carries its own fallback, so a failing
//! or absent model degrades a run instead of aborting it. Tests substitute
//! [`StaticCapability`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::CapabilityError;

/// An injected, prompt-to-text language model capability.
#[async_trait]
pub trait LanguageCapability: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Deterministic capability double: replays a queue of scripted responses,
/// then repeats the last one. An empty script always errors.
pub struct StaticCapability {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl StaticCapability {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
        }
    }

    /// A capability that fails every call, for degradation paths.
    pub fn failing() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[async_trait]
impl LanguageCapability for StaticCapability {
    async fn generate(&self, _prompt: &str) -> Result<String, CapabilityError> {
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *self.last.lock().unwrap() = Some(next.clone());
            return Ok(next);
        }
        if let Some(last) = self.last.lock().unwrap().clone() {
            return Ok(last);
        }
        Err(CapabilityError::Request {
            message: "no scripted response available".into(),
        })
    }
}

/// Salvage a JSON array of strings from model output.
///
/// Tries a direct parse, then the outermost `[...]` span, then falls back
/// to non-trivial lines with list markers stripped.
pub fn extract_string_array(text: &str) -> Vec<String> {
    if let Some(items) = parse_string_array(text) {
        return items;
    }
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            if let Some(items) = parse_string_array(&text[start..=end]) {
                return items;
            }
        }
    }
    text.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| line.len() > 10)
        .map(str::to_string)
        .collect()
}

fn parse_string_array(text: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

/// Salvage a JSON object from model output: direct parse first, then the
/// outermost `{...}` span.
pub fn extract_object(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }
    let (start, end) = (trimmed.find('{')?, trimmed.rfind('}')?);
    if start >= end {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end])
        .ok()
        .filter(serde_json::Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_json_array() {
        let items = extract_string_array(r#"["alpha query", "beta query"]"#);
        assert_eq!(items, vec!["alpha query", "beta query"]);
    }

    #[test]
    fn extracts_array_from_fenced_output() {
        let text = "Here you go:\n```json\n[\"what is photosynthesis\", \"chlorophyll role\"]\n```";
        let items = extract_string_array(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "what is photosynthesis");
    }

    #[test]
    fn falls_back_to_line_splitting() {
        let text = "- first follow-up question here\n- second follow-up question here\nok";
        let items = extract_string_array(text);
        assert_eq!(items.len(), 2);
        assert!(items[0].starts_with("first"));
    }

    #[test]
    fn extracts_object_from_annotated_output() {
        let text = "Evaluation:\n{\"is_complete\": true, \"gaps\": []}\nDone.";
        let value = extract_object(text).unwrap();
        assert_eq!(value["is_complete"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn static_capability_replays_then_repeats() {
        let capability = StaticCapability::new(["one", "two"]);
        assert_eq!(capability.generate("p").await.unwrap(), "one");
        assert_eq!(capability.generate("p").await.unwrap(), "two");
        assert_eq!(capability.generate("p").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn failing_capability_errors() {
        let capability = StaticCapability::failing();
        assert!(capability.generate("p").await.is_err());
    }
}
