//! Completeness evaluation between iterations.
//!
//! Pluggable strategy: the engine only relies on the contract that gaps
//! eventually shrink or the iteration cap ends the run. The default
//! implementation asks the language capability for a JSON verdict and
//! degrades to "complete, no gaps" on any failure so evaluation can never
//! wedge the loop.

use async_trait::async_trait;
use std::sync::Arc;

use crate::capability::{extract_object, LanguageCapability};

/// Verdict on whether accumulated findings address the original query.
#[derive(Debug, Clone)]
pub struct Completeness {
    pub is_complete: bool,
    /// Coverage estimate in [0, 1].
    pub score: f64,
    /// Aspects judged insufficiently covered, driving the next iteration.
    pub gaps: Vec<String>,
}

impl Completeness {
    /// The degraded verdict: proceed to synthesis with what we have.
    pub fn assumed_complete() -> Self {
        Self {
            is_complete: true,
            score: 0.7,
            gaps: Vec::new(),
        }
    }
}

/// Strategy deciding whether another research iteration is needed.
#[async_trait]
pub trait CompletenessEvaluator: Send + Sync {
    async fn evaluate(&self, query: &str, findings_digest: &str) -> Completeness;
}

/// Default evaluator backed by the language capability.
pub struct ModelEvaluator {
    capability: Arc<dyn LanguageCapability>,
}

impl ModelEvaluator {
    pub fn new(capability: Arc<dyn LanguageCapability>) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl CompletenessEvaluator for ModelEvaluator {
    async fn evaluate(&self, query: &str, findings_digest: &str) -> Completeness {
        let digest: String = findings_digest.chars().take(4000).collect();
        let prompt = format!(
            "Research question: {query}\n\nFindings so far:\n{digest}\n\n\
             Judge whether the findings cover all major aspects of the question. \
             Respond with a JSON object only: \
             {{\"is_complete\": bool, \"completeness_score\": 0.0-1.0, \"gaps\": [\"...\"]}}"
        );

        let text = match self.capability.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "completeness evaluation failed, assuming complete");
                return Completeness::assumed_complete();
            }
        };
        let Some(value) = extract_object(&text) else {
            tracing::warn!("completeness verdict unparsable, assuming complete");
            return Completeness::assumed_complete();
        };

        Completeness {
            is_complete: value["is_complete"].as_bool().unwrap_or(false),
            score: value["completeness_score"].as_f64().unwrap_or(0.7),
            gaps: value["gaps"]
                .as_array()
                .map(|gaps| {
                    gaps.iter()
                        .filter_map(|g| g.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
