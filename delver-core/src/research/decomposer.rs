//! Query decomposition into searchable sub-queries.
//!
//! Backed by the injected language capability; decomposition never aborts
//! a run. On capability failure or unusable output it falls back to the
//! identity decomposition: the original query, or the literal gap texts on
//! gap-filling calls.

use std::collections::HashSet;
use std::sync::Arc;

use crate::capability::{extract_string_array, LanguageCapability};
use crate::research::state::SubQuery;

pub struct QueryDecomposer {
    capability: Arc<dyn LanguageCapability>,
    max_sub_queries: usize,
    max_followup_queries: usize,
}

impl QueryDecomposer {
    pub fn new(
        capability: Arc<dyn LanguageCapability>,
        max_sub_queries: usize,
        max_followup_queries: usize,
    ) -> Self {
        Self {
            capability,
            max_sub_queries,
            max_followup_queries,
        }
    }

    /// Break a question into sub-queries. `existing_gaps` is empty on the
    /// first call; afterwards sub-queries target the reported gaps.
    /// `seen` holds lowercased texts of every prior sub-query in the run;
    /// duplicates against it are discarded.
    pub async fn decompose(
        &self,
        query: &str,
        existing_gaps: &[String],
        seen: &HashSet<String>,
        origin_iteration: usize,
    ) -> Vec<SubQuery> {
        let limit = if existing_gaps.is_empty() {
            self.max_sub_queries
        } else {
            self.max_followup_queries
        };

        let prompt = build_prompt(query, existing_gaps, limit);
        let candidates = match self.capability.generate(&prompt).await {
            Ok(text) => extract_string_array(&text),
            Err(e) => {
                tracing::warn!(error = %e, "decomposition capability failed, using identity fallback");
                Vec::new()
            }
        };

        let mut accepted = dedup(candidates, seen, limit, origin_iteration);
        if accepted.is_empty() {
            let fallback: Vec<String> = if existing_gaps.is_empty() {
                vec![query.to_string()]
            } else {
                existing_gaps.to_vec()
            };
            accepted = dedup(fallback, seen, limit, origin_iteration);
        }
        accepted
    }
}

fn build_prompt(query: &str, existing_gaps: &[String], limit: usize) -> String {
    if existing_gaps.is_empty() {
        format!(
            "Break this research question into at most {limit} specific, searchable \
             sub-queries covering different aspects, foundational and current. \
             Respond with a JSON array of strings only.\n\nQuestion: {query}"
        )
    } else {
        format!(
            "Research question: {query}\n\nThese aspects are not yet covered:\n{}\n\n\
             Produce at most {limit} follow-up search queries closing these gaps. \
             Respond with a JSON array of strings only.",
            existing_gaps
                .iter()
                .map(|g| format!("- {g}"))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }
}

/// Keep non-empty candidates that are case-insensitively distinct from
/// prior sub-queries and from each other, up to `limit`.
fn dedup(
    candidates: Vec<String>,
    seen: &HashSet<String>,
    limit: usize,
    origin_iteration: usize,
) -> Vec<SubQuery> {
    let mut batch_seen = HashSet::new();
    candidates
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .filter(|text| {
            let key = text.to_lowercase();
            !seen.contains(&key) && batch_seen.insert(key)
        })
        .take(limit)
        .map(|text| SubQuery::new(text, origin_iteration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StaticCapability;
    use pretty_assertions::assert_eq;

    fn decomposer(capability: StaticCapability) -> QueryDecomposer {
        QueryDecomposer::new(Arc::new(capability), 5, 3)
    }

    #[tokio::test]
    async fn decomposes_into_distinct_sub_queries() {
        let capability = StaticCapability::new([
            r#"["what is photosynthesis", "how does chlorophyll work", "What is photosynthesis", "light reaction stages"]"#,
        ]);
        let subs = decomposer(capability)
            .decompose("What is photosynthesis?", &[], &HashSet::new(), 0)
            .await;
        let texts: Vec<&str> = subs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "what is photosynthesis",
                "how does chlorophyll work",
                "light reaction stages"
            ]
        );
        assert!(subs.iter().all(|s| s.origin_iteration == 0));
    }

    #[tokio::test]
    async fn caps_first_call_at_max_sub_queries() {
        let capability = StaticCapability::new([r#"["q1 aaaa", "q2 bbbb", "q3 cccc", "q4 dddd", "q5 eeee", "q6 ffff"]"#]);
        let subs = decomposer(capability)
            .decompose("query", &[], &HashSet::new(), 0)
            .await;
        assert_eq!(subs.len(), 5);
    }

    #[tokio::test]
    async fn gap_filling_call_uses_followup_limit() {
        let capability =
            StaticCapability::new([r#"["g1 aaaa", "g2 bbbb", "g3 cccc", "g4 dddd"]"#]);
        let gaps = vec!["economic impact".to_string()];
        let subs = decomposer(capability)
            .decompose("query", &gaps, &HashSet::new(), 1)
            .await;
        assert_eq!(subs.len(), 3);
        assert!(subs.iter().all(|s| s.origin_iteration == 1));
    }

    #[tokio::test]
    async fn capability_failure_falls_back_to_original_query() {
        let subs = decomposer(StaticCapability::failing())
            .decompose("What is photosynthesis?", &[], &HashSet::new(), 0)
            .await;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "What is photosynthesis?");
    }

    #[tokio::test]
    async fn capability_failure_falls_back_to_gap_texts() {
        let gaps = vec!["carbon fixation".to_string(), "c4 plants".to_string()];
        let subs = decomposer(StaticCapability::failing())
            .decompose("query", &gaps, &HashSet::new(), 2)
            .await;
        let texts: Vec<&str> = subs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["carbon fixation", "c4 plants"]);
    }

    #[tokio::test]
    async fn previously_seen_sub_queries_are_discarded() {
        let capability = StaticCapability::new([r#"["already asked before", "a new question"]"#]);
        let seen: HashSet<String> = ["already asked before".to_string()].into_iter().collect();
        let subs = decomposer(capability)
            .decompose("query", &[], &seen, 1)
            .await;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "a new question");
    }

    #[tokio::test]
    async fn unusable_output_falls_back() {
        let capability = StaticCapability::new(["ok"]);
        let subs = decomposer(capability)
            .decompose("the original question", &[], &HashSet::new(), 0)
            .await;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "the original question");
    }
}
