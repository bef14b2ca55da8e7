//! Report synthesis with citation-aware formatting.
//!
//! The model writes the narrative; the source list, citation map, and
//! conflicting-information section are assembled deterministically so every
//! retained finding is cited and no citation index dangles. If the model
//! capability fails, a deterministic template takes over; a run always
//! ends with a report unless there is nothing at all to report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capability::LanguageCapability;
use crate::config::ResearchConfig;
use crate::error::DelverError;
use crate::research::state::{Contradiction, Finding, ResearchState};

/// A completed research report. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub query: String,
    pub markdown: String,
    /// 1-based citation index -> the finding it references. Covers every
    /// finding that passed the credibility threshold.
    pub citation_map: BTreeMap<usize, Finding>,
    /// Number of completed search passes (1-based).
    pub iterations: usize,
    pub contradictions: Vec<Contradiction>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
    /// True when the model path failed and the deterministic template was
    /// used instead.
    pub degraded: bool,
}

/// Synthesizes accumulated findings into a cited markdown report.
pub struct ReportSynthesizer {
    capability: Arc<dyn LanguageCapability>,
}

impl ReportSynthesizer {
    pub fn new(capability: Arc<dyn LanguageCapability>) -> Self {
        Self { capability }
    }

    /// Produce the final report. `use_model` is false for cancelled runs,
    /// which go straight to the deterministic template.
    pub async fn synthesize(
        &self,
        state: &ResearchState,
        config: &ResearchConfig,
        use_model: bool,
    ) -> Result<Report, DelverError> {
        let retained: Vec<Finding> = state
            .retained(config.credibility_threshold)
            .into_iter()
            .cloned()
            .collect();

        let mut degraded = false;
        let body = if use_model {
            match self.generate_body(state, &retained).await {
                Ok(body) => body,
                Err(e) => {
                    if state.findings().is_empty() {
                        return Err(DelverError::RunFailed {
                            message: format!(
                                "no findings were collected and synthesis failed: {e}"
                            ),
                        });
                    }
                    tracing::warn!(error = %e, "synthesis capability failed, using template fallback");
                    degraded = true;
                    render_template(state, &retained, false)
                }
            }
        } else {
            render_template(state, &retained, true)
        };

        let mut markdown = body;
        if !state.contradictions.is_empty() {
            markdown.push_str(&render_conflicts(&state.contradictions));
        }
        markdown.push_str(&render_sources(&retained));

        Ok(Report {
            query: state.original_query.clone(),
            markdown,
            citation_map: citation_map(&retained),
            iterations: state.iteration + 1,
            contradictions: state.contradictions.clone(),
            warnings: state.warnings.clone(),
            cancelled: !use_model,
            degraded,
        })
    }

    async fn generate_body(
        &self,
        state: &ResearchState,
        retained: &[Finding],
    ) -> Result<String, crate::error::CapabilityError> {
        let prompt = format!(
            "Write a structured markdown research report answering the question below. \
             Start with an executive summary, then sections per aspect, citing sources \
             inline as [1], [2] referencing the numbered list. Note conflicting sources \
             explicitly. Never invent information.\n\n\
             Question: {}\n\nSources:\n{}",
            state.original_query,
            source_digest(retained)
        );
        let body = self.capability.generate(&prompt).await?;
        Ok(body.trim().to_string())
    }
}

/// Numbered source context handed to the model.
fn source_digest(retained: &[Finding]) -> String {
    retained
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let content = if f.content.is_empty() {
                &f.snippet
            } else {
                &f.content
            };
            format!(
                "[{}] {}\nSource: {} ({})\nCredibility: {:.2}\n{}",
                i + 1,
                f.title,
                f.url,
                f.source_type,
                f.credibility_score,
                content,
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Deterministic fallback body: summary, aspect headings, and a cited
/// bullet per finding with its raw credibility score.
fn render_template(state: &ResearchState, retained: &[Finding], cancelled: bool) -> String {
    let mut out = format!("# Research Report: {}\n\n", state.original_query);

    out.push_str("## Summary\n\n");
    if cancelled {
        out.push_str("The research run was cancelled before completion. ");
    }
    out.push_str(&format!(
        "{} source(s) were retained across {} iteration(s); findings are listed by credibility.\n",
        retained.len(),
        state.iteration + 1,
    ));

    if !state.covered_aspects.is_empty() || !state.gaps.is_empty() {
        out.push_str("\n## Aspects\n\n");
        for aspect in &state.covered_aspects {
            out.push_str(&format!("### {aspect}\n\ncovered\n\n"));
        }
        for gap in &state.gaps {
            out.push_str(&format!("### {gap}\n\nnot fully covered\n\n"));
        }
    }

    out.push_str("\n## Findings\n\n");
    if retained.is_empty() {
        out.push_str("No sources passed the credibility threshold.\n");
    }
    for (i, f) in retained.iter().enumerate() {
        let summary = if f.snippet.is_empty() {
            &f.content
        } else {
            &f.snippet
        };
        let summary: String = summary.chars().take(300).collect();
        out.push_str(&format!(
            "- [{}] **{}** ({}, credibility {:.2}) — {}\n",
            i + 1,
            f.title,
            f.source_type,
            f.credibility_score,
            summary,
        ));
    }
    out
}

fn render_conflicts(contradictions: &[Contradiction]) -> String {
    let mut out = String::from("\n\n## Conflicting Information\n\n");
    for c in contradictions {
        out.push_str(&format!(
            "- **{}** vs **{}**: {}\n",
            c.first_title, c.second_title, c.signal,
        ));
    }
    out
}

fn render_sources(retained: &[Finding]) -> String {
    let mut out = String::from("\n\n---\n\n## Sources\n\n");
    for (i, f) in retained.iter().enumerate() {
        let badge = if f.credibility_score >= 0.6 {
            "high"
        } else if f.credibility_score >= 0.2 {
            "medium"
        } else {
            "low"
        };
        out.push_str(&format!(
            "{}. [{}]({}) — *{}*, {} (credibility: {:.2}, {})\n",
            i + 1,
            f.title,
            f.url,
            f.source_type,
            if f.domain.is_empty() {
                "unknown domain"
            } else {
                f.domain.as_str()
            },
            f.credibility_score,
            badge,
        ));
    }
    out
}

fn citation_map(retained: &[Finding]) -> BTreeMap<usize, Finding> {
    retained
        .iter()
        .enumerate()
        .map(|(i, f)| (i + 1, f.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SourceType;
    use crate::capability::StaticCapability;

    fn finding(url: &str, title: &str, score: f64) -> Finding {
        Finding {
            url: url.to_string(),
            title: title.to_string(),
            snippet: format!("Snippet for {title}"),
            content: String::new(),
            source_type: SourceType::Web,
            domain: "example.com".to_string(),
            published_at: None,
            credibility_score: score,
        }
    }

    fn state_with(findings: Vec<Finding>) -> ResearchState {
        let mut state = ResearchState::new("What is photosynthesis?");
        for f in findings {
            state.insert(f);
        }
        state
    }

    fn synthesizer(capability: StaticCapability) -> ReportSynthesizer {
        ReportSynthesizer::new(Arc::new(capability))
    }

    #[tokio::test]
    async fn model_report_cites_every_retained_finding() {
        let state = state_with(vec![
            finding("https://a.com", "Alpha", 0.9),
            finding("https://b.com", "Beta", 0.4),
            finding("https://c.com", "Gamma", -0.5),
        ]);
        let report = synthesizer(StaticCapability::new(["## Executive Summary\n\nText [1][2]."]))
            .synthesize(&state, &ResearchConfig::default(), true)
            .await
            .unwrap();

        // Below-threshold finding excluded, others all cited.
        assert_eq!(report.citation_map.len(), 2);
        assert_eq!(report.citation_map[&1].title, "Alpha");
        assert_eq!(report.citation_map[&2].title, "Beta");
        assert!(report.markdown.contains("Executive Summary"));
        assert!(report.markdown.contains("## Sources"));
        assert!(report.markdown.contains("[Alpha](https://a.com)"));
        assert!(!report.markdown.contains("[Gamma]"));
    }

    #[tokio::test]
    async fn capability_failure_falls_back_to_template() {
        let state = state_with(vec![
            finding("https://a.com", "Alpha", 0.9),
            finding("https://b.com", "Beta", 0.4),
        ]);
        let report = synthesizer(StaticCapability::failing())
            .synthesize(&state, &ResearchConfig::default(), true)
            .await
            .unwrap();

        assert!(report.degraded);
        assert!(report.markdown.contains("# Research Report"));
        assert!(report.markdown.contains("**Alpha**"));
        assert!(report.markdown.contains("**Beta**"));
        assert_eq!(report.citation_map.len(), 2);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn contradictions_get_their_own_section() {
        let mut state = state_with(vec![
            finding("https://a.com", "Warming study", 0.8),
            finding("https://b.com", "Cooling study", 0.7),
        ]);
        state.contradictions.push(Contradiction {
            first_url: "https://a.com".into(),
            first_title: "Warming study".into(),
            second_url: "https://b.com".into(),
            second_title: "Cooling study".into(),
            signal: "'increase' vs 'decrease'".into(),
        });
        let report = synthesizer(StaticCapability::new(["Body text."]))
            .synthesize(&state, &ResearchConfig::default(), true)
            .await
            .unwrap();

        assert!(report.markdown.contains("## Conflicting Information"));
        assert!(report.markdown.contains("**Warming study** vs **Cooling study**"));
    }

    #[tokio::test]
    async fn cancelled_run_renders_template_without_model() {
        let state = state_with(vec![finding("https://a.com", "Alpha", 0.5)]);
        // A failing capability proves the model is never consulted.
        let report = synthesizer(StaticCapability::failing())
            .synthesize(&state, &ResearchConfig::default(), false)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(!report.degraded);
        assert!(report.markdown.contains("cancelled"));
        assert!(report.markdown.contains("**Alpha**"));
    }

    #[tokio::test]
    async fn no_findings_and_no_capability_is_a_run_failure() {
        let state = state_with(Vec::new());
        let result = synthesizer(StaticCapability::failing())
            .synthesize(&state, &ResearchConfig::default(), true)
            .await;
        assert!(matches!(result, Err(DelverError::RunFailed { .. })));
    }

    #[tokio::test]
    async fn below_threshold_findings_stay_out_of_the_source_list() {
        let state = state_with(vec![
            finding("https://good.com", "Good", 0.6),
            finding("https://bad.com", "Bad", -0.8),
        ]);
        let report = synthesizer(StaticCapability::new(["Body."]))
            .synthesize(&state, &ResearchConfig::default(), true)
            .await
            .unwrap();

        assert!(report.markdown.contains("https://good.com"));
        assert!(!report.markdown.contains("https://bad.com"));
        // The audit trail still has both.
        assert_eq!(state.findings().len(), 2);
    }
}
