//! The research engine: an iteration-controller state machine.
//!
//! Drives one run through `Decomposing -> Searching -> Evaluating ->
//! (Searching | Synthesizing) -> Done`, with `Failed` reachable only when
//! no report can be produced at all. The loop is strictly sequential:
//! evaluation of iteration *n* observes every finding searched in
//! iteration *n*. The iteration cap is a hard termination guarantee.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapter::SourceAdapter;
use crate::capability::LanguageCapability;
use crate::config::ResearchConfig;
use crate::error::{DelverError, Result};
use crate::events::{EventKind, EventSink, ResearchEvent};
use crate::research::decomposer::QueryDecomposer;
use crate::research::evaluator::{CompletenessEvaluator, ModelEvaluator};
use crate::research::orchestrator::SearchOrchestrator;
use crate::research::processor::ContentProcessor;
use crate::research::state::{ResearchState, RunPhase};
use crate::research::synthesizer::{Report, ReportSynthesizer};

/// Orchestrates the full research loop for one query at a time. Each call
/// to [`ResearchEngine::run`] owns its `ResearchState` exclusively, so one
/// engine can serve concurrent runs for different queries.
pub struct ResearchEngine {
    config: ResearchConfig,
    orchestrator: SearchOrchestrator,
    decomposer: QueryDecomposer,
    evaluator: Arc<dyn CompletenessEvaluator>,
    synthesizer: ReportSynthesizer,
    processor: ContentProcessor,
    cancel: CancellationToken,
}

impl ResearchEngine {
    pub fn new(
        config: ResearchConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        capability: Arc<dyn LanguageCapability>,
    ) -> Self {
        let orchestrator = SearchOrchestrator::new(adapters, &config);
        let decomposer = QueryDecomposer::new(
            capability.clone(),
            config.max_sub_queries,
            config.max_followup_queries,
        );
        let evaluator: Arc<dyn CompletenessEvaluator> =
            Arc::new(ModelEvaluator::new(capability.clone()));
        let synthesizer = ReportSynthesizer::new(capability);
        let processor = ContentProcessor::new(config.max_content_length);
        Self {
            config,
            orchestrator,
            decomposer,
            evaluator,
            synthesizer,
            processor,
            cancel: CancellationToken::new(),
        }
    }

    /// Swap in a different completeness strategy.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn CompletenessEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Token for externally triggered cancellation (e.g. client
    /// disconnect). Cancelling stops new adapter/model calls; collected
    /// findings are still reported.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the full autonomous research loop for one query.
    ///
    /// Always terminates with either a `report` event (and `Ok`) or an
    /// `error` event (and `Err`).
    pub async fn run(&self, query: &str, sink: &dyn EventSink) -> Result<Report> {
        let mut state = ResearchState::new(query);
        let mut seen_sub_queries: HashSet<String> = HashSet::new();
        let max_iterations = self.config.max_iterations.max(1);

        sink.emit(ResearchEvent::new(
            EventKind::Status,
            format!("Starting research: \"{query}\""),
        ));

        loop {
            sink.emit(ResearchEvent::with_data(
                EventKind::Iteration,
                format!(
                    "Research iteration {}/{}",
                    state.iteration + 1,
                    max_iterations
                ),
                json!({ "iteration": state.iteration, "max_iterations": max_iterations }),
            ));

            if self.cancel.is_cancelled() {
                break;
            }

            // Decomposing
            state.transition(RunPhase::Decomposing);
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                "Decomposing query into sub-queries",
            ));
            let gaps = state.gaps.clone();
            let sub_queries = self
                .decomposer
                .decompose(query, &gaps, &seen_sub_queries, state.iteration)
                .await;
            if sub_queries.is_empty() {
                tracing::debug!("no new sub-queries; moving to synthesis");
                break;
            }
            for sq in &sub_queries {
                seen_sub_queries.insert(sq.text.to_lowercase());
                sink.emit(ResearchEvent::with_data(
                    EventKind::SubQuery,
                    sq.text.clone(),
                    json!({ "query": sq.text, "origin_iteration": sq.origin_iteration }),
                ));
            }

            // Searching
            state.transition(RunPhase::Searching);
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                format!("Searching {} sub-queries across all sources", sub_queries.len()),
            ));
            self.orchestrator
                .search_all(&sub_queries, &mut state, sink, &self.cancel)
                .await;
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                format!("Collected {} total sources", state.findings().len()),
            ));
            if self.cancel.is_cancelled() {
                break;
            }

            // Evaluating
            state.transition(RunPhase::Evaluating);
            if state.iteration + 1 >= max_iterations {
                break;
            }
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                "Evaluating research completeness",
            ));
            let digest = self.findings_digest(&state);
            let verdict = self.evaluator.evaluate(query, &digest).await;
            sink.emit(ResearchEvent::with_data(
                EventKind::Status,
                format!("Completeness: {:.0}%", verdict.score * 100.0),
                json!({ "completeness_score": verdict.score }),
            ));

            if verdict.is_complete && verdict.score >= self.config.min_completeness {
                state.record_evaluation(Vec::new());
                break;
            }
            state.record_evaluation(verdict.gaps);
            if state.gaps.is_empty() {
                break;
            }
            state.iteration += 1;
        }

        // Synthesizing
        state.transition(RunPhase::Synthesizing);
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                "Research cancelled; reporting collected findings",
            ));
        }
        sink.emit(ResearchEvent::new(
            EventKind::Synthesis,
            format!(
                "Synthesizing report from {} sources",
                state.findings().len()
            ),
        ));

        match self
            .synthesizer
            .synthesize(&state, &self.config, !cancelled)
            .await
        {
            Ok(report) => {
                if report.degraded {
                    sink.emit(ResearchEvent::new(
                        EventKind::Error,
                        "Synthesis capability failed; report used the deterministic fallback",
                    ));
                }
                sink.emit(ResearchEvent::with_data(
                    EventKind::Report,
                    "Final report",
                    json!({ "markdown": report.markdown }),
                ));
                state.transition(RunPhase::Done);
                sink.emit(ResearchEvent::with_data(
                    EventKind::Complete,
                    "Research complete",
                    json!({
                        "total_sources": state.findings().len(),
                        "iterations": report.iterations,
                        "contradictions": report.contradictions.len(),
                    }),
                ));
                Ok(report)
            }
            Err(e) => {
                state.transition(RunPhase::Failed);
                let message = format!(
                    "{e} ({} findings collected over {} iteration(s))",
                    state.findings().len(),
                    state.iteration + 1,
                );
                sink.emit(ResearchEvent::new(EventKind::Error, message.clone()));
                Err(DelverError::RunFailed { message })
            }
        }
    }

    /// Compact digest of the strongest retained findings, fed to the
    /// completeness evaluator.
    fn findings_digest(&self, state: &ResearchState) -> String {
        state
            .retained(self.config.credibility_threshold)
            .iter()
            .take(20)
            .map(|f| {
                let gist = if f.content.is_empty() {
                    f.snippet.clone()
                } else {
                    self.processor.extract_key_sentences(&f.content, 2)
                };
                format!("- {}: {}", f.title, gist)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{RawFinding, SourceType};
    use crate::capability::StaticCapability;
    use crate::error::AdapterError;
    use crate::events::MemorySink;
    use async_trait::async_trait;
    use std::time::Duration;

    struct OneShotAdapter;

    #[async_trait]
    impl SourceAdapter for OneShotAdapter {
        fn name(&self) -> &str {
            "static"
        }

        fn source_type(&self) -> SourceType {
            SourceType::Wikipedia
        }

        async fn search(
            &self,
            _query: &str,
            _timeout: Duration,
        ) -> std::result::Result<Vec<RawFinding>, AdapterError> {
            let mut raw = RawFinding::new(
                "https://en.wikipedia.org/wiki/Photosynthesis",
                "Photosynthesis",
                SourceType::Wikipedia,
            );
            raw.snippet = "Photosynthesis converts light energy into chemical energy.".into();
            Ok(vec![raw])
        }
    }

    fn engine(capability: StaticCapability) -> ResearchEngine {
        ResearchEngine::new(
            ResearchConfig::default(),
            vec![Arc::new(OneShotAdapter)],
            Arc::new(capability),
        )
    }

    #[tokio::test]
    async fn run_terminates_with_report_and_complete_events() {
        let capability = StaticCapability::new([
            r#"["what is photosynthesis in plants"]"#,
            r#"{"is_complete": true, "completeness_score": 0.9, "gaps": []}"#,
            "## Executive Summary\n\nPhotosynthesis explained [1].",
        ]);
        let sink = MemorySink::new();
        let report = engine(capability)
            .run("What is photosynthesis?", &sink)
            .await
            .unwrap();

        assert_eq!(report.iterations, 1);
        assert_eq!(report.citation_map.len(), 1);
        let kinds = sink.kinds();
        assert!(kinds.contains(&EventKind::Report));
        assert_eq!(*kinds.last().unwrap(), EventKind::Complete);
    }

    #[tokio::test]
    async fn cancelled_run_still_reports() {
        let engine = engine(StaticCapability::failing());
        engine.cancellation_token().cancel();
        let sink = MemorySink::new();
        let report = engine.run("anything", &sink).await.unwrap();

        assert!(report.cancelled);
        assert!(report.markdown.contains("cancelled"));
        assert!(sink.kinds().contains(&EventKind::Report));
    }
}
