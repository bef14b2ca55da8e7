//! Search orchestration: concurrent multi-adapter fan-out per sub-query.
//!
//! Every adapter failure or timeout is isolated to that adapter: it
//! degrades to zero findings plus a recorded warning and never fails the
//! sub-query. Results merge into `ResearchState` through a single
//! insertion point so the URL-uniqueness invariant holds even with
//! sub-queries running concurrently.

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::adapter::SourceAdapter;
use crate::config::ResearchConfig;
use crate::error::AdapterError;
use crate::events::{EventKind, EventSink, ResearchEvent};
use crate::research::credibility::CredibilityScorer;
use crate::research::processor::ContentProcessor;
use crate::research::state::{normalize_url, Contradiction, Finding, ResearchState, SubQuery};

/// Fans sub-queries out to all registered adapters, then merges,
/// deduplicates, processes, and scores what comes back.
pub struct SearchOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    processor: ContentProcessor,
    scorer: CredibilityScorer,
    adapter_timeout: Duration,
    max_concurrent_queries: usize,
    credibility_threshold: f64,
}

/// Everything one sub-query produced, gathered off-state so concurrent
/// sub-queries never contend for it.
struct SubQueryBatch {
    findings: Vec<Finding>,
    warnings: Vec<AdapterError>,
    contradictions: Vec<Contradiction>,
}

impl SearchOrchestrator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: &ResearchConfig) -> Self {
        Self {
            adapters,
            processor: ContentProcessor::new(config.max_content_length),
            scorer: CredibilityScorer::new(config.scoring.clone()),
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
            max_concurrent_queries: config.max_concurrent_queries.max(1),
            credibility_threshold: config.credibility_threshold,
        }
    }

    /// Search one sub-query across all adapters. Returns the findings
    /// accepted into state, post-dedup, in discovery order.
    pub async fn search(
        &self,
        sub_query: &SubQuery,
        state: &mut ResearchState,
        sink: &dyn EventSink,
    ) -> Vec<Finding> {
        let batch = self.fetch(sub_query).await;
        self.merge(batch, state, sink)
    }

    /// Search a whole iteration's sub-queries, at most
    /// `max_concurrent_queries` in flight. Completed batches merge as they
    /// arrive; cancellation stops issuing work and abandons what is still
    /// in flight without corrupting state.
    pub async fn search_all(
        &self,
        sub_queries: &[SubQuery],
        state: &mut ResearchState,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> usize {
        let mut batches = stream::iter(sub_queries.iter().map(|sq| self.fetch(sq)))
            .buffer_unordered(self.max_concurrent_queries);

        let mut accepted = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    state.record_warning("search cancelled; remaining sub-queries abandoned");
                    break;
                }
                batch = batches.next() => match batch {
                    Some(batch) => accepted += self.merge(batch, state, sink).len(),
                    None => break,
                },
            }
        }
        accepted
    }

    /// Run all adapters for one sub-query concurrently, each under an
    /// independent timeout, and normalize what survives.
    async fn fetch(&self, sub_query: &SubQuery) -> SubQueryBatch {
        let query = sub_query.text.as_str();
        let calls = self.adapters.iter().map(|adapter| async move {
            let outcome =
                tokio::time::timeout(self.adapter_timeout, adapter.search(query, self.adapter_timeout))
                    .await;
            (adapter.name().to_string(), outcome)
        });

        let mut findings = Vec::new();
        let mut warnings = Vec::new();
        let mut batch_seen = HashSet::new();
        for (name, outcome) in futures::future::join_all(calls).await {
            let raws = match outcome {
                Ok(Ok(raws)) => raws,
                Ok(Err(err)) => {
                    warnings.push(err);
                    continue;
                }
                Err(_) => {
                    warnings.push(AdapterError::Timeout {
                        source: name,
                        timeout_secs: self.adapter_timeout.as_secs(),
                    });
                    continue;
                }
            };
            for raw in raws {
                let key = normalize_url(&raw.url);
                if key.is_empty() || !batch_seen.insert(key) {
                    continue;
                }
                let mut finding = self.processor.process(raw);
                self.scorer.score(&mut finding);
                findings.push(finding);
            }
        }

        let retained: Vec<Finding> = findings
            .iter()
            .filter(|f| f.credibility_score >= self.credibility_threshold)
            .cloned()
            .collect();
        let contradictions = self.scorer.detect_contradictions(&retained);

        SubQueryBatch {
            findings,
            warnings,
            contradictions,
        }
    }

    /// Single insertion point into state. Emits one `source_found` event
    /// per accepted finding, in acceptance order.
    fn merge(
        &self,
        batch: SubQueryBatch,
        state: &mut ResearchState,
        sink: &dyn EventSink,
    ) -> Vec<Finding> {
        for err in &batch.warnings {
            let message = err.to_string();
            tracing::warn!(source = err.source_name(), "adapter degraded: {message}");
            state.record_warning(&message);
            sink.emit(ResearchEvent::new(EventKind::Error, message));
        }

        let mut accepted = Vec::new();
        for finding in batch.findings {
            let data = json!({
                "url": finding.url,
                "title": finding.title,
                "source_type": finding.source_type,
                "domain": finding.domain,
                "credibility_score": finding.credibility_score,
            });
            let title = finding.title.clone();
            let copy = finding.clone();
            if state.insert(finding) {
                sink.emit(ResearchEvent::with_data(EventKind::SourceFound, title, data));
                accepted.push(copy);
            }
        }

        if !batch.contradictions.is_empty() {
            sink.emit(ResearchEvent::new(
                EventKind::Status,
                format!(
                    "Flagged {} potential contradiction(s)",
                    batch.contradictions.len()
                ),
            ));
            state.contradictions.extend(batch.contradictions);
        }
        accepted
    }
}
