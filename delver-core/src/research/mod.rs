//! The research orchestration pipeline.
//!
//! One run flows through: decompose the query into sub-queries, fan each
//! sub-query out to every source adapter concurrently, process and score
//! what comes back, evaluate completeness, loop on the reported gaps until
//! coverage suffices or the iteration cap is hit, then synthesize a cited
//! report.

pub mod credibility;
pub mod decomposer;
pub mod engine;
pub mod evaluator;
pub mod orchestrator;
pub mod processor;
pub mod state;
pub mod synthesizer;

pub use engine::ResearchEngine;
pub use evaluator::{Completeness, CompletenessEvaluator, ModelEvaluator};
pub use orchestrator::SearchOrchestrator;
pub use state::{Contradiction, Finding, ResearchState, RunPhase, SubQuery};
pub use synthesizer::{Report, ReportSynthesizer};
