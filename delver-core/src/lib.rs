//! # Delver Core
//!
//! Core library for the Delver deep-research engine. Provides the research
//! orchestration pipeline (query decomposition, concurrent multi-source
//! retrieval, credibility scoring, the iterative completeness loop, and
//! citation-aware synthesis), the source adapter contract, the injected
//! language-model capability boundary, configuration, and the progress
//! event stream.

pub mod adapter;
pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod research;

// Re-export commonly used types at the crate root.
pub use adapter::{RawFinding, SourceAdapter, SourceType};
pub use capability::{LanguageCapability, StaticCapability};
pub use config::{ResearchConfig, ScoringConfig};
pub use error::{AdapterError, CapabilityError, DelverError, Result};
pub use events::{ChannelSink, EventKind, EventSink, MemorySink, NoOpSink, ResearchEvent};
pub use research::{
    Completeness, CompletenessEvaluator, Contradiction, Finding, Report, ResearchEngine,
    ResearchState, RunPhase, SubQuery,
};
