//! Progress event stream emitted by the engine.
//!
//! The core hands events to an abstract [`EventSink`] so it carries no
//! dependency on any wire protocol. A transport layer can plug in a
//! callback, a channel, or collect events in memory; events arrive in
//! causal order per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Kind of progress event, one variant per occurrence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Phase transitions and informational notices.
    Status,
    /// A sub-query was issued.
    SubQuery,
    /// An iteration boundary was crossed.
    Iteration,
    /// A finding was accepted post-dedup.
    SourceFound,
    /// Synthesis started.
    Synthesis,
    /// The run reached its terminal Done state.
    Complete,
    /// The final report payload.
    Report,
    /// A non-fatal warning or a fatal failure.
    Error,
}

/// A single progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchEvent {
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ResearchEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(
        kind: EventKind,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }
}

/// Abstract consumer of progress events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ResearchEvent);
}

/// Sink that discards every event.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: ResearchEvent) {}
}

/// Sink that forwards events into an unbounded channel, for transports
/// that want an async stream. Dropped receivers are tolerated: late emits
/// become no-ops rather than errors.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ResearchEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResearchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Channel variant that hands back the receiver as a `Stream`.
    pub fn stream() -> (Self, UnboundedReceiverStream<ResearchEvent>) {
        let (sink, rx) = Self::channel();
        (sink, UnboundedReceiverStream::new(rx))
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ResearchEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that records events in memory, used by tests to assert ordering.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ResearchEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ResearchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ResearchEvent) {
        self.events.lock().unwrap().push(event);
    }
}
