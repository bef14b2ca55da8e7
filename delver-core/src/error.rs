//! Error types for the Delver research engine.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering source adapters, language-model capabilities, and the run
//! boundary. Adapter and capability failures are downgraded at their
//! originating component; only a total inability to produce a report
//! surfaces as `DelverError::RunFailed`.

/// Top-level error type for the Delver core library.
#[derive(Debug, thiserror::Error)]
pub enum DelverError {
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Research run failed: {message}")]
    RunFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a single source adapter.
///
/// Always non-fatal at the run level: the orchestrator downgrades these to
/// zero findings from that adapter plus a recorded warning.
#[derive(Debug, Clone)]
pub enum AdapterError {
    Unavailable { source: String, message: String },

    Timeout { source: String, timeout_secs: u64 },

    Malformed { source: String, message: String },
}

// Display and Error are implemented by hand rather than via `thiserror::Error`
// because thiserror unconditionally treats a field literally named `source` as
// the error's `std::error::Error` source. Here `source` holds the adapter's
// name (a `String`, not an error), so the derive fails to compile. The manual
// impls reproduce the exact message formats the variants previously declared
// and leave `Error::source()` at its default (`None`).
impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::Unavailable { source, message } => {
                write!(f, "Source '{source}' unavailable: {message}")
            }
            AdapterError::Timeout {
                source,
                timeout_secs,
            } => write!(f, "Source '{source}' timed out after {timeout_secs}s"),
            AdapterError::Malformed { source, message } => {
                write!(f, "Source '{source}' returned a malformed response: {message}")
            }
        }
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    /// Name of the adapter this error originated from.
    pub fn source_name(&self) -> &str {
        match self {
            AdapterError::Unavailable { source, .. }
            | AdapterError::Timeout { source, .. }
            | AdapterError::Malformed { source, .. } => source,
        }
    }
}

/// Errors from the injected language-model capability.
///
/// Each consumer degrades on these: decomposition falls back to the
/// identity decomposition, completeness evaluation to "complete", and
/// synthesis to the deterministic template.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    #[error("Capability request failed: {message}")]
    Request { message: String },

    #[error("Capability response unparsable: {message}")]
    Parse { message: String },

    #[error("Capability timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DelverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_error_carries_source_name() {
        let err = AdapterError::Timeout {
            source: "wikipedia".into(),
            timeout_secs: 10,
        };
        assert_eq!(err.source_name(), "wikipedia");
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn adapter_error_converts_to_top_level() {
        let err: DelverError = AdapterError::Unavailable {
            source: "web".into(),
            message: "connection refused".into(),
        }
        .into();
        assert!(matches!(err, DelverError::Adapter(_)));
    }
}
