// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the query engine.
///
/// Search, traversal and filter evaluation never fail: "no match" is an empty
/// result. Only the bookkeeping layer (named filter sets, saved searches,
/// import/restore) hands these back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A criteria value has the wrong shape for its operator.
    ///
    /// Evaluation catches this and fails the single predicate closed.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Filter set not found: {0}")]
    FilterSetNotFound(String),

    #[error("Saved search not found: {0}")]
    SavedSearchNotFound(String),

    /// An externally supplied payload (import, restore, config file) is malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl QueryError {
    pub(crate) fn config(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{context}: {err}"))
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
