//! Error model shared by the query and mutation layers.

use std::time::Duration;

use thiserror::Error;

/// Result type used across the graph layer.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph-level error.
///
/// Every failure path surfaces one of these. Absence of an entity is not an
/// error: lookups return `Ok(None)` for that case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A global reference could not be decoded.
    #[error("malformed reference: {0}")]
    MalformedReference(String),

    /// A caller-supplied argument was out of range (e.g. negative page size).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target of a mutation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The transport boundary failed before a result came back.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The transport boundary gave up waiting for a result.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl GraphError {
    pub fn malformed_reference(msg: impl Into<String>) -> Self {
        Self::MalformedReference(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Stable machine-readable code, used in logs and client-facing payloads.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::MalformedReference(_) => "malformed_reference",
            GraphError::InvalidArgument(_) => "invalid_argument",
            GraphError::NotFound(_) => "not_found",
            GraphError::Transport(_) => "transport_error",
            GraphError::Timeout(_) => "timeout",
        }
    }
}
