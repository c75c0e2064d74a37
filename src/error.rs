//! Error types for presto-link.
//!
//! Every failure the library can surface is a distinct variant so callers
//! branch on the kind, never on message text. Network-level retries happen
//! inside the transport and server-flagged retryable query errors inside the
//! query state machine; everything else propagates unchanged.

use crate::models::QueryError;
use std::fmt;

/// Result type for presto-link operations.
pub type Result<T> = std::result::Result<T, PrestoLinkError>;

/// Errors that can occur while driving a query.
#[derive(Debug)]
pub enum PrestoLinkError {
    /// Network-level failure after the transport's retry budget was exhausted.
    Transport(String),

    /// A request exceeded its configured timeout.
    Timeout(String),

    /// Credentials or handshake rejected by the coordinator (401/403).
    Auth(String),

    /// The initial statement POST was rejected or its response was malformed.
    QuerySubmission(String),

    /// The engine reported a query-level failure. Carries the structured
    /// error descriptor from the response body.
    ServerQuery(QueryError),

    /// A later page declared a column layout that differs from the schema
    /// captured on the first page.
    SchemaMismatch { expected: usize, actual: usize },

    /// A wire value could not be converted to the declared column type.
    DataConversion {
        row: usize,
        column: usize,
        presto_type: String,
        message: String,
    },

    /// Invalid client configuration (missing host, auth over plain HTTP, ...).
    Configuration(String),

    /// The coordinator returned a payload the client could not interpret.
    Protocol(String),
}

impl fmt::Display for PrestoLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrestoLinkError::Transport(msg) => write!(f, "transport error: {}", msg),
            PrestoLinkError::Timeout(msg) => write!(f, "timeout: {}", msg),
            PrestoLinkError::Auth(msg) => write!(f, "authentication error: {}", msg),
            PrestoLinkError::QuerySubmission(msg) => {
                write!(f, "query submission failed: {}", msg)
            }
            PrestoLinkError::ServerQuery(err) => write!(f, "query failed: {}", err),
            PrestoLinkError::SchemaMismatch { expected, actual } => write!(
                f,
                "schema mismatch: page declares {} columns, captured schema has {}",
                actual, expected
            ),
            PrestoLinkError::DataConversion {
                row,
                column,
                presto_type,
                message,
            } => write!(
                f,
                "cannot convert value at row {} column {} to {}: {}",
                row, column, presto_type, message
            ),
            PrestoLinkError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            PrestoLinkError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for PrestoLinkError {}

impl From<reqwest::Error> for PrestoLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PrestoLinkError::Timeout(err.to_string())
        } else {
            PrestoLinkError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PrestoLinkError {
    fn from(err: serde_json::Error) -> Self {
        PrestoLinkError::Protocol(err.to_string())
    }
}
