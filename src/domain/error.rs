//! Domain error taxonomy for report operations.
//!
//! Each variant maps to exactly one client-visible outcome; the HTTP
//! layer owns the status-code mapping.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// A single violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Offending field name as it appears on the wire.
    pub field: String,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure reported by a store adapter.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached (connection dropped, selection timeout).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed an operation.
    #[error("Store operation failed: {0}")]
    Operation(String),

    /// A stored document could not be mapped to a report.
    #[error("Corrupt document {id}: {reason}")]
    CorruptDocument { id: String, reason: String },
}

/// Errors returned by the repository and aggregator.
#[derive(Debug, Error)]
pub enum ReportError {
    /// One or more field rules failed; always carries every violation.
    #[error("Validation failed: {}", join_violations(.violations))]
    ValidationFailed { violations: Vec<Violation> },

    /// Identifier is not in the store's native syntax.
    #[error("Invalid report ID format")]
    InvalidIdentifier { value: String },

    /// No document matches the identifier.
    #[error("Report not found")]
    NotFound { id: String },

    /// Underlying store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    /// Build a validation failure from collected violations.
    pub const fn validation(violations: Vec<Violation>) -> Self {
        Self::ValidationFailed { violations }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
