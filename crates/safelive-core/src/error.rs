//! Error taxonomy for the workflow engine
//!
//! Callers branch on variants, never on message text. Every rejection happens
//! before any mutation; side-effect failures after a committed transition are
//! logged at the call site and never surfaced through this type.

use crate::repo::StoreError;

/// Workflow error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed input: bad status string, missing required field
    #[error("validation failed: {0}")]
    Validation(String),

    /// Role lacks permission, scope mismatch, or stale/invalid token
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Missing incident/ticket/challenge/account
    #[error("not found: {0}")]
    NotFound(String),

    /// Resend-too-soon, already-used token/challenge; retry-later semantic
    #[error("conflict: {0}")]
    Conflict(String),

    /// No notification channel succeeded where one was required
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Record store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification for boundary-layer mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input
    Validation,
    /// Permission or token failure
    Authorization,
    /// Missing record
    NotFound,
    /// Retry-later conflict
    Conflict,
    /// Notification delivery failure
    Delivery,
    /// Persistence failure
    Store,
}

impl WorkflowError {
    /// Build a validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an authorization error
    #[inline]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Build a not-found error
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Build a conflict error
    #[inline]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Delivery(_) => ErrorKind::Delivery,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// Whether the caller may retry the same request later
    #[inline]
    #[must_use]
    pub fn retry_later(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Store)
    }
}
