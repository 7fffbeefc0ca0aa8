//! Error types for the claims reconciler
//!
//! Observed-state problems that make a reconcile pass unsafe to act on are
//! reported as [`Error::InvalidData`]. Malformed user input on the topology
//! (claim size, volume mode) never shows up here; it is logged and defaulted
//! by the renderer instead.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the claims reconciler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Observed State Errors
    // =========================================================================
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Topology definition error: {topology} - {reason}")]
    Definition { topology: String, reason: String },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Quantity parse error: {0}")]
    QuantityParse(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics registration error: {0}")]
    Prometheus(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) | Error::InvalidData(_) => ErrorAction::RequeueWithBackoff,

            // A bad definition only changes when the user edits the topology
            Error::Definition { .. } => ErrorAction::RequeueAfter(Duration::from_secs(60)),

            // Configuration/validation errors - don't retry automatically
            Error::Configuration(_)
            | Error::QuantityParse(_)
            | Error::Yaml(_)
            | Error::Json(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Kube(_))
    }
}

/// Result type alias for the claims reconciler
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::InvalidData("topology node label is missing".into());
        assert_eq!(err.action(), ErrorAction::RequeueWithBackoff);

        let err = Error::Configuration("bad config".into());
        assert_eq!(err.action(), ErrorAction::NoRequeue);

        let err = Error::Definition {
            topology: "lab".into(),
            reason: "no nodes".into(),
        };
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_error_retryable() {
        let integrity = Error::InvalidData("labels are nil".into());
        assert!(integrity.is_retryable());
        assert!(!integrity.is_transient());

        let config_err = Error::QuantityParse("10Gx".into());
        assert!(!config_err.is_retryable());
        assert!(!config_err.is_transient());
    }
}
