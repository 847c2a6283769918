//! Result and error types for pagewright.
//!
//! The transient/fatal boundary is a closed set: only [`PageError::LookupMiss`]
//! is transient. Everything else aborts an in-progress wait.

use crate::driver::{LocateError, LocateErrorKind};
use crate::outcome::VerificationReport;
use std::time::Duration;
use thiserror::Error;

/// Result type for pagewright operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while checking or verifying pages
#[derive(Debug, Error)]
pub enum PageError {
    /// Nothing matched yet. Absorbed by the element checker and the timer.
    #[error("No element matched {selector} yet")]
    LookupMiss {
        /// Selector that matched nothing
        selector: String,
    },

    /// Non-transient driver fault (disconnected session, stale node, bad selector)
    #[error("Driver error ({kind}) while locating {selector}: {message}")]
    Driver {
        /// Selector being located when the fault occurred
        selector: String,
        /// Driver's classification of the fault
        kind: LocateErrorKind,
        /// Driver message
        message: String,
    },

    /// Strict wait elapsed without the condition becoming true
    #[error("Timed out after {elapsed:?} waiting for {waited_for} (last observed: {last_state})")]
    TimedOut {
        /// Description of the awaited condition
        waited_for: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Last state the condition observed
        last_state: String,
    },

    /// Page load verification found missing or unexpected nodes
    #[error("Load verification failed: {report}")]
    LoadVerificationFailed {
        /// Full verification report, including the outcome tree
        report: Box<VerificationReport>,
    },

    /// Invalid schema, selector constraints or configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Classify a driver error raised while locating `selector`
    #[must_use]
    pub fn from_locate(selector: impl Into<String>, err: LocateError) -> Self {
        let selector = selector.into();
        if err.is_transient() {
            Self::LookupMiss { selector }
        } else {
            Self::Driver {
                selector,
                kind: err.kind,
                message: err.message,
            }
        }
    }

    /// Whether a poll loop may retry after this error
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LookupMiss { .. })
    }

    /// The verification report carried by a load failure
    #[must_use]
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            Self::LoadVerificationFailed { report } => Some(report),
            _ => None,
        }
    }
}
