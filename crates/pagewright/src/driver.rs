//! Driver contract - the browser-automation seam.
//!
//! pagewright never talks to a browser. Anything that can locate nodes by
//! selector and report their visibility can back a page: a CDP session, a
//! WebDriver client, or the in-memory [`MockDriver`](crate::mock::MockDriver).
//!
//! ```text
//! ┌────────────────────┐   Query    ┌─────────────────────┐
//! │  ElementChecker    │──────────►│  Driver (external)   │
//! │  (one query/poll)  │◄──────────│  locate + visible?   │
//! └────────────────────┘  handles   └─────────────────────┘
//! ```
//!
//! A lookup that matches nothing may either return an empty sequence or fail
//! with [`LocateErrorKind::NotFound`]; both mean "zero matches".

use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Driver's classification of a lookup failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateErrorKind {
    /// Nothing matched (yet). The only transient kind.
    NotFound,
    /// A previously located node is no longer attached
    StaleReference,
    /// The driver session is gone
    Disconnected,
    /// The selector could not be parsed
    InvalidSelector,
    /// Any other driver fault
    Other,
}

impl LocateErrorKind {
    /// Whether polling may continue past this failure
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Stable name used in logs and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::StaleReference => "stale_reference",
            Self::Disconnected => "disconnected",
            Self::InvalidSelector => "invalid_selector",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for LocateErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`Driver`] or [`NodeHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct LocateError {
    /// Classification
    pub kind: LocateErrorKind,
    /// Driver message
    pub message: String,
}

impl LocateError {
    /// Create a new locate error
    #[must_use]
    pub fn new(kind: LocateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Nothing matched
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(LocateErrorKind::NotFound, message)
    }

    /// Node detached from the document
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(LocateErrorKind::StaleReference, message)
    }

    /// Session lost
    #[must_use]
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(LocateErrorKind::Disconnected, message)
    }

    /// Selector rejected by the driver
    #[must_use]
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::new(LocateErrorKind::InvalidSelector, message)
    }

    /// Whether polling may continue past this failure
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// One lookup request handed to a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query<'a> {
    /// What to locate
    pub selector: &'a Selector,
    /// Only nodes whose text contains this
    pub text: Option<&'a str>,
    /// Hint that only visible nodes are wanted. Drivers may pre-filter;
    /// the checker still consults [`NodeHandle::is_visible`].
    pub visible_only: bool,
}

/// A located node
pub trait NodeHandle: Clone + std::fmt::Debug {
    /// Whether the node is currently rendered visibly
    fn is_visible(&self) -> Result<bool, LocateError>;
}

/// External browser-automation driver
///
/// Implementations must be usable through a shared reference: a single
/// verification issues many queries against the same session.
pub trait Driver {
    /// Located node type
    type Handle: NodeHandle;

    /// Locate nodes matching `query`, inside `scope` when given
    fn locate(
        &self,
        scope: Option<&Self::Handle>,
        query: &Query<'_>,
    ) -> Result<Vec<Self::Handle>, LocateError>;

    /// Resolve an iframe node into the scope of its document
    fn frame_scope(&self, frame: &Self::Handle) -> Result<Self::Handle, LocateError> {
        Ok(frame.clone())
    }
}

impl<D: Driver + ?Sized> Driver for &D {
    type Handle = D::Handle;

    fn locate(
        &self,
        scope: Option<&Self::Handle>,
        query: &Query<'_>,
    ) -> Result<Vec<Self::Handle>, LocateError> {
        (**self).locate(scope, query)
    }

    fn frame_scope(&self, frame: &Self::Handle) -> Result<Self::Handle, LocateError> {
        (**self).frame_scope(frame)
    }
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    type Handle = D::Handle;

    fn locate(
        &self,
        scope: Option<&Self::Handle>,
        query: &Query<'_>,
    ) -> Result<Vec<Self::Handle>, LocateError> {
        (**self).locate(scope, query)
    }

    fn frame_scope(&self, frame: &Self::Handle) -> Result<Self::Handle, LocateError> {
        (**self).frame_scope(frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod locate_error_tests {
        use super::*;

        #[test]
        fn test_only_not_found_is_transient() {
            assert!(LocateErrorKind::NotFound.is_transient());
            assert!(!LocateErrorKind::StaleReference.is_transient());
            assert!(!LocateErrorKind::Disconnected.is_transient());
            assert!(!LocateErrorKind::InvalidSelector.is_transient());
            assert!(!LocateErrorKind::Other.is_transient());
        }

        #[test]
        fn test_constructors() {
            assert_eq!(
                LocateError::not_found("x").kind,
                LocateErrorKind::NotFound
            );
            assert_eq!(
                LocateError::invalid_selector("x").kind,
                LocateErrorKind::InvalidSelector
            );
            assert!(LocateError::not_found("x").is_transient());
            assert!(!LocateError::stale("x").is_transient());
        }

        #[test]
        fn test_display() {
            let err = LocateError::disconnected("socket closed");
            assert_eq!(err.to_string(), "disconnected: socket closed");
        }
    }

    mod blanket_impl_tests {
        use super::*;

        #[derive(Debug, Clone)]
        struct Stub;

        impl NodeHandle for Stub {
            fn is_visible(&self) -> Result<bool, LocateError> {
                Ok(true)
            }
        }

        #[derive(Debug)]
        struct OneNodeDriver;

        impl Driver for OneNodeDriver {
            type Handle = Stub;

            fn locate(
                &self,
                _scope: Option<&Stub>,
                _query: &Query<'_>,
            ) -> Result<Vec<Stub>, LocateError> {
                Ok(vec![Stub])
            }
        }

        fn count<D: Driver>(driver: &D) -> usize {
            let selector = Selector::css("p");
            let query = Query {
                selector: &selector,
                text: None,
                visible_only: false,
            };
            driver.locate(None, &query).unwrap().len()
        }

        #[test]
        fn test_reference_and_arc_delegate() {
            let driver = OneNodeDriver;
            assert_eq!(count(&&driver), 1);
            assert_eq!(count(&Arc::new(OneNodeDriver)), 1);
        }

        #[test]
        fn test_default_frame_scope_is_identity() {
            let driver = OneNodeDriver;
            assert!(driver.frame_scope(&Stub).is_ok());
        }
    }
}
