//! Loadable state machine
//!
//! ```text
//!            verify ok          reset
//!   Unknown ───────────► Loaded ──────► Unknown
//!      │
//!      │ verify failed            reset
//!      └──────────────► LoadFailed ──► Unknown
//! ```
//!
//! `Loaded` and `LoadFailed` never change into each other directly: every
//! verification starts from `Unknown`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::PageResult;

/// Whether a page has been confirmed loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Not verified since creation or the last reset
    #[default]
    Unknown,
    /// Last verification passed (or the page was marked loaded)
    Loaded,
    /// Last verification failed
    LoadFailed,
}

impl LoadState {
    /// Whether moving from `self` to `next` is allowed
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        !matches!(
            (self, next),
            (Self::Loaded, Self::LoadFailed) | (Self::LoadFailed, Self::Loaded)
        )
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Loaded => f.write_str("loaded"),
            Self::LoadFailed => f.write_str("load_failed"),
        }
    }
}

/// Per-page load state plus the time of the last verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadStatus {
    state: LoadState,
    verified_at: Option<DateTime<Utc>>,
}

impl LoadStatus {
    /// Current state
    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// When the state last left `Unknown`
    #[must_use]
    pub const fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// `true` iff `Loaded`
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// Start a fresh verification
    pub(crate) fn begin(&mut self) {
        self.state = LoadState::Unknown;
    }

    /// Record the result of the verification started by [`begin`](Self::begin)
    pub(crate) fn finish(&mut self, passed: bool) -> LoadState {
        let next = if passed {
            LoadState::Loaded
        } else {
            LoadState::LoadFailed
        };
        debug_assert!(self.state.can_transition(next));
        self.state = next;
        self.verified_at = Some(Utc::now());
        next
    }

    /// Forget the last result
    pub(crate) fn reset(&mut self) {
        self.state = LoadState::Unknown;
        self.verified_at = None;
    }
}

type ValidationFn<P> = dyn Fn(&P) -> PageResult<bool> + Send + Sync;

/// Custom predicate that must hold, after the tree check, for a page to count as loaded
pub struct LoadValidation<P> {
    message: String,
    check: Box<ValidationFn<P>>,
}

impl<P> LoadValidation<P> {
    /// Validation reported as `message` when it does not hold
    pub fn new<F>(message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&P) -> PageResult<bool> + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            check: Box::new(check),
        }
    }

    /// Failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the predicate
    pub fn check(&self, page: &P) -> PageResult<bool> {
        (self.check)(page)
    }
}

impl<P> fmt::Debug for LoadValidation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadValidation")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
