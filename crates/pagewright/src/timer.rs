//! Deadline Timer
//!
//! Bounded polling for synchronization with an asynchronously rendering page.
//!
//! ## Toyota Way Application
//!
//! - **Heijunka**: Fixed polling cadence, no backoff; drivers already retry internally
//! - **Jidoka**: Non-transient failures stop the line immediately
//!
//! One [`Deadline`] can be shared by many waits. Every wait consumes the same
//! remaining budget, so a whole-tree verification never takes longer than its
//! single timeout (plus at most one poll interval and one final query).

use crate::config::{clamp_poll_interval, Config};
use crate::result::{PageError, PageResult};
use std::time::{Duration, Instant};
use tracing::debug;

// =============================================================================
// DEADLINE
// =============================================================================

/// A fixed point in time by which a wait must finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Total budget
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Time since the deadline was set
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Budget left (zero once expired)
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// Whether the budget is used up
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// What the timer does when the deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Report `satisfied: false`
    #[default]
    Lenient,
    /// Fail with [`PageError::TimedOut`]
    Strict,
}

/// Result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the predicate returned true
    pub satisfied: bool,
    /// Number of predicate evaluations
    pub attempts: usize,
    /// Time since the deadline was set
    pub elapsed: Duration,
}

// =============================================================================
// TIMER
// =============================================================================

/// Polls predicates at a fixed interval until true or out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    poll_interval: Duration,
    strictness: Strictness,
}

impl Timer {
    /// Lenient timer with the given interval (at least [`MIN_POLL_INTERVAL`](crate::MIN_POLL_INTERVAL))
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: clamp_poll_interval(poll_interval),
            strictness: Strictness::Lenient,
        }
    }

    /// Lenient timer using the configured interval
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval)
    }

    /// Set strictness
    #[must_use]
    pub const fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Fail with `TimedOut` instead of returning false
    #[must_use]
    pub const fn strict(self) -> Self {
        self.with_strictness(Strictness::Strict)
    }

    /// Sleep between polls
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Strictness
    #[must_use]
    pub const fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Poll `predicate` for up to `timeout`
    ///
    /// A zero timeout evaluates the predicate exactly once.
    pub fn wait_until<F>(&self, timeout: Duration, predicate: F) -> PageResult<bool>
    where
        F: FnMut() -> PageResult<bool>,
    {
        self.poll(&Deadline::after(timeout), "condition", predicate)
            .map(|result| result.satisfied)
    }

    /// Poll `predicate` until it returns true or `deadline` passes
    ///
    /// The predicate always runs at least once, even against an expired
    /// deadline. Transient errors count as `false`; any other error is
    /// returned immediately.
    ///
    /// # Errors
    ///
    /// Non-transient predicate errors, or [`PageError::TimedOut`] in strict mode.
    #[allow(unused_assignments)]
    pub fn poll<F>(&self, deadline: &Deadline, waited_for: &str, mut predicate: F) -> PageResult<WaitResult>
    where
        F: FnMut() -> PageResult<bool>,
    {
        let mut attempts = 0;
        let mut last_state = String::from("false");

        loop {
            attempts += 1;
            match predicate() {
                Ok(true) => {
                    return Ok(WaitResult {
                        satisfied: true,
                        attempts,
                        elapsed: deadline.elapsed(),
                    });
                }
                Ok(false) => last_state = String::from("false"),
                Err(err) if err.is_transient() => {
                    debug!(%waited_for, attempts, error = %err, "transient failure while polling");
                    last_state = err.to_string();
                }
                Err(err) => return Err(err),
            }

            let remaining = deadline.remaining();
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(self.poll_interval.min(remaining));
        }

        let elapsed = deadline.elapsed();
        debug!(%waited_for, attempts, elapsed_ms = elapsed.as_millis() as u64, "deadline reached");
        match self.strictness {
            Strictness::Lenient => Ok(WaitResult {
                satisfied: false,
                attempts,
                elapsed,
            }),
            Strictness::Strict => Err(PageError::TimedOut {
                waited_for: waited_for.to_string(),
                elapsed,
                last_state,
            }),
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
