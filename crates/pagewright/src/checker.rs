//! Element Checker
//!
//! Presence, absence, visibility and count checks for a single
//! [`SelectorSpec`]. A check is either one driver query or that same query
//! polled by the [`Timer`] until a deadline.
//!
//! Absence means "no matching node that passes the visibility filter": with
//! the filter on, a hidden match still satisfies an absence check.

use crate::config::Config;
use crate::driver::{Driver, NodeHandle};
use crate::result::{PageError, PageResult};
use crate::selector::{CountConstraint, SelectorSpec};
use crate::timer::{Deadline, Timer};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Polarity of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Located count must satisfy the spec's count constraint
    Present,
    /// No node may be located
    Absent,
}

impl Expectation {
    /// Whether `count` located nodes meet this expectation
    #[must_use]
    pub const fn is_met(self, constraint: CountConstraint, count: usize) -> bool {
        match self {
            Self::Present => constraint.is_satisfied_by(count),
            Self::Absent => count == 0,
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// How long a check may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wait {
    /// One query, no polling
    #[default]
    Immediate,
    /// Poll for the configured default timeout
    Default,
    /// Poll for this long
    For(Duration),
    /// Poll until a deadline shared with other checks
    Until(Deadline),
}

impl From<Duration> for Wait {
    fn from(timeout: Duration) -> Self {
        Self::For(timeout)
    }
}

impl From<Option<Duration>> for Wait {
    fn from(timeout: Option<Duration>) -> Self {
        timeout.map_or(Self::Immediate, Self::For)
    }
}

impl From<Deadline> for Wait {
    fn from(deadline: Deadline) -> Self {
        Self::Until(deadline)
    }
}

/// Outcome of one check, with the nodes seen by its last query
#[derive(Debug, Clone)]
pub struct Probe<H> {
    /// Whether the expectation was met
    pub satisfied: bool,
    /// Nodes located by the last query (after visibility filtering)
    pub handles: Vec<H>,
    /// Number of driver queries issued
    pub attempts: usize,
    /// Time spent
    pub elapsed: Duration,
}

/// Runs single-spec checks against a driver
#[derive(Debug)]
pub struct ElementChecker<'a, D: Driver> {
    driver: &'a D,
    config: &'a Config,
    timer: Timer,
}

impl<'a, D: Driver> ElementChecker<'a, D> {
    /// Checker using `config` for defaults and poll interval
    #[must_use]
    pub const fn new(driver: &'a D, config: &'a Config) -> Self {
        Self {
            driver,
            config,
            timer: Timer::from_config(config),
        }
    }

    /// The driver
    #[must_use]
    pub const fn driver(&self) -> &'a D {
        self.driver
    }

    /// The configuration
    #[must_use]
    pub const fn config(&self) -> &'a Config {
        self.config
    }

    /// One driver query, filtered by visibility
    ///
    /// # Errors
    ///
    /// [`PageError::LookupMiss`] when the driver reports "not found",
    /// [`PageError::Driver`] for any other driver fault.
    pub fn locate(&self, scope: Option<&D::Handle>, spec: &SelectorSpec) -> PageResult<Vec<D::Handle>> {
        let visible_only = spec.effective_visibility(self.config.visible_by_default);
        let located = self
            .driver
            .locate(scope, &spec.query(visible_only))
            .map_err(|err| PageError::from_locate(spec.selector().to_string(), err))?;
        if !visible_only {
            return Ok(located);
        }

        let mut visible = Vec::with_capacity(located.len());
        for handle in located {
            let shown = handle
                .is_visible()
                .map_err(|err| PageError::from_locate(spec.selector().to_string(), err))?;
            if shown {
                visible.push(handle);
            }
        }
        Ok(visible)
    }

    /// Matching nodes; a lookup miss is an empty result
    fn located_or_empty(&self, scope: Option<&D::Handle>, spec: &SelectorSpec) -> PageResult<Vec<D::Handle>> {
        match self.locate(scope, spec) {
            Err(err) if err.is_transient() => Ok(Vec::new()),
            other => other,
        }
    }

    /// Number of matching nodes right now
    pub fn count(&self, scope: Option<&D::Handle>, spec: &SelectorSpec) -> PageResult<usize> {
        self.located_or_empty(scope, spec).map(|handles| handles.len())
    }

    /// Check `spec` against `expectation`, waiting as `wait` allows
    pub fn check(
        &self,
        scope: Option<&D::Handle>,
        spec: &SelectorSpec,
        expectation: Expectation,
        wait: Wait,
    ) -> PageResult<bool> {
        self.probe(scope, spec, expectation, wait)
            .map(|probe| probe.satisfied)
    }

    /// Like [`check`](Self::check), keeping the located nodes
    pub fn probe(
        &self,
        scope: Option<&D::Handle>,
        spec: &SelectorSpec,
        expectation: Expectation,
        wait: Wait,
    ) -> PageResult<Probe<D::Handle>> {
        let deadline = match wait {
            Wait::Immediate => None,
            Wait::Default => Some(Deadline::after(self.config.default_timeout)),
            Wait::For(timeout) => Some(Deadline::after(timeout)),
            Wait::Until(deadline) => Some(deadline),
        };

        let probe = match deadline {
            None => {
                let started = Instant::now();
                let handles = self.located_or_empty(scope, spec)?;
                Probe {
                    satisfied: expectation.is_met(spec.count(), handles.len()),
                    handles,
                    attempts: 1,
                    elapsed: started.elapsed(),
                }
            }
            Some(deadline) => {
                let mut handles = Vec::new();
                let waited_for = format!("{spec} to be {expectation}");
                let result = self.timer.poll(&deadline, &waited_for, || {
                    handles = self.located_or_empty(scope, spec)?;
                    Ok(expectation.is_met(spec.count(), handles.len()))
                })?;
                Probe {
                    satisfied: result.satisfied,
                    handles,
                    attempts: result.attempts,
                    elapsed: result.elapsed,
                }
            }
        };

        debug!(
            selector = %spec,
            %expectation,
            count = probe.handles.len(),
            satisfied = probe.satisfied,
            attempts = probe.attempts,
            "element check"
        );
        Ok(probe)
    }

    /// Strict wait: fail with [`PageError::TimedOut`] if `timeout` passes first
    ///
    /// # Errors
    ///
    /// [`PageError::TimedOut`] carrying the last observed match count, or any
    /// non-transient driver error.
    pub fn wait_for(
        &self,
        scope: Option<&D::Handle>,
        spec: &SelectorSpec,
        expectation: Expectation,
        timeout: Duration,
    ) -> PageResult<Probe<D::Handle>> {
        let probe = self.probe(scope, spec, expectation, Wait::For(timeout))?;
        if probe.satisfied {
            return Ok(probe);
        }
        Err(PageError::TimedOut {
            waited_for: format!("{spec} to be {expectation}"),
            elapsed: probe.elapsed,
            last_state: format!("{} matching node(s)", probe.handles.len()),
        })
    }

    /// Resolve an iframe node into its document scope
    pub fn enter_frame(&self, spec: &SelectorSpec, frame: &D::Handle) -> PageResult<D::Handle> {
        self.driver
            .frame_scope(frame)
            .map_err(|err| PageError::from_locate(spec.selector().to_string(), err))
    }
}
