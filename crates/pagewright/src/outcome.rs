//! Check outcomes and verification reports
//!
//! A verification produces one [`CheckOutcome`] per visited node, arranged as
//! a tree mirroring the traversal, wrapped in a [`VerificationReport`].
//! Reports serialize to JSON and render as an indented tree for humans.

use crate::checker::Expectation;
use crate::path::VisitPath;
use crate::result::PageResult;
use crate::schema::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::time::Duration;
use uuid::Uuid;

/// How one node resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Expected present and found
    Present,
    /// Expected absent and not found
    Absent,
    /// Expected absent but found
    UnexpectedPresence,
    /// Expected present but not found (or wrong count)
    UnexpectedAbsence,
    /// Descent stopped at a repeated node; neither pass nor fail
    CyclicReference,
}

impl CheckStatus {
    /// Status for a check of `expectation` that was or was not satisfied
    #[must_use]
    pub const fn resolve(expectation: Expectation, satisfied: bool) -> Self {
        match (expectation, satisfied) {
            (Expectation::Present, true) => Self::Present,
            (Expectation::Present, false) => Self::UnexpectedAbsence,
            (Expectation::Absent, true) => Self::Absent,
            (Expectation::Absent, false) => Self::UnexpectedPresence,
        }
    }

    /// Whether the node failed its check
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::UnexpectedPresence | Self::UnexpectedAbsence)
    }

    /// snake_case name, as serialized
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::UnexpectedPresence => "unexpected_presence",
            Self::UnexpectedAbsence => "unexpected_absence",
            Self::CyclicReference => "cyclic_reference",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of checking one node, with its nested results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Node name (`name[i]` for one instance of a section collection)
    pub name: String,
    /// Node kind
    pub kind: NodeKind,
    /// Where the node sits in the tree
    pub path: VisitPath,
    /// How the node resolved
    pub status: CheckStatus,
    /// Matches seen by the last query; `None` when no query was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Outcomes of nested nodes, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CheckOutcome>,
}

impl CheckOutcome {
    /// Whether this node or any descendant failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.status.is_failure() || self.children.iter().any(Self::has_failures)
    }

    /// This outcome and every descendant, depth first
    pub fn iter(&self) -> impl Iterator<Item = &CheckOutcome> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    fn render(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let mark = match self.status {
            CheckStatus::Present | CheckStatus::Absent => "ok",
            CheckStatus::UnexpectedPresence | CheckStatus::UnexpectedAbsence => "FAIL",
            CheckStatus::CyclicReference => "cycle",
        };
        let _ = write!(out, "{indent}[{mark}] {} ({}): {}", self.name, self.kind, self.status);
        if let Some(count) = self.count {
            let _ = write!(out, ", {count} found");
        }
        out.push('\n');
        for child in &self.children {
            child.render(depth + 1, out);
        }
    }
}

/// Outcome of verifying a whole page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Identifies this verification in logs
    pub run_id: Uuid,
    /// Root page name
    pub page: String,
    /// Shared time budget
    pub timeout: Duration,
    /// Time actually spent
    pub elapsed: Duration,
    /// Top-level outcomes in declaration order
    pub outcomes: Vec<CheckOutcome>,
    /// Messages of load validations that did not hold
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failures: Vec<String>,
}

impl VerificationReport {
    /// Every node resolved per its polarity and every validation held
    #[must_use]
    pub fn passed(&self) -> bool {
        self.validation_failures.is_empty() && !self.outcomes.iter().any(CheckOutcome::has_failures)
    }

    /// Every outcome in the tree, depth first
    pub fn iter(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().flat_map(|outcome| outcome.iter())
    }

    /// Failing outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&CheckOutcome> {
        self.iter().filter(|outcome| outcome.status.is_failure()).collect()
    }

    /// Outcomes where descent stopped at a cycle
    #[must_use]
    pub fn cycles(&self) -> Vec<&CheckOutcome> {
        self.iter()
            .filter(|outcome| outcome.status == CheckStatus::CyclicReference)
            .collect()
    }

    /// Paths of nodes expected present but not found
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.paths_with(CheckStatus::UnexpectedAbsence)
    }

    /// Paths of nodes expected present and found
    #[must_use]
    pub fn present(&self) -> Vec<String> {
        self.paths_with(CheckStatus::Present)
    }

    fn paths_with(&self, status: CheckStatus) -> Vec<String> {
        self.iter()
            .filter(|outcome| outcome.status == status)
            .map(|outcome| outcome.path.to_string())
            .collect()
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> PageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Multi-line tree, one node per line
    #[must_use]
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let verdict = if self.passed() { "passed" } else { "FAILED" };
        let _ = writeln!(
            out,
            "{} {verdict} in {:?} (budget {:?}, run {})",
            self.page, self.elapsed, self.timeout, self.run_id
        );
        for outcome in &self.outcomes {
            outcome.render(1, &mut out);
        }
        for message in &self.validation_failures {
            let _ = writeln!(out, "  [FAIL] validation: {message}");
        }
        out
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "{} verified in {:?}", self.page, self.elapsed);
        }

        let failures = self.failures();
        write!(f, "{} failed {} check(s)", self.page, failures.len())?;
        let mut separator = ": ";
        for outcome in failures {
            write!(f, "{separator}{} ({})", outcome.path, outcome.status)?;
            separator = ", ";
        }
        for message in &self.validation_failures {
            write!(f, "{separator}validation \"{message}\"")?;
            separator = ", ";
        }
        Ok(())
    }
}
