//! Selectors and the matching constraints declared for one node.
//!
//! # Design Philosophy
//!
//! - **Validated once**: count options are resolved into a [`CountConstraint`]
//!   when the schema is built, so an impossible constraint never reaches a check
//! - **Immutable**: a [`SelectorSpec`] has no setters
//! - **Driver-neutral**: selectors are data; the driver decides how to run them

use crate::driver::Query;
use crate::result::{PageError, PageResult};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => f.write_str(s),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "[data-testid=\"{id}\"]"),
        }
    }
}

impl From<&str> for Selector {
    fn from(css: &str) -> Self {
        Self::css(css)
    }
}

/// How many located nodes satisfy a presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountConstraint {
    /// One or more (no constraint declared)
    #[default]
    AtLeastOne,
    /// Exactly `n`
    Exactly(usize),
    /// Inclusive bounds; a missing bound is open
    Range {
        /// Inclusive lower bound
        min: Option<usize>,
        /// Inclusive upper bound
        max: Option<usize>,
    },
}

impl CountConstraint {
    /// Whether `count` located nodes satisfy the constraint
    #[must_use]
    pub const fn is_satisfied_by(&self, count: usize) -> bool {
        match *self {
            Self::AtLeastOne => count >= 1,
            Self::Exactly(n) => count == n,
            Self::Range { min, max } => {
                let above = match min {
                    Some(min) => count >= min,
                    None => true,
                };
                let below = match max {
                    Some(max) => count <= max,
                    None => true,
                };
                above && below
            }
        }
    }
}

impl std::fmt::Display for CountConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::AtLeastOne => f.write_str("at least 1"),
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::Range {
                min: Some(min),
                max: Some(max),
            } => write!(f, "between {min} and {max}"),
            Self::Range {
                min: Some(min),
                max: None,
            } => write!(f, "at least {min}"),
            Self::Range {
                min: None,
                max: Some(max),
            } => write!(f, "at most {max}"),
            Self::Range {
                min: None,
                max: None,
            } => f.write_str("any number"),
        }
    }
}

/// Locator plus matching constraints for one declared node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    selector: Selector,
    visible: Option<bool>,
    text: Option<String>,
    count: CountConstraint,
}

impl SelectorSpec {
    /// Spec with no options; always valid
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            visible: None,
            text: None,
            count: CountConstraint::AtLeastOne,
        }
    }

    /// CSS spec with no options
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selector::css(selector))
    }

    /// Start building a spec with options
    #[must_use]
    pub fn builder(selector: impl Into<Selector>) -> SelectorSpecBuilder {
        SelectorSpecBuilder::new(selector)
    }

    /// The selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Declared visibility filter, if any
    #[must_use]
    pub const fn visible(&self) -> Option<bool> {
        self.visible
    }

    /// Text filter
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Resolved count constraint
    #[must_use]
    pub const fn count(&self) -> CountConstraint {
        self.count
    }

    /// Visibility filter after falling back to the configured default
    #[must_use]
    pub fn effective_visibility(&self, default: bool) -> bool {
        self.visible.unwrap_or(default)
    }

    /// Build the driver query for this spec
    #[must_use]
    pub fn query(&self, visible_only: bool) -> Query<'_> {
        Query {
            selector: &self.selector,
            text: self.text.as_deref(),
            visible_only,
        }
    }
}

impl std::fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(text) = &self.text {
            write!(f, " with text {text:?}")?;
        }
        if self.count != CountConstraint::AtLeastOne {
            write!(f, " ({})", self.count)?;
        }
        Ok(())
    }
}

/// Raw, unvalidated spec options as declared on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSpecBuilder {
    selector: Selector,
    visible: Option<bool>,
    text: Option<String>,
    exact: Option<usize>,
    minimum: Option<usize>,
    maximum: Option<usize>,
    between: Option<(usize, usize)>,
}

impl SelectorSpecBuilder {
    /// Create a builder for `selector`
    #[must_use]
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            visible: None,
            text: None,
            exact: None,
            minimum: None,
            maximum: None,
            between: None,
        }
    }

    /// Require (or explicitly not require) visible matches
    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Only match nodes whose text contains `text`
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Require exactly `n` matches
    #[must_use]
    pub const fn exact(mut self, n: usize) -> Self {
        self.exact = Some(n);
        self
    }

    /// Require at least `n` matches
    #[must_use]
    pub const fn minimum(mut self, n: usize) -> Self {
        self.minimum = Some(n);
        self
    }

    /// Allow at most `n` matches
    #[must_use]
    pub const fn maximum(mut self, n: usize) -> Self {
        self.maximum = Some(n);
        self
    }

    /// Require a match count within `range`
    #[must_use]
    pub fn between(mut self, range: RangeInclusive<usize>) -> Self {
        self.between = Some((*range.start(), *range.end()));
        self
    }

    /// Resolve the count options into a [`CountConstraint`]
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Configuration`] for inconsistent options.
    pub fn resolve_count(&self) -> PageResult<CountConstraint> {
        let selector = &self.selector;
        if let Some(n) = self.exact {
            if self.minimum.is_some() || self.maximum.is_some() || self.between.is_some() {
                return Err(PageError::configuration(format!(
                    "{selector}: exact count {n} cannot be combined with minimum, maximum or between"
                )));
            }
            return Ok(CountConstraint::Exactly(n));
        }
        if let Some((start, end)) = self.between {
            if self.minimum.is_some() || self.maximum.is_some() {
                return Err(PageError::configuration(format!(
                    "{selector}: between cannot be combined with minimum or maximum"
                )));
            }
            if start > end {
                return Err(PageError::configuration(format!(
                    "{selector}: between {start}..={end} is empty"
                )));
            }
            return Ok(CountConstraint::Range {
                min: Some(start),
                max: Some(end),
            });
        }
        match (self.minimum, self.maximum) {
            (None, None) => Ok(CountConstraint::AtLeastOne),
            (Some(min), Some(max)) if min > max => Err(PageError::configuration(format!(
                "{selector}: minimum {min} exceeds maximum {max}"
            ))),
            (min, max) => Ok(CountConstraint::Range { min, max }),
        }
    }

    /// Validate and build the spec
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Configuration`] for inconsistent count options.
    pub fn build(self) -> PageResult<SelectorSpec> {
        let count = self.resolve_count()?;
        Ok(SelectorSpec {
            selector: self.selector,
            visible: self.visible,
            text: self.text,
            count,
        })
    }
}

impl From<Selector> for SelectorSpecBuilder {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl From<&str> for SelectorSpecBuilder {
    fn from(css: &str) -> Self {
        Self::new(Selector::css(css))
    }
}

impl From<SelectorSpec> for SelectorSpecBuilder {
    fn from(spec: SelectorSpec) -> Self {
        let mut builder = Self::new(spec.selector);
        builder.visible = spec.visible;
        builder.text = spec.text;
        match spec.count {
            CountConstraint::AtLeastOne => {}
            CountConstraint::Exactly(n) => builder.exact = Some(n),
            CountConstraint::Range { min, max } => {
                builder.minimum = min;
                builder.maximum = max;
            }
        }
        builder
    }
}
