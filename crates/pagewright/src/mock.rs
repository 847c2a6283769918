//! In-memory driver for tests, benches and demos.
//!
//! A [`MockDriver`] holds a small tree of [`MockElement`]s keyed by the exact
//! selector string that locates them. Elements can appear, disappear or become
//! visible on a schedule measured from the driver's creation, which is enough
//! to reproduce a slow page without a browser. Every `locate` call is logged.
//!
//! ## Example
//!
//! ```rust,ignore
//! let driver = MockDriver::new()
//!     .with_element(MockElement::new(".title").appearing_after(Duration::from_millis(500)))
//!     .with_element(MockElement::new("#form").with_child(MockElement::new("#submit")));
//!
//! assert_eq!(driver.query_count("#submit"), 0);
//! ```

use crate::driver::{Driver, LocateError, NodeHandle, Query};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A scripted DOM node
#[derive(Debug, Clone)]
pub struct MockElement {
    selector: String,
    text: Option<String>,
    visible: bool,
    visible_after: Option<Duration>,
    appears_after: Duration,
    disappears_after: Option<Duration>,
    stale: bool,
    children: Vec<Arc<MockElement>>,
}

impl MockElement {
    /// Visible node located by `selector`, present from the start
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
            visible: true,
            visible_after: None,
            appears_after: Duration::ZERO,
            disappears_after: None,
            stale: false,
            children: Vec::new(),
        }
    }

    /// Attached but never visible
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Hidden until `delay` has passed
    #[must_use]
    pub const fn visible_after(mut self, delay: Duration) -> Self {
        self.visible_after = Some(delay);
        self
    }

    /// Not attached until `delay` has passed
    #[must_use]
    pub const fn appearing_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Detached once `delay` has passed
    #[must_use]
    pub const fn disappearing_after(mut self, delay: Duration) -> Self {
        self.disappears_after = Some(delay);
        self
    }

    /// Handles to this node fail visibility checks with a stale reference
    #[must_use]
    pub const fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    /// Nest a node inside this one
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Nest `count` copies of a node inside this one
    #[must_use]
    pub fn with_children(mut self, child: &Self, count: usize) -> Self {
        let child = Arc::new(child.clone());
        self.children
            .extend(std::iter::repeat_with(|| Arc::clone(&child)).take(count));
        self
    }

    /// Selector that locates this node
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn is_attached(&self, elapsed: Duration) -> bool {
        elapsed >= self.appears_after && self.disappears_after.map_or(true, |gone| elapsed < gone)
    }

    fn is_visible_at(&self, elapsed: Duration) -> bool {
        self.visible && self.visible_after.map_or(true, |shown| elapsed >= shown)
    }

    fn matches(&self, key: &str, text: Option<&str>, elapsed: Duration) -> bool {
        self.selector == key
            && self.is_attached(elapsed)
            && text.map_or(true, |wanted| {
                self.text.as_deref().is_some_and(|actual| actual.contains(wanted))
            })
    }
}

/// Handle to a located [`MockElement`]
#[derive(Debug, Clone)]
pub struct MockHandle {
    element: Arc<MockElement>,
    clock: Instant,
}

impl MockHandle {
    /// Selector of the located node
    #[must_use]
    pub fn selector(&self) -> &str {
        self.element.selector()
    }

    /// Text of the located node
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.element.text.as_deref()
    }
}

impl NodeHandle for MockHandle {
    fn is_visible(&self) -> Result<bool, LocateError> {
        if self.element.stale {
            return Err(LocateError::stale(format!(
                "{} is no longer attached",
                self.element.selector
            )));
        }
        Ok(self.element.is_visible_at(self.clock.elapsed()))
    }
}

/// Scriptable in-memory [`Driver`]
#[derive(Debug)]
pub struct MockDriver {
    clock: Instant,
    roots: Vec<Arc<MockElement>>,
    faults: HashMap<String, LocateError>,
    misses_as_errors: bool,
    queries: Mutex<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Empty document; the schedule clock starts now
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Instant::now(),
            roots: Vec::new(),
            faults: HashMap::new(),
            misses_as_errors: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Add a top-level node
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.roots.push(Arc::new(element));
        self
    }

    /// Add `count` visible top-level nodes located by `selector`
    #[must_use]
    pub fn with_elements(mut self, selector: &str, count: usize) -> Self {
        let element = Arc::new(MockElement::new(selector));
        self.roots
            .extend(std::iter::repeat_with(|| Arc::clone(&element)).take(count));
        self
    }

    /// Fail every lookup of `selector` with `error`
    #[must_use]
    pub fn with_fault(mut self, selector: impl Into<String>, error: LocateError) -> Self {
        let _ = self.faults.insert(selector.into(), error);
        self
    }

    /// Report empty lookups as `NotFound` errors instead of empty results
    #[must_use]
    pub const fn with_misses_as_errors(mut self, enabled: bool) -> Self {
        self.misses_as_errors = enabled;
        self
    }

    /// Time since the driver was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Every selector queried so far, in order
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of lookups issued for `selector`
    #[must_use]
    pub fn query_count(&self, selector: &str) -> usize {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|queried| queried.as_str() == selector)
            .count()
    }

    /// Forget logged queries
    pub fn clear_queries(&self) {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Driver for MockDriver {
    type Handle = MockHandle;

    fn locate(
        &self,
        scope: Option<&MockHandle>,
        query: &Query<'_>,
    ) -> Result<Vec<MockHandle>, LocateError> {
        let key = query.selector.to_string();
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());

        if let Some(fault) = self.faults.get(&key) {
            return Err(fault.clone());
        }

        let elapsed = self.clock.elapsed();
        let pool = match scope {
            Some(handle) => &handle.element.children,
            None => &self.roots,
        };
        let found: Vec<MockHandle> = pool
            .iter()
            .filter(|element| element.matches(&key, query.text, elapsed))
            .map(|element| MockHandle {
                element: Arc::clone(element),
                clock: self.clock,
            })
            .collect();

        if found.is_empty() && self.misses_as_errors {
            return Err(LocateError::not_found(format!("no node matches {key}")));
        }
        Ok(found)
    }
}
