//! Page objects
//!
//! A [`Page`] binds a frozen schema set, the root schema of one page class,
//! a driver and a configuration. It owns the page's [`LoadStatus`]; schemas
//! and configuration are shared.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut page = Page::new(&driver, schemas, home, config)?
//!     .with_load_validation("cart badge shows a number", |page| {
//!         page.check_present("badge", Wait::Immediate)
//!     });
//!
//! page.verify_loaded(Some(Duration::from_secs(1)))?;
//! assert!(page.is_loaded());
//! ```

use crate::checker::{ElementChecker, Expectation, Wait};
use crate::config::Config;
use crate::driver::Driver;
use crate::loadable::{LoadState, LoadStatus, LoadValidation};
use crate::outcome::VerificationReport;
use crate::recursion::{RecursionChecker, RecursionDepth, Selection};
use crate::result::{PageError, PageResult};
use crate::schema::{Node, PageSchema, SchemaId, Schemas};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A page-object instance
pub struct Page<D: Driver> {
    driver: D,
    schemas: Schemas,
    root: SchemaId,
    config: Arc<Config>,
    status: LoadStatus,
    validations: Vec<LoadValidation<Page<D>>>,
    depth: RecursionDepth,
}

impl<D: Driver> Page<D> {
    /// Bind `root` of `schemas` to `driver`
    ///
    /// # Errors
    ///
    /// [`PageError::Configuration`] if `root` is not part of `schemas`.
    pub fn new(
        driver: D,
        schemas: Schemas,
        root: SchemaId,
        config: impl Into<Arc<Config>>,
    ) -> PageResult<Self> {
        let _ = schemas.schema(root)?;
        Ok(Self {
            driver,
            schemas,
            root,
            config: config.into(),
            status: LoadStatus::default(),
            validations: Vec::new(),
            depth: RecursionDepth::Full,
        })
    }

    /// Add a predicate that must hold for the page to count as loaded
    #[must_use]
    pub fn with_load_validation<F>(mut self, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Self) -> PageResult<bool> + Send + Sync + 'static,
    {
        self.validations.push(LoadValidation::new(message, check));
        self
    }

    /// Limit how deep verification descends
    #[must_use]
    pub const fn with_recursion(mut self, depth: RecursionDepth) -> Self {
        self.depth = depth;
        self
    }

    /// The driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared schema set
    pub const fn schemas(&self) -> &Schemas {
        &self.schemas
    }

    /// The page's own schema
    pub fn schema(&self) -> PageResult<&PageSchema> {
        self.schemas.schema(self.root)
    }

    /// Root schema id
    pub const fn root(&self) -> SchemaId {
        self.root
    }

    /// Top-level node by name
    ///
    /// # Errors
    ///
    /// [`PageError::Configuration`] for an undeclared name.
    pub fn node(&self, name: &str) -> PageResult<&Node> {
        let schema = self.schema()?;
        schema.node(name).ok_or_else(|| {
            PageError::configuration(format!("page `{}` declares no node `{name}`", schema.name()))
        })
    }

    fn checker(&self) -> ElementChecker<'_, D> {
        ElementChecker::new(&self.driver, &self.config)
    }

    fn recursion(&self, selection: Selection) -> RecursionChecker<'_, D> {
        RecursionChecker::new(&self.driver, &self.config, &self.schemas)
            .with_selection(selection)
            .with_depth(self.depth)
    }

    fn check(&self, name: &str, expectation: Expectation, wait: Wait) -> PageResult<bool> {
        let node = self.node(name)?;
        self.checker().check(None, node.spec(), expectation, wait)
    }

    /// Whether the named top-level node is present (count constraint satisfied)
    pub fn check_present(&self, name: &str, wait: impl Into<Wait>) -> PageResult<bool> {
        self.check(name, Expectation::Present, wait.into())
    }

    /// Whether the named top-level node is absent
    pub fn check_absent(&self, name: &str, wait: impl Into<Wait>) -> PageResult<bool> {
        self.check(name, Expectation::Absent, wait.into())
    }

    /// Number of nodes currently matching the named node
    pub fn count(&self, name: &str) -> PageResult<usize> {
        let node = self.node(name)?;
        self.checker().count(None, node.spec())
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.default_timeout)
    }

    /// Verify the tree without touching the load state
    pub fn report(&self, selection: Selection, timeout: Option<Duration>) -> PageResult<VerificationReport> {
        self.recursion(selection)
            .verify(self.root, self.timeout_or_default(timeout))
    }

    /// Whether every expected node is present and every invisible node absent
    pub fn all_expected_present(&self, timeout: Option<Duration>) -> PageResult<bool> {
        self.report(Selection::Expected, timeout)
            .map(|report| report.passed())
    }

    /// Like [`all_expected_present`](Self::all_expected_present) over every declared node
    pub fn all_present(&self, timeout: Option<Duration>) -> PageResult<bool> {
        self.report(Selection::All, timeout)
            .map(|report| report.passed())
    }

    /// Paths of expected nodes that were not found
    pub fn missing_expected(&self, timeout: Option<Duration>) -> PageResult<Vec<String>> {
        self.report(Selection::Expected, timeout)
            .map(|report| report.missing())
    }

    /// Paths of expected nodes that were found
    pub fn present_expected(&self, timeout: Option<Duration>) -> PageResult<Vec<String>> {
        self.report(Selection::Expected, timeout)
            .map(|report| report.present())
    }

    /// Verify the page and record the result in its load state
    ///
    /// Load validations run only when the tree check passes.
    ///
    /// # Errors
    ///
    /// [`PageError::LoadVerificationFailed`] with the full report when a node
    /// or validation fails. Driver and configuration errors are returned as
    /// they are and leave the load state untouched.
    pub fn verify_loaded(&mut self, timeout: Option<Duration>) -> PageResult<()> {
        let mut report = self.report(Selection::Expected, timeout)?;

        if report.passed() {
            for validation in &self.validations {
                match validation.check(self) {
                    Ok(true) => {}
                    Ok(false) => report.validation_failures.push(validation.message().to_string()),
                    Err(err) if err.is_transient() => {
                        report.validation_failures.push(format!("{}: {err}", validation.message()));
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let passed = report.passed();
        self.status.begin();
        let _ = self.status.finish(passed);
        if passed {
            info!(page = %report.page, run_id = %report.run_id, "page loaded");
            Ok(())
        } else {
            warn!(page = %report.page, run_id = %report.run_id, "{report}");
            Err(PageError::LoadVerificationFailed {
                report: Box::new(report),
            })
        }
    }

    /// `true` iff the last verification passed or the page was marked loaded
    pub fn is_loaded(&self) -> bool {
        self.status.is_loaded()
    }

    /// Current load state
    pub const fn load_state(&self) -> LoadState {
        self.status.state()
    }

    /// Load state with its timestamp
    pub const fn load_status(&self) -> LoadStatus {
        self.status
    }

    /// Declare the page loaded without verifying it
    pub fn mark_loaded(&mut self) {
        self.status.begin();
        let _ = self.status.finish(true);
    }

    /// Back to `Unknown`, e.g. after navigation
    pub fn reset(&mut self) {
        self.status.reset();
    }

    /// Verify the page, then run `action` on it
    ///
    /// # Errors
    ///
    /// Whatever [`verify_loaded`](Self::verify_loaded) returns; `action` does
    /// not run in that case.
    pub fn when_loaded<R, F>(&mut self, timeout: Option<Duration>, action: F) -> PageResult<R>
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.verify_loaded(timeout)?;
        Ok(action(self))
    }
}

impl<D: Driver> fmt::Debug for Page<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("root", &self.root)
            .field("status", &self.status)
            .field("depth", &self.depth)
            .field("validations", &self.validations.len())
            .finish_non_exhaustive()
    }
}
