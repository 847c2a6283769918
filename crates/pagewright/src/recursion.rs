//! Recursion Checker
//!
//! Depth-first verification of a page-object tree against the driver.
//!
//! ## Toyota Way Application
//!
//! - **Genchi Genbutsu**: Every node is checked against the live page, never cached
//! - **Jidoka**: Driver faults stop the walk; missing nodes are recorded and the walk goes on
//!
//! ```text
//! Home ─┬─ title          element   ──► ElementChecker ──► Driver
//!       ├─ form           section   ──► ElementChecker ──► Driver
//!       │    └─ submit    element       (scoped to the located #form)
//!       └─ spinner        invisible ──► must be absent
//! ```
//!
//! One [`Deadline`] is created per verification and shared by every check in
//! the tree, so the whole walk is bounded by a single timeout. A section that
//! is not located at all short-circuits its subtree: nested nodes are reported
//! without querying the driver.

use crate::checker::{ElementChecker, Expectation, Wait};
use crate::config::Config;
use crate::driver::Driver;
use crate::outcome::{CheckOutcome, CheckStatus, VerificationReport};
use crate::path::VisitPath;
use crate::result::PageResult;
use crate::schema::{Node, NodeKind, PageSchema, SchemaId, Schemas};
use crate::timer::Deadline;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Which nodes take part in a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Expected and invisible nodes (load verification)
    #[default]
    Expected,
    /// Every declared node
    All,
}

impl Selection {
    /// Whether `node` is checked under this selection
    #[must_use]
    pub const fn includes(self, node: &Node) -> bool {
        match self {
            Self::Expected => node.is_expected() || node.is_invisible(),
            Self::All => true,
        }
    }
}

/// How far below the root the walk descends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionDepth {
    /// Root nodes only; sections are checked but not entered
    None,
    /// Enter sections declared on the root, not deeper
    One,
    /// Enter every section (cycles are cut)
    #[default]
    Full,
}

impl RecursionDepth {
    /// Whether a section found at `level` (root nodes are level 0) is entered
    #[must_use]
    pub const fn descends_from(self, level: usize) -> bool {
        match self {
            Self::None => false,
            Self::One => level == 0,
            Self::Full => true,
        }
    }
}

/// Walks a schema tree and checks every participating node
#[derive(Debug)]
pub struct RecursionChecker<'a, D: Driver> {
    checker: ElementChecker<'a, D>,
    schemas: &'a Schemas,
    selection: Selection,
    depth: RecursionDepth,
}

impl<'a, D: Driver> RecursionChecker<'a, D> {
    /// Full-depth checker of expected nodes
    #[must_use]
    pub const fn new(driver: &'a D, config: &'a Config, schemas: &'a Schemas) -> Self {
        Self {
            checker: ElementChecker::new(driver, config),
            schemas,
            selection: Selection::Expected,
            depth: RecursionDepth::Full,
        }
    }

    /// Choose which nodes are checked
    #[must_use]
    pub const fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Limit descent
    #[must_use]
    pub const fn with_depth(mut self, depth: RecursionDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Verify the tree rooted at `root` within one shared `timeout`
    ///
    /// Missing or unexpected nodes are recorded in the report, not returned
    /// as errors.
    ///
    /// # Errors
    ///
    /// [`PageError::Driver`](crate::PageError::Driver) for non-transient driver
    /// faults, [`PageError::Configuration`](crate::PageError::Configuration)
    /// for an unknown root.
    pub fn verify(&self, root: SchemaId, timeout: Duration) -> PageResult<VerificationReport> {
        let schema = self.schemas.schema(root)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("verify", %run_id, page = schema.name());
        let _guard = span.enter();

        info!(
            timeout_ms = timeout.as_millis() as u64,
            selection = ?self.selection,
            depth = ?self.depth,
            "verification started"
        );
        let deadline = Deadline::after(timeout);
        let mut path = VisitPath::new(schema.name());
        let outcomes = self.walk(schema, None, &mut path, &deadline, 0)?;

        let report = VerificationReport {
            run_id,
            page: schema.name().to_string(),
            timeout,
            elapsed: deadline.elapsed(),
            outcomes,
            validation_failures: Vec::new(),
        };
        info!(
            passed = report.passed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "verification finished"
        );
        Ok(report)
    }

    /// Whether every participating node resolved per its polarity
    pub fn all_present(&self, root: SchemaId, timeout: Duration) -> PageResult<bool> {
        self.verify(root, timeout).map(|report| report.passed())
    }

    fn walk(
        &self,
        schema: &PageSchema,
        scope: Option<&D::Handle>,
        path: &mut VisitPath,
        deadline: &Deadline,
        level: usize,
    ) -> PageResult<Vec<CheckOutcome>> {
        let mut outcomes = Vec::new();
        for node in schema.nodes() {
            if !self.selection.includes(node) {
                continue;
            }
            if node.kind().is_container() && path.contains(schema.id(), node.name()) {
                outcomes.push(self.cycle(schema, node, path));
                continue;
            }

            path.push(schema.id(), node.name());
            let outcome = self.visit(node, scope, path, deadline, level);
            let _ = path.pop();
            outcomes.push(outcome?);
        }
        Ok(outcomes)
    }

    fn visit(
        &self,
        node: &Node,
        scope: Option<&D::Handle>,
        path: &mut VisitPath,
        deadline: &Deadline,
        level: usize,
    ) -> PageResult<CheckOutcome> {
        let expectation = node.expectation();
        let probe = self
            .checker
            .probe(scope, node.spec(), expectation, Wait::Until(*deadline))?;
        let status = CheckStatus::resolve(expectation, probe.satisfied);
        debug!(%path, %status, count = probe.handles.len(), "node checked");

        let mut outcome = CheckOutcome {
            name: node.name().to_string(),
            kind: node.kind(),
            path: path.clone(),
            status,
            count: Some(probe.handles.len()),
            children: Vec::new(),
        };

        let Some(nested) = node.nested() else {
            return Ok(outcome);
        };
        if expectation == Expectation::Absent || !self.depth.descends_from(level) {
            return Ok(outcome);
        }
        let nested = self.schemas.schema(nested)?;

        if probe.handles.is_empty() {
            if !probe.satisfied {
                debug!(%path, "section unresolved, nested nodes not queried");
                outcome.children = self.unreached(nested, path, level + 1);
            }
            return Ok(outcome);
        }

        match node.kind() {
            NodeKind::Sections => {
                for (index, handle) in probe.handles.iter().enumerate() {
                    path.set_index(Some(index));
                    let children = self.walk(nested, Some(handle), path, deadline, level + 1);
                    let instance = path.clone();
                    path.set_index(None);
                    outcome.children.push(CheckOutcome {
                        name: format!("{}[{index}]", node.name()),
                        kind: NodeKind::Section,
                        path: instance,
                        status: CheckStatus::Present,
                        count: None,
                        children: children?,
                    });
                }
            }
            NodeKind::IFrame => {
                let frame = self.checker.enter_frame(node.spec(), &probe.handles[0])?;
                outcome.children = self.walk(nested, Some(&frame), path, deadline, level + 1)?;
            }
            _ => {
                outcome.children = self.walk(nested, Some(&probe.handles[0]), path, deadline, level + 1)?;
            }
        }
        Ok(outcome)
    }

    /// Outcomes for the subtree of a section that did not resolve
    fn unreached(&self, schema: &PageSchema, path: &mut VisitPath, level: usize) -> Vec<CheckOutcome> {
        let mut outcomes = Vec::new();
        for node in schema.nodes() {
            if !self.selection.includes(node) {
                continue;
            }
            if node.kind().is_container() && path.contains(schema.id(), node.name()) {
                outcomes.push(self.cycle(schema, node, path));
                continue;
            }

            path.push(schema.id(), node.name());
            let status = if node.is_invisible() {
                CheckStatus::Absent
            } else {
                CheckStatus::UnexpectedAbsence
            };
            let children = match node.nested().and_then(|id| self.schemas.get(id)) {
                Some(nested) if !node.is_invisible() && self.depth.descends_from(level) => {
                    self.unreached(nested, path, level + 1)
                }
                _ => Vec::new(),
            };
            outcomes.push(CheckOutcome {
                name: node.name().to_string(),
                kind: node.kind(),
                path: path.clone(),
                status,
                count: None,
                children,
            });
            let _ = path.pop();
        }
        outcomes
    }

    fn cycle(&self, schema: &PageSchema, node: &Node, path: &VisitPath) -> CheckOutcome {
        let mut at = path.clone();
        at.push(schema.id(), node.name());
        warn!(path = %at, "cyclic section reference, not descending");
        CheckOutcome {
            name: node.name().to_string(),
            kind: node.kind(),
            path: at,
            status: CheckStatus::CyclicReference,
            count: None,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::LocateError;
    use crate::mock::{MockDriver, MockElement};
    use crate::result::PageError;
    use crate::schema::{SchemaBuilder, SchemaRegistry};
    use crate::selector::SelectorSpec;

    fn config() -> Config {
        Config::new().with_poll_interval(Duration::from_millis(10))
    }

    fn login_page() -> (Schemas, SchemaId) {
        let mut registry = SchemaRegistry::new();
        let form = registry
            .register(
                "LoginForm",
                SchemaBuilder::new()
                    .element("user", "#user")
                    .element("submit", "#submit")
                    .expected(["user", "submit"]),
            )
            .unwrap();
        let home = registry
            .register(
                "Home",
                SchemaBuilder::new()
                    .element("title", ".title")
                    .section("form", form, "#form")
                    .element("footer", "footer")
                    .element("spinner", ".spinner")
                    .expected(["title", "form"])
                    .invisible(["spinner"]),
            )
            .unwrap();
        (registry.freeze().unwrap(), home)
    }

    fn full_login_driver() -> MockDriver {
        MockDriver::new()
            .with_element(MockElement::new(".title"))
            .with_element(
                MockElement::new("#form")
                    .with_child(MockElement::new("#user"))
                    .with_child(MockElement::new("#submit")),
            )
    }

    mod walk_tests {
        use super::*;

        #[test]
        fn test_loaded_page_passes() {
            let (schemas, home) = login_page();
            let driver = full_login_driver();
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(home, Duration::from_secs(1))
                .unwrap();

            assert!(report.passed(), "{}", report.render_tree());
            let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
            assert_eq!(names, ["title", "form", "spinner"]);
            assert_eq!(report.outcomes[1].children.len(), 2);
            assert_eq!(report.outcomes[2].status, CheckStatus::Absent);
        }

        #[test]
        fn test_non_expected_nodes_are_skipped() {
            let (schemas, home) = login_page();
            let driver = full_login_driver();
            let config = config();
            let _ = RecursionChecker::new(&driver, &config, &schemas)
                .verify(home, Duration::ZERO)
                .unwrap();
            assert_eq!(driver.query_count("footer"), 0);
        }

        #[test]
        fn test_selection_all_checks_every_node() {
            let (schemas, home) = login_page();
            let driver = full_login_driver();
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .with_selection(Selection::All)
                .verify(home, Duration::ZERO)
                .unwrap();
            assert_eq!(driver.query_count("footer"), 1);
            assert_eq!(report.missing(), ["Home > footer"]);
        }

        #[test]
        fn test_empty_schema_passes() {
            let mut registry = SchemaRegistry::new();
            let blank = registry.register("Blank", SchemaBuilder::new()).unwrap();
            let schemas = registry.freeze().unwrap();
            let driver = MockDriver::new();
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(blank, Duration::ZERO)
                .unwrap();
            assert!(report.passed());
            assert!(report.outcomes.is_empty());
            assert!(driver.queries().is_empty());
        }

        #[test]
        fn test_siblings_evaluated_after_failure() {
            let (schemas, home) = login_page();
            let driver = MockDriver::new().with_element(
                MockElement::new("#form")
                    .with_child(MockElement::new("#user"))
                    .with_child(MockElement::new("#submit")),
            );
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(home, Duration::ZERO)
                .unwrap();
            assert_eq!(report.missing(), ["Home > title"]);
            assert_eq!(driver.query_count("#submit"), 1);
        }

        #[test]
        fn test_driver_fault_aborts_walk() {
            let (schemas, home) = login_page();
            let driver = full_login_driver().with_fault("#user", LocateError::disconnected("gone"));
            let config = config();
            let err = RecursionChecker::new(&driver, &config, &schemas)
                .verify(home, Duration::from_secs(1))
                .unwrap_err();
            assert!(matches!(err, PageError::Driver { ref selector, .. } if selector == "#user"));
            assert_eq!(driver.query_count(".spinner"), 0);
        }
    }

    mod short_circuit_tests {
        use super::*;

        #[test]
        fn test_absent_section_skips_nested_queries() {
            let (schemas, home) = login_page();
            let driver = MockDriver::new().with_element(MockElement::new(".title"));
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(home, Duration::ZERO)
                .unwrap();

            let form = &report.outcomes[1];
            assert_eq!(form.status, CheckStatus::UnexpectedAbsence);
            assert_eq!(form.children.len(), 2);
            assert!(form
                .children
                .iter()
                .all(|child| child.status == CheckStatus::UnexpectedAbsence && child.count.is_none()));
            assert_eq!(form.children[1].path.to_string(), "Home > form > submit");
            assert_eq!(driver.query_count("#user"), 0);
            assert_eq!(driver.query_count("#submit"), 0);
        }
    }

    mod cycle_tests {
        use super::*;

        #[test]
        fn test_self_referential_section() {
            let mut registry = SchemaRegistry::new();
            let node = registry.declare("TreeNode").unwrap();
            registry
                .define(
                    node,
                    SchemaBuilder::new()
                        .element("label", ".label")
                        .section("child", node, ".child")
                        .expected(["label", "child"]),
                )
                .unwrap();
            let schemas = registry.freeze().unwrap();

            let driver = MockDriver::new().with_element(MockElement::new(".label")).with_element(
                MockElement::new(".child")
                    .with_child(MockElement::new(".label"))
                    .with_child(MockElement::new(".child")),
            );
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(node, Duration::from_secs(1))
                .unwrap();

            assert!(report.passed(), "{}", report.render_tree());
            let cycles = report.cycles();
            assert_eq!(cycles.len(), 1);
            assert_eq!(cycles[0].path.to_string(), "TreeNode > child > child");
            assert_eq!(driver.query_count(".child"), 1);
        }

        #[test]
        fn test_depth_none_does_not_enter_sections() {
            let (schemas, home) = login_page();
            let driver = full_login_driver();
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .with_depth(RecursionDepth::None)
                .verify(home, Duration::ZERO)
                .unwrap();
            assert!(report.outcomes[1].children.is_empty());
            assert_eq!(driver.query_count("#user"), 0);
        }

        #[test]
        fn test_depth_one_stops_below_root_sections() {
            assert!(RecursionDepth::One.descends_from(0));
            assert!(!RecursionDepth::One.descends_from(1));
            assert!(RecursionDepth::Full.descends_from(9));
            assert!(!RecursionDepth::None.descends_from(0));
        }
    }

    mod collection_tests {
        use super::*;

        #[test]
        fn test_sections_recurse_per_instance() {
            let mut registry = SchemaRegistry::new();
            let row = registry
                .register(
                    "Row",
                    SchemaBuilder::new().element("price", ".price").expected(["price"]),
                )
                .unwrap();
            let cart = registry
                .register(
                    "Cart",
                    SchemaBuilder::new()
                        .sections("rows", row, SelectorSpec::builder(".row").exact(2))
                        .expected(["rows"]),
                )
                .unwrap();
            let schemas = registry.freeze().unwrap();

            let driver = MockDriver::new()
                .with_element(MockElement::new(".row").with_child(MockElement::new(".price")))
                .with_element(MockElement::new(".row"));
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(cart, Duration::ZERO)
                .unwrap();

            let rows = &report.outcomes[0];
            assert_eq!(rows.status, CheckStatus::Present);
            assert_eq!(rows.count, Some(2));
            assert_eq!(rows.children[0].name, "rows[0]");
            assert_eq!(rows.children[1].name, "rows[1]");
            assert_eq!(report.missing(), ["Cart > rows[1] > price"]);
        }

        fn cart(rows: SelectorSpec) -> (Schemas, SchemaId) {
            let mut registry = SchemaRegistry::new();
            let row = registry
                .register(
                    "Row",
                    SchemaBuilder::new().element("price", ".price").expected(["price"]),
                )
                .unwrap();
            let cart = registry
                .register(
                    "Cart",
                    SchemaBuilder::new().sections("rows", row, rows).expected(["rows"]),
                )
                .unwrap();
            (registry.freeze().unwrap(), cart)
        }

        #[test]
        fn test_empty_collection_allowed_by_count_passes() {
            let (schemas, cart) = cart(SelectorSpec::builder(".row").maximum(3).build().unwrap());
            let driver = MockDriver::new();
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(cart, Duration::ZERO)
                .unwrap();

            let rows = &report.outcomes[0];
            assert_eq!(rows.status, CheckStatus::Present);
            assert_eq!(rows.count, Some(0));
            assert!(rows.children.is_empty());
            assert!(report.passed(), "{}", report.render_tree());
            assert_eq!(driver.query_count(".price"), 0);
        }

        #[test]
        fn test_wrong_count_still_checks_located_instances() {
            let (schemas, cart) = cart(SelectorSpec::builder(".row").exact(1).build().unwrap());
            let driver = MockDriver::new()
                .with_element(MockElement::new(".row").with_child(MockElement::new(".price")))
                .with_element(MockElement::new(".row").with_child(MockElement::new(".price")));
            let config = config();
            let report = RecursionChecker::new(&driver, &config, &schemas)
                .verify(cart, Duration::ZERO)
                .unwrap();

            let rows = &report.outcomes[0];
            assert_eq!(rows.status, CheckStatus::UnexpectedAbsence);
            assert_eq!(rows.count, Some(2));
            assert_eq!(rows.children.len(), 2);
            assert_eq!(report.missing(), ["Cart > rows"]);
            assert_eq!(
                report.present(),
                ["Cart > rows[0]", "Cart > rows[0] > price", "Cart > rows[1]", "Cart > rows[1] > price"]
            );
            assert_eq!(driver.query_count(".price"), 2);
        }
    }
}
