//! Page-Object Schemas
//!
//! A [`PageSchema`] is the ordered, named list of [`Node`]s declared for a
//! page or section class. Schemas are built once through a
//! [`SchemaRegistry`] and then frozen into [`Schemas`], a cheap-to-clone,
//! read-only arena shared by every page instance.
//!
//! Nested schemas are referenced by [`SchemaId`] rather than by pointer, so a
//! section may refer to its own schema (or to an ancestor's) without any
//! reference cycle in memory. Structural cycles are the recursion checker's
//! concern, not the schema's.
//!
//! ```rust,ignore
//! let mut registry = SchemaRegistry::new();
//! let form = registry.register("LoginForm", SchemaBuilder::new()
//!     .element("submit", "#submit")
//!     .expected(["submit"]))?;
//! let home = registry.register("Home", SchemaBuilder::new()
//!     .element("title", ".title")
//!     .section("form", form, "#form")
//!     .expected(["title", "form"]))?;
//! let schemas = registry.freeze()?;
//! ```

use crate::checker::Expectation;
use crate::result::{PageError, PageResult};
use crate::selector::{CountConstraint, SelectorSpec, SelectorSpecBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Index of a schema within [`Schemas`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(usize);

impl SchemaId {
    /// Position in the registry
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// What a node represents on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A single element
    Element,
    /// A collection of elements
    Elements,
    /// A single nested region with its own schema
    Section,
    /// A collection of nested regions sharing one schema
    Sections,
    /// An iframe whose document has its own schema
    IFrame,
}

impl NodeKind {
    /// Whether nodes of this kind carry a nested schema
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Section | Self::Sections | Self::IFrame)
    }

    /// Whether nodes of this kind stand for many located nodes
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Elements | Self::Sections)
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Elements => "elements",
            Self::Section => "section",
            Self::Sections => "sections",
            Self::IFrame => "iframe",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, declared member of a page schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    spec: SelectorSpec,
    nested: Option<SchemaId>,
    expected: bool,
    invisible: bool,
}

impl Node {
    /// Node name, unique within its schema
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kind
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Locator for the node
    #[must_use]
    pub const fn spec(&self) -> &SelectorSpec {
        &self.spec
    }

    /// Schema of a section or iframe
    #[must_use]
    pub const fn nested(&self) -> Option<SchemaId> {
        self.nested
    }

    /// Required for load verification
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.expected
    }

    /// Must NOT be present
    #[must_use]
    pub const fn is_invisible(&self) -> bool {
        self.invisible
    }

    /// Polarity of this node's checks
    #[must_use]
    pub const fn expectation(&self) -> Expectation {
        if self.invisible {
            Expectation::Absent
        } else {
            Expectation::Present
        }
    }
}

/// Ordered, read-only declaration of a page or section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSchema {
    id: SchemaId,
    name: String,
    nodes: Vec<Node>,
}

impl PageSchema {
    /// Start declaring a schema
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Identity within [`Schemas`]
    #[must_use]
    pub const fn id(&self) -> SchemaId {
        self.id
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in declaration order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node by name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Nodes flagged expected, in declaration order
    pub fn expected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.expected)
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct PendingNode {
    name: String,
    kind: NodeKind,
    spec: SelectorSpecBuilder,
    nested: Option<SchemaId>,
}

/// Collects node declarations; validated by [`SchemaRegistry::define`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    nodes: Vec<PendingNode>,
    expected: Vec<String>,
    invisible: Vec<String>,
}

impl SchemaBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        mut self,
        name: impl Into<String>,
        kind: NodeKind,
        spec: impl Into<SelectorSpecBuilder>,
        nested: Option<SchemaId>,
    ) -> Self {
        self.nodes.push(PendingNode {
            name: name.into(),
            kind,
            spec: spec.into(),
            nested,
        });
        self
    }

    /// Declare a single element
    #[must_use]
    pub fn element(self, name: impl Into<String>, spec: impl Into<SelectorSpecBuilder>) -> Self {
        self.push(name, NodeKind::Element, spec, None)
    }

    /// Declare an element collection
    #[must_use]
    pub fn elements(self, name: impl Into<String>, spec: impl Into<SelectorSpecBuilder>) -> Self {
        self.push(name, NodeKind::Elements, spec, None)
    }

    /// Declare a section described by `schema`
    #[must_use]
    pub fn section(
        self,
        name: impl Into<String>,
        schema: SchemaId,
        spec: impl Into<SelectorSpecBuilder>,
    ) -> Self {
        self.push(name, NodeKind::Section, spec, Some(schema))
    }

    /// Declare a section collection described by `schema`
    #[must_use]
    pub fn sections(
        self,
        name: impl Into<String>,
        schema: SchemaId,
        spec: impl Into<SelectorSpecBuilder>,
    ) -> Self {
        self.push(name, NodeKind::Sections, spec, Some(schema))
    }

    /// Declare an iframe whose document is described by `schema`
    #[must_use]
    pub fn iframe(
        self,
        name: impl Into<String>,
        schema: SchemaId,
        spec: impl Into<SelectorSpecBuilder>,
    ) -> Self {
        self.push(name, NodeKind::IFrame, spec, Some(schema))
    }

    /// Flag nodes as required for load verification
    #[must_use]
    pub fn expected<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected.extend(names.into_iter().map(Into::into));
        self
    }

    /// Flag nodes that must not be present
    #[must_use]
    pub fn invisible<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invisible.extend(names.into_iter().map(Into::into));
        self
    }

    fn build(self, id: SchemaId, schema_name: &str, known: usize) -> PageResult<PageSchema> {
        let mut seen = HashSet::new();
        for pending in &self.nodes {
            if !seen.insert(pending.name.as_str()) {
                return Err(PageError::configuration(format!(
                    "schema `{schema_name}` declares `{}` twice",
                    pending.name
                )));
            }
            if let Some(nested) = pending.nested {
                if nested.index() >= known {
                    return Err(PageError::configuration(format!(
                        "node `{}` in schema `{schema_name}` refers to undeclared {nested}",
                        pending.name
                    )));
                }
            }
        }
        for (flag, names) in [("expected", &self.expected), ("invisible", &self.invisible)] {
            if let Some(unknown) = names.iter().find(|name| !seen.contains(name.as_str())) {
                return Err(PageError::configuration(format!(
                    "schema `{schema_name}` flags unknown node `{unknown}` as {flag}"
                )));
            }
        }

        let expected: HashSet<&str> = self.expected.iter().map(String::as_str).collect();
        let invisible: HashSet<&str> = self.invisible.iter().map(String::as_str).collect();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for pending in &self.nodes {
            let spec = pending.spec.clone().build().map_err(|err| match err {
                PageError::Configuration { message } => PageError::configuration(format!(
                    "node `{}` in schema `{schema_name}`: {message}",
                    pending.name
                )),
                other => other,
            })?;
            if !pending.kind.is_collection() && requires_many(spec.count()) {
                return Err(PageError::configuration(format!(
                    "node `{}` in schema `{schema_name}` is a single {} but requires {}",
                    pending.name,
                    pending.kind,
                    spec.count()
                )));
            }
            nodes.push(Node {
                expected: expected.contains(pending.name.as_str()),
                invisible: invisible.contains(pending.name.as_str()),
                name: pending.name.clone(),
                kind: pending.kind,
                spec,
                nested: pending.nested,
            });
        }

        Ok(PageSchema {
            id,
            name: schema_name.to_string(),
            nodes,
        })
    }
}

/// A single-node kind can never locate more than one node
const fn requires_many(count: CountConstraint) -> bool {
    match count {
        CountConstraint::AtLeastOne => false,
        CountConstraint::Exactly(n) => n > 1,
        CountConstraint::Range { min, .. } => matches!(min, Some(n) if n > 1),
    }
}

#[derive(Debug)]
struct Slot {
    name: String,
    schema: Option<PageSchema>,
}

/// Mutable registry used while declaring schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    slots: Vec<Slot>,
}

impl SchemaRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for `name` so that schemas can refer to it before it is defined
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Configuration`] if the name is already declared.
    pub fn declare(&mut self, name: impl Into<String>) -> PageResult<SchemaId> {
        let name = name.into();
        if self.slots.iter().any(|slot| slot.name == name) {
            return Err(PageError::configuration(format!(
                "schema `{name}` is already declared"
            )));
        }
        self.slots.push(Slot { name, schema: None });
        Ok(SchemaId(self.slots.len() - 1))
    }

    /// Validate `builder` and attach it to a declared id
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Configuration`] for an unknown or already defined
    /// id, duplicate node names, flags naming unknown nodes, references to
    /// undeclared schemas, or impossible count constraints.
    pub fn define(&mut self, id: SchemaId, builder: SchemaBuilder) -> PageResult<()> {
        let known = self.slots.len();
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or_else(|| PageError::configuration(format!("{id} was never declared")))?;
        if slot.schema.is_some() {
            return Err(PageError::configuration(format!(
                "schema `{}` is already defined",
                slot.name
            )));
        }
        slot.schema = Some(builder.build(id, &slot.name, known)?);
        Ok(())
    }

    /// Declare and define in one step
    ///
    /// A builder that fails validation leaves the registry as it was.
    pub fn register(&mut self, name: impl Into<String>, builder: SchemaBuilder) -> PageResult<SchemaId> {
        let id = self.declare(name)?;
        if let Err(err) = self.define(id, builder) {
            let _ = self.slots.pop();
            return Err(err);
        }
        Ok(id)
    }

    /// Finish declaring; every declared schema must be defined
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Configuration`] naming the first undefined schema.
    pub fn freeze(self) -> PageResult<Schemas> {
        let schemas = self
            .slots
            .into_iter()
            .map(|slot| {
                slot.schema.ok_or_else(|| {
                    PageError::configuration(format!("schema `{}` was declared but never defined", slot.name))
                })
            })
            .collect::<PageResult<Vec<_>>>()?;
        Ok(Schemas {
            schemas: schemas.into(),
        })
    }
}

/// Frozen, shared schema arena
#[derive(Debug, Clone)]
pub struct Schemas {
    schemas: Arc<[PageSchema]>,
}

impl Schemas {
    /// Schema by id
    #[must_use]
    pub fn get(&self, id: SchemaId) -> Option<&PageSchema> {
        self.schemas.get(id.index())
    }

    /// Schema by id, as a configuration error when missing
    pub fn schema(&self, id: SchemaId) -> PageResult<&PageSchema> {
        self.get(id)
            .ok_or_else(|| PageError::configuration(format!("{id} is not part of this schema set")))
    }

    /// Schema by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PageSchema> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    /// All schemas in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &PageSchema> {
        self.schemas.iter()
    }

    /// Number of schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether there are no schemas
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
