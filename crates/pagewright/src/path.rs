//! Visit paths: where a check happened in the page-object tree.

use crate::schema::SchemaId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One descent step: a node of a schema, optionally one instance of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    /// Schema declaring the node
    pub schema: SchemaId,
    /// Node name
    pub node: String,
    /// Instance index within a section collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl PathSegment {
    /// Segment for `node` of `schema`
    #[must_use]
    pub fn new(schema: SchemaId, node: impl Into<String>) -> Self {
        Self {
            schema,
            node: node.into(),
            index: None,
        }
    }

    /// Whether this segment names the `(schema, node)` pair
    #[must_use]
    pub fn is(&self, schema: SchemaId, node: &str) -> bool {
        self.schema == schema && self.node == node
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.node),
            None => f.write_str(&self.node),
        }
    }
}

/// The current descent from a root page, e.g. `Home > form > rows[1] > submit`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitPath {
    root: String,
    segments: Vec<PathSegment>,
}

impl VisitPath {
    /// Empty path starting at the page named `root`
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: Vec::new(),
        }
    }

    /// Root page name
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Segments below the root
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Whether `(schema, node)` is already on the path; instance indices are ignored
    #[must_use]
    pub fn contains(&self, schema: SchemaId, node: &str) -> bool {
        self.segments.iter().any(|segment| segment.is(schema, node))
    }

    /// Descend into `node` of `schema`
    pub fn push(&mut self, schema: SchemaId, node: impl Into<String>) {
        self.segments.push(PathSegment::new(schema, node));
    }

    /// Ascend one level
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// Point the last segment at one instance of a collection
    pub fn set_index(&mut self, index: Option<usize>) {
        if let Some(last) = self.segments.last_mut() {
            last.index = index;
        }
    }
}

impl fmt::Display for VisitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            write!(f, " > {segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{SchemaBuilder, SchemaRegistry};

    fn ids() -> (SchemaId, SchemaId) {
        let mut registry = SchemaRegistry::new();
        let home = registry.register("Home", SchemaBuilder::new()).unwrap();
        let form = registry.register("Form", SchemaBuilder::new()).unwrap();
        (home, form)
    }

    #[test]
    fn test_display() {
        let (home, form) = ids();
        let mut path = VisitPath::new("Home");
        assert_eq!(path.to_string(), "Home");

        path.push(home, "form");
        path.push(form, "rows");
        path.set_index(Some(1));
        path.push(form, "submit");
        assert_eq!(path.to_string(), "Home > form > rows[1] > submit");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_contains_ignores_index() {
        let (home, form) = ids();
        let mut path = VisitPath::new("Home");
        path.push(home, "rows");
        path.set_index(Some(4));

        assert!(path.contains(home, "rows"));
        assert!(!path.contains(form, "rows"));
        assert!(!path.contains(home, "title"));
    }

    #[test]
    fn test_pop_restores_parent() {
        let (home, form) = ids();
        let mut path = VisitPath::new("Home");
        path.push(home, "form");
        path.push(form, "submit");

        let popped = path.pop().unwrap();
        assert!(popped.is(form, "submit"));
        assert_eq!(path.to_string(), "Home > form");
        assert!(!path.contains(form, "submit"));
    }

    #[test]
    fn test_serializes_without_empty_index() {
        let (home, _) = ids();
        let mut path = VisitPath::new("Home");
        path.push(home, "title");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"{"root":"Home","segments":[{"schema":0,"node":"title"}]}"#);
    }
}
