//! Structural comparison of two trees.
//!
//! The expected tree's property set is authoritative: every public property
//! declared on an expected node is looked up on the actual node; properties
//! that exist only on the actual side are never checked. The first divergence
//! aborts the comparison and is reported with a path such as
//! `<root>.body[2].condition`.

use tracing::debug;

use crate::model::{NamedReference, NodeId, ParsingResult, Property, Slot, Tree};
use crate::{Error, Result};

const ROOT_CONTEXT: &str = "<root>";

/// Strictness knobs for [`assert_asts_equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffOptions {
    /// Also compare source positions.
    pub consider_position: bool,
    /// Compare attributes by their string rendering instead of by value.
    pub lightweight_attribute_equality: bool,
}

impl DiffOptions {
    pub fn considering_position(mut self) -> Self {
        self.consider_position = true;
        self
    }

    pub fn lightweight(mut self) -> Self {
        self.lightweight_attribute_equality = true;
        self
    }
}

/// Compare `expected` (rooted at `expected_root`) against `actual`.
pub fn assert_asts_equal(
    expected: &Tree,
    expected_root: NodeId,
    actual: &Tree,
    actual_root: NodeId,
    options: DiffOptions,
) -> Result<()> {
    let differ = Differ { expected, actual, options };
    differ.compare(expected_root, actual_root, ROOT_CONTEXT).inspect_err(|e| {
        debug!(error = %e, "trees differ");
    })
}

/// Require an issue-free result, then compare its root against `expected`.
pub fn assert_ast_matches_result(
    expected: &Tree,
    expected_root: NodeId,
    actual: &ParsingResult,
    options: DiffOptions,
) -> Result<()> {
    if !actual.issues.is_empty() {
        return Err(Error::StructuralMismatch {
            path: format!("{ROOT_CONTEXT}.issues"),
            expected: "no issues".to_string(),
            actual: format!("{:?}", actual.issues),
        });
    }
    let root = actual.root.ok_or_else(|| Error::StructuralMismatch {
        path: ROOT_CONTEXT.to_string(),
        expected: expected.describe(expected_root),
        actual: "null".to_string(),
    })?;
    assert_asts_equal(expected, expected_root, &actual.tree, root, options)
}

/// Whole-result comparison: same issues, same root presence, equal trees.
pub fn assert_parsing_results_equal(expected: &ParsingResult, actual: &ParsingResult) -> Result<()> {
    if expected.issues != actual.issues {
        return Err(Error::StructuralMismatch {
            path: format!("{ROOT_CONTEXT}.issues"),
            expected: format!("{:?}", expected.issues),
            actual: format!("{:?}", actual.issues),
        });
    }
    match (expected.root, actual.root) {
        (None, None) => Ok(()),
        (Some(e), Some(a)) => assert_asts_equal(&expected.tree, e, &actual.tree, a, DiffOptions::default()),
        (e, a) => Err(Error::StructuralMismatch {
            path: ROOT_CONTEXT.to_string(),
            expected: presence(e),
            actual: presence(a),
        }),
    }
}

fn presence(root: Option<NodeId>) -> String {
    match root {
        Some(_) => "a root node".to_string(),
        None => "null".to_string(),
    }
}

// ============================================================================
// Differ
// ============================================================================

struct Differ<'a> {
    expected: &'a Tree,
    actual: &'a Tree,
    options: DiffOptions,
}

impl Differ<'_> {
    fn compare(&self, e: NodeId, a: NodeId, context: &str) -> Result<()> {
        let expected_node = self.expected.node(e)?;
        let actual_node = self.actual.node(a)?;
        if expected_node.node_type() != actual_node.node_type() {
            return Err(mismatch(
                context,
                format!("node of type {}", expected_node.node_type()),
                format!("node of type {}", actual_node.node_type()),
            ));
        }
        if self.options.consider_position && expected_node.position() != actual_node.position() {
            return Err(mismatch(
                &format!("{context}.position"),
                render(expected_node.position()),
                render(actual_node.position()),
            ));
        }

        let actual_properties = self.actual.properties(a)?;
        for expected_property in self.expected.properties(e)? {
            let name = expected_property.name();
            let actual_property = actual_properties.iter().find(|p| p.name() == name).ok_or_else(|| {
                Error::MissingProperty { path: context.to_string(), property: name.to_string() }
            })?;
            let path = format!("{context}.{name}");
            self.compare_property(&expected_property, actual_property, &path)?;
        }
        Ok(())
    }

    fn compare_property(&self, expected: &Property<'_>, actual: &Property<'_>, path: &str) -> Result<()> {
        match (expected.slot, actual.slot) {
            (Slot::IgnoredChildren, _) => Ok(()),
            (Slot::Children(e), Slot::Children(a)) => self.compare_children(e.as_deref(), a.as_deref(), path),
            (Slot::Children(_), Slot::IgnoredChildren) => {
                Err(mismatch(path, "a checked collection".to_string(), "an ignored collection".to_string()))
            }
            (Slot::Child(e), Slot::Child(a)) => match (e, a) {
                (None, None) => Ok(()),
                (Some(e), Some(a)) => self.compare(*e, *a, path),
                (e, a) => Err(mismatch(path, self.render_child(self.expected, *e), self.render_child(self.actual, *a))),
            },
            (Slot::Reference(e), Slot::Reference(a)) => self.compare_references(e.as_ref(), a.as_ref(), path),
            (Slot::Attribute(e), Slot::Attribute(a)) => {
                let equal = if self.options.lightweight_attribute_equality {
                    e.to_wire() == a.to_wire()
                } else {
                    e == a
                };
                if equal { Ok(()) } else { Err(mismatch(path, format!("{e:?}"), format!("{a:?}"))) }
            }
            (e, a) => Err(mismatch(path, e.kind().to_string(), a.kind().to_string())),
        }
    }

    fn compare_children(&self, e: Option<&[NodeId]>, a: Option<&[NodeId]>, path: &str) -> Result<()> {
        let (e, a) = match (e, a) {
            (None, None) => return Ok(()),
            (Some(e), Some(a)) => (e, a),
            (e, a) => {
                return Err(mismatch(
                    &format!("{path} nullness"),
                    if e.is_none() { "null" } else { "a collection" }.to_string(),
                    if a.is_none() { "null" } else { "a collection" }.to_string(),
                ));
            }
        };
        if e.len() != a.len() {
            return Err(mismatch(&format!("{path} length"), e.len().to_string(), a.len().to_string()));
        }
        for (i, (e, a)) in e.iter().zip(a.iter()).enumerate() {
            self.compare(*e, *a, &format!("{path}[{i}]"))?;
        }
        Ok(())
    }

    /// Names are compared by value, targets only by their string identity so
    /// reference cycles never recurse.
    fn compare_references(&self, e: Option<&NamedReference>, a: Option<&NamedReference>, path: &str) -> Result<()> {
        let (e, a) = match (e, a) {
            (None, None) => return Ok(()),
            (Some(e), Some(a)) => (e, a),
            (e, a) => {
                return Err(mismatch(
                    path,
                    e.map_or("null".to_string(), |r| format!("reference '{}'", r.name())),
                    a.map_or("null".to_string(), |r| format!("reference '{}'", r.name())),
                ));
            }
        };
        if e.name() != a.name() {
            return Err(mismatch(&format!("{path} name"), e.name().to_string(), a.name().to_string()));
        }
        let e_target = e.referred().map(|t| self.expected.describe(t));
        let a_target = a.referred().map(|t| self.actual.describe(t));
        if e_target != a_target {
            return Err(mismatch(&format!("{path} referred"), render(e_target), render(a_target)));
        }
        Ok(())
    }

    fn render_child(&self, tree: &Tree, child: Option<NodeId>) -> String {
        child.map_or("null".to_string(), |c| tree.describe(c))
    }
}

fn mismatch(path: &str, expected: String, actual: String) -> Error {
    Error::StructuralMismatch { path: path.to_string(), expected, actual }
}

fn render<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or("null".to_string(), |v| v.to_string())
}
