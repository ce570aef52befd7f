//! Identity assignment.
//!
//! Walks a tree and asks an [`IdProvider`] for one identifier per visited node.
//! The result is a transient [`IdentityMap`]; the tree is never modified.

use hashbrown::HashMap;
use tracing::debug;

use crate::model::{NodeId, Tree};
use crate::walk::check_containment;
use crate::{Error, Result};

/// Namespace used by [`StructuralIdProvider`] when none is configured.
pub const DEFAULT_NAMESPACE: &str = "UNKNOWN_SOURCE";

// ============================================================================
// Id providers
// ============================================================================

/// Strategy assigning external identifiers. Returning `None` skips the node.
pub trait IdProvider {
    fn id_for(&mut self, tree: &Tree, node: NodeId) -> Option<String>;
}

/// Closures are providers: `|_, _| Some(format!("custom_{n}"))`.
impl<F> IdProvider for F
where
    F: FnMut(&Tree, NodeId) -> Option<String>,
{
    fn id_for(&mut self, tree: &Tree, node: NodeId) -> Option<String> {
        self(tree, node)
    }
}

/// Integers-as-strings from a provider-local counter, one per visited node.
#[derive(Debug, Clone, Default)]
pub struct SequentialIdProvider {
    next: u64,
}

impl SequentialIdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdProvider for SequentialIdProvider {
    fn id_for(&mut self, _tree: &Tree, _node: NodeId) -> Option<String> {
        let id = self.next;
        self.next += 1;
        Some(id.to_string())
    }
}

/// Namespace-qualified ids derived from the containment path:
/// `{namespace}-root`, `{namespace}-root_body_2_condition`, ...
///
/// Stable across runs and independent of traversal order. Segments are joined
/// with `_`; inside a property name every character other than an ASCII
/// letter (or a digit past the first position) is written as `-{hex}-`, so a
/// segment never contains `_` and only list indices start with a digit. Two
/// distinct nodes therefore never share a path.
#[derive(Debug, Clone)]
pub struct StructuralIdProvider {
    namespace: String,
}

impl StructuralIdProvider {
    pub fn new(namespace: impl AsRef<str>) -> Self {
        Self { namespace: sanitize(namespace.as_ref()) }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn structural_path(tree: &Tree, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = node;
        for ancestor in tree.ancestors(node) {
            match tree.containing_property(current) {
                Some((name, Some(i))) => segments.push(format!("{}_{i}", encode_segment(name))),
                Some((name, None)) => segments.push(encode_segment(name)),
                None => break,
            }
            current = ancestor;
        }
        segments.push("root".to_string());
        segments.reverse();
        segments.join("_")
    }
}

impl Default for StructuralIdProvider {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl IdProvider for StructuralIdProvider {
    fn id_for(&mut self, tree: &Tree, node: NodeId) -> Option<String> {
        tree.get(node)?;
        Some(format!("{}-{}", self.namespace, Self::structural_path(tree, node)))
    }
}

/// Property name as a path segment: `a_b` becomes `a-5f-b`, `2nd` becomes `-32-nd`.
fn encode_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()) {
            out.push(c);
        } else {
            out.push_str(&format!("-{:x}-", u32::from(c)));
        }
    }
    out
}

/// Ids may only carry `[A-Za-z0-9_-]`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

// ============================================================================
// IdentityMap
// ============================================================================

/// Injective node → id mapping, remembering assignment order.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    ids: HashMap<NodeId, String>,
    nodes: HashMap<String, NodeId>,
    order: Vec<NodeId>,
}

impl IdentityMap {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&str> {
        self.ids.get(&node).map(String::as_str)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.ids.contains_key(&node)
    }

    /// Reverse lookup.
    pub fn node(&self, id: &str) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Entries in the order they were assigned.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.order.iter().filter_map(|n| self.ids.get(n).map(|id| (*n, id.as_str())))
    }

    fn insert(&mut self, tree: &Tree, node: NodeId, id: String) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateId { id, node: tree.describe(node) });
        }
        self.nodes.insert(id.clone(), node);
        self.ids.insert(node, id);
        self.order.push(node);
        Ok(())
    }
}

// ============================================================================
// compute_ids
// ============================================================================

/// Assign ids to every node `walker` yields from `root`, in walk order.
///
/// Each node gets at most one id. A fresh deterministic provider over an
/// unchanged tree and the same walker always yields the same map.
pub fn compute_ids<'t, W, I, P>(tree: &'t Tree, root: NodeId, walker: W, provider: &mut P) -> Result<IdentityMap>
where
    W: FnOnce(&'t Tree, NodeId) -> I,
    I: Iterator<Item = NodeId>,
    P: IdProvider + ?Sized,
{
    check_containment(tree, root)?;
    let mut map = IdentityMap::default();
    let mut skipped = 0usize;
    for node in walker(tree, root) {
        if map.contains(node) {
            continue;
        }
        match provider.id_for(tree, node) {
            Some(id) => map.insert(tree, node, id)?,
            None => skipped += 1,
        }
    }
    debug!(root = %root, assigned = map.len(), skipped, "computed ids");
    Ok(map)
}
