//! Tree walkers.
//!
//! Every walker is a plain iterator built fresh from `(tree, root)`: it holds
//! only a cursor or an explicit stack, so calling it again on an unchanged tree
//! reproduces the same sequence. Order is fully determined by property
//! declaration order and, within a multiple containment, element order.
//!
//! Private and derived properties are not walked.

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::model::{NodeId, PropertyDescriptor, Slot, Tree};
use crate::{Error, Result};

// ============================================================================
// Direct children
// ============================================================================

/// Direct owned children of one node, multiple containments flattened in place.
#[derive(Debug, Clone)]
pub struct Children<'t> {
    descriptors: &'t [PropertyDescriptor],
    slots: &'t [Slot],
    property: usize,
    element: usize,
}

impl<'t> Children<'t> {
    fn empty() -> Self {
        Self { descriptors: &[], slots: &[], property: 0, element: 0 }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while self.property < self.slots.len() {
            let visible = self.descriptors.get(self.property).is_some_and(PropertyDescriptor::is_public);
            let slots = self.slots;
            let owned: &[NodeId] = if visible { slots[self.property].child_ids() } else { &[] };
            if let Some(child) = owned.get(self.element) {
                self.element += 1;
                return Some(*child);
            }
            self.property += 1;
            self.element = 0;
        }
        None
    }
}

/// Direct children of `node`. An id unknown to the tree yields nothing.
pub fn walk_children(tree: &Tree, node: NodeId) -> Children<'_> {
    let Some(n) = tree.get(node) else {
        return Children::empty();
    };
    match tree.metamodel().node_type(n.node_type()) {
        Some(ty) => Children {
            descriptors: ty.properties(),
            slots: n.slots(),
            property: 0,
            element: 0,
        },
        None => Children::empty(),
    }
}

// ============================================================================
// Pre-order
// ============================================================================

/// Root-first traversal over an explicit stack.
#[derive(Debug, Clone)]
pub struct PreOrder<'t> {
    tree: &'t Tree,
    stack: SmallVec<[NodeId; 16]>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        let children: SmallVec<[NodeId; 8]> = walk_children(self.tree, current).collect();
        self.stack.extend(children.into_iter().rev());
        Some(current)
    }
}

/// The whole subtree, root first.
pub fn walk_pre_order(tree: &Tree, root: NodeId) -> PreOrder<'_> {
    let mut stack = SmallVec::new();
    if tree.get(root).is_some() {
        stack.push(root);
    }
    PreOrder { tree, stack }
}

// ============================================================================
// Leaves-first (post-order)
// ============================================================================

/// Leaves-first traversal: each node is yielded after all of its descendants.
#[derive(Debug, Clone)]
pub struct LeavesFirst<'t> {
    tree: &'t Tree,
    stack: SmallVec<[(NodeId, Children<'t>); 16]>,
}

impl Iterator for LeavesFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let (_, children) = self.stack.last_mut()?;
            match children.next() {
                Some(child) => {
                    let frame = (child, walk_children(self.tree, child));
                    self.stack.push(frame);
                }
                None => return self.stack.pop().map(|(id, _)| id),
            }
        }
    }
}

/// The whole subtree, leaves first; the root comes last.
pub fn walk_leaves_first(tree: &Tree, root: NodeId) -> LeavesFirst<'_> {
    let mut stack = SmallVec::new();
    if tree.get(root).is_some() {
        stack.push((root, walk_children(tree, root)));
    }
    LeavesFirst { tree, stack }
}

// ============================================================================
// Walker selection
// ============================================================================

/// Traversal strategy, for callers that pick one at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Walker {
    #[default]
    PreOrder,
    LeavesFirst,
}

/// Iterator returned by [`Walker::walk`].
#[derive(Debug, Clone)]
pub enum Walk<'t> {
    PreOrder(PreOrder<'t>),
    LeavesFirst(LeavesFirst<'t>),
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        match self {
            Walk::PreOrder(it) => it.next(),
            Walk::LeavesFirst(it) => it.next(),
        }
    }
}

impl Walker {
    pub fn walk(self, tree: &Tree, root: NodeId) -> Walk<'_> {
        match self {
            Walker::PreOrder => Walk::PreOrder(walk_pre_order(tree, root)),
            Walker::LeavesFirst => Walk::LeavesFirst(walk_leaves_first(tree, root)),
        }
    }
}

// ============================================================================
// Containment validation
// ============================================================================

/// Verify that the subtree under `root` is a proper tree: no node reached
/// twice, every child's back-reference pointing at its owner. Returns the
/// number of nodes in the subtree.
///
/// `Tree`'s mutators already keep this invariant; exporters and identity
/// assignment run it before walking anyway.
pub fn check_containment(tree: &Tree, root: NodeId) -> Result<usize> {
    tree.node(root)?;
    let mut seen = HashSet::new();
    let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
    seen.insert(root);
    stack.push(root);
    while let Some(current) = stack.pop() {
        for child in walk_children(tree, current) {
            if !seen.insert(child) {
                return Err(Error::CyclicContainment(tree.describe(child)));
            }
            let owner = tree.node(child)?.parent();
            if owner != Some(current) {
                return Err(Error::InvalidContainment(format!(
                    "{} is contained by {} but its parent is {:?}",
                    tree.describe(child),
                    tree.describe(current),
                    owner
                )));
            }
            stack.push(child);
        }
    }
    Ok(seen.len())
}
