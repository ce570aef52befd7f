//! Node in the AST arena.

use serde::{Deserialize, Serialize};

use super::{NamedReference, Position, PropertyKind, Value};

/// Opaque node identifier: the node's index in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current value of one property, aligned with the node type's descriptor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Slot {
    Attribute(Value),
    Child(Option<NodeId>),
    Children(Option<Vec<NodeId>>),
    /// "Do not check this collection" sentinel for structural comparison.
    /// Walks and exports treat it as an empty collection.
    IgnoredChildren,
    Reference(Option<NamedReference>),
}

impl Slot {
    /// Initial slot for a freshly created node.
    pub fn empty(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Attribute => Slot::Attribute(Value::Null),
            PropertyKind::ContainmentSingle => Slot::Child(None),
            PropertyKind::ContainmentMultiple => Slot::Children(Some(Vec::new())),
            PropertyKind::ReferenceSingle => Slot::Reference(None),
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Slot::Attribute(_) => PropertyKind::Attribute,
            Slot::Child(_) => PropertyKind::ContainmentSingle,
            Slot::Children(_) | Slot::IgnoredChildren => PropertyKind::ContainmentMultiple,
            Slot::Reference(_) => PropertyKind::ReferenceSingle,
        }
    }

    /// Owned children in order; empty for non-containment slots.
    pub fn child_ids(&self) -> &[NodeId] {
        match self {
            Slot::Child(Some(c)) => std::slice::from_ref(c),
            Slot::Children(Some(list)) => list,
            _ => &[],
        }
    }
}

/// A node of the tree. Fields are maintained by `Tree`; read them freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) node_type: String,
    pub(crate) position: Option<Position>,
    /// Non-owning back-reference, set exactly once when attached.
    pub(crate) parent: Option<NodeId>,
    pub(crate) slots: Vec<Slot>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Type tag: the nominal name of the node type.
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}
