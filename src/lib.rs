//! # astgraph — Generic AST Node Graphs
//!
//! Models abstract syntax trees produced by language tooling as a generic,
//! introspectable node graph. Any concrete AST type system that registers its
//! node types in a [`Metamodel`] gets walking, identity assignment, reference
//! assertions, structural diffing and portable export for free.
//!
//! ## Design Principles
//!
//! 1. **Descriptor tables, not introspection**: every node type declares its
//!    ordered property list once; generic algorithms iterate that table
//! 2. **Arena-owned nodes**: a `Tree` owns every node; parent links and named
//!    references are `NodeId`s, never aliasing pointers
//! 3. **Pure traversals**: walkers, differ and exporter are synchronous functions
//!    over an immutable borrow of the tree
//! 4. **Bit-exact wire format**: the graph document field order is part of the
//!    external contract
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use astgraph::{Metamodel, NodeType, PropertyDescriptor, DataType, Tree};
//! use astgraph::walk::walk_pre_order;
//! use astgraph::index::{compute_ids, SequentialIdProvider};
//!
//! # fn example() -> astgraph::Result<()> {
//! let mut mm = Metamodel::new("calc");
//! mm.register(NodeType::new("Literal").property(PropertyDescriptor::attribute("value", DataType::Int)))?;
//! mm.register(NodeType::new("Sum").property(PropertyDescriptor::children("terms", "Literal")))?;
//!
//! let mut tree = Tree::new(Arc::new(mm));
//! let sum = tree.add_node("Sum")?;
//! for v in [1, 2] {
//!     let lit = tree.add_node("Literal")?;
//!     tree.set_attribute(lit, "value", v)?;
//!     tree.push_child(sum, "terms", lit)?;
//! }
//!
//! let ids = compute_ids(&tree, sum, walk_pre_order, &mut SequentialIdProvider::new())?;
//! assert_eq!(ids.len(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Subsystems
//!
//! | Module | Description |
//! |--------|-------------|
//! | `model` | Descriptor protocol, node arena, values, named references |
//! | `walk` | Children / pre-order / leaves-first traversals |
//! | `index` | Identity assignment with pluggable id providers |
//! | `resolution` | Reference resolution assertions |
//! | `testing` | Structural equality with path-qualified failures |
//! | `export` | Portable graph document export and import |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod walk;
pub mod index;
pub mod resolution;
pub mod testing;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeId, Slot, Tree, Property, Value, NamedReference,
    Point, Position, Issue, Severity, ParsingResult,
    DataType, Metamodel, NodeType, PropertyDescriptor, PropertyKind, Visibility,
};

// ============================================================================
// Re-exports: Traversal and identity
// ============================================================================

pub use walk::{walk_children, walk_pre_order, walk_leaves_first, Walker};
pub use index::{compute_ids, IdProvider, IdentityMap, SequentialIdProvider, StructuralIdProvider};

// ============================================================================
// Re-exports: Verification and export
// ============================================================================

pub use resolution::{ReferenceCheck, ReferenceSelector};
pub use testing::DiffOptions;
pub use export::{
    ExportConfig, GraphDocument, GraphExporter, GraphImporter,
    Language, LanguageRegistry, MetaPointer, SchemaRegistry,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown node type: {0}")]
    UnknownType(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unknown property '{property}' on {node_type}")]
    UnknownProperty { node_type: String, property: String },

    #[error("Kind mismatch on '{property}': expected {expected}, got {actual}")]
    KindMismatch { property: String, expected: String, actual: String },

    #[error("Invalid containment: {0}")]
    InvalidContainment(String),

    #[error("Unhandled property kind for '{property}': {kind}")]
    UnknownPropertyKind { property: String, kind: String },

    #[error("{path}: expecting {expected}, actual {actual}")]
    StructuralMismatch { path: String, expected: String, actual: String },

    #[error("No property {property} found at {path}")]
    MissingProperty { path: String, property: String },

    #[error("Unresolved schema reference for {what} '{name}' at {path}")]
    UnresolvedSchemaReference { what: String, name: String, path: String },

    #[error("Cyclic containment: {0} appears as its own descendant")]
    CyclicContainment(String),

    #[error("Duplicate id '{id}' produced for {node}")]
    DuplicateId { id: String, node: String },

    #[error("{path}.{property}: reference '{name}' expected to be {expected}")]
    ReferenceAssertion { path: String, property: String, name: String, expected: String },

    #[error("Import error: {0}")]
    Import(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
