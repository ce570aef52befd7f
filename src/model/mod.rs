//! # AST Node Model
//!
//! The descriptor protocol and the arena that holds node graphs.
//! These types cross every boundary: producer ↔ walker ↔ differ ↔ exporter.
//!
//! Design rule: NO wire types here. This module is pure data plus the
//! invariant-preserving mutators of `Tree`; no I/O.

pub mod descriptor;
pub mod node;
pub mod position;
pub mod reference;
pub mod result;
pub mod tree;
pub mod value;

pub use descriptor::{DataType, Metamodel, NodeType, PropertyDescriptor, PropertyKind, Visibility};
pub use node::{Node, NodeId, Slot};
pub use position::{Point, Position};
pub use reference::NamedReference;
pub use result::{Issue, ParsingResult, Severity};
pub use tree::{Property, Tree};
pub use value::Value;
