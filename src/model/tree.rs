//! The node arena and the property descriptor protocol.
//!
//! A `Tree` owns every node it creates. Containment and references are
//! expressed as `NodeId`s, so the parent back-link and named references never
//! alias ownership. All mutators preserve the single-parent, acyclic
//! containment invariant.

use std::sync::Arc;

use tracing::trace;

use super::*;
use crate::{Error, Result};

/// One property of a node as seen through the descriptor protocol.
#[derive(Debug, Clone, Copy)]
pub struct Property<'t> {
    pub descriptor: &'t PropertyDescriptor,
    pub slot: &'t Slot,
}

impl<'t> Property<'t> {
    pub fn name(&self) -> &'t str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.descriptor.kind
    }
}

/// Arena of nodes sharing one metamodel.
#[derive(Debug, Clone)]
pub struct Tree {
    metamodel: Arc<Metamodel>,
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(metamodel: Arc<Metamodel>) -> Self {
        Self { metamodel, nodes: Vec::new() }
    }

    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or_else(|| Error::UnknownNode(id.to_string()))
    }

    /// All nodes in creation order, attached or not.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a detached node of a registered, concrete type. Every slot starts
    /// empty: null attributes, no children, no references.
    pub fn add_node(&mut self, node_type: &str) -> Result<NodeId> {
        let ty = self.metamodel.require(node_type)?;
        if ty.is_abstract {
            return Err(Error::Configuration(format!("cannot instantiate abstract type {node_type}")));
        }
        let id = NodeId(self.nodes.len());
        let slots = ty.properties().iter().map(|p| Slot::empty(p.kind)).collect();
        self.nodes.push(Node {
            id,
            node_type: node_type.to_string(),
            position: None,
            parent: None,
            slots,
        });
        Ok(id)
    }

    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<()> {
        self.node_mut(id)?.position = Some(position);
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, property: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (index, descriptor) = self.slot_of(id, property, PropertyKind::Attribute)?;
        let data_type = descriptor.data_type.clone().unwrap_or(DataType::Opaque);
        if !value.conforms_to(&data_type) {
            return Err(Error::KindMismatch {
                property: property.to_string(),
                expected: format!("{data_type:?}"),
                actual: value.type_name().to_string(),
            });
        }
        if let (Value::Enum { enumeration, literal }, DataType::Enum(_)) = (&value, &data_type) {
            let known = self
                .metamodel
                .enum_literals(enumeration)
                .is_some_and(|lits| lits.iter().any(|l| l == literal));
            if !known {
                return Err(Error::KindMismatch {
                    property: property.to_string(),
                    expected: format!("a literal of {enumeration}"),
                    actual: literal.clone(),
                });
            }
        }
        self.node_mut(id)?.slots[index] = Slot::Attribute(value);
        Ok(())
    }

    /// Set or clear a single containment. A replaced child becomes detached.
    pub fn set_child(&mut self, parent: NodeId, property: &str, child: Option<NodeId>) -> Result<()> {
        let (index, descriptor) = self.slot_of(parent, property, PropertyKind::ContainmentSingle)?;
        let previous = match &self.node(parent)?.slots[index] {
            Slot::Child(prev) => *prev,
            _ => None,
        };
        if previous == child {
            return Ok(());
        }
        if let Some(c) = child {
            self.check_attachable(parent, c, &descriptor)?;
        }
        if let Some(prev) = previous {
            self.node_mut(prev)?.parent = None;
        }
        if let Some(c) = child {
            self.node_mut(c)?.parent = Some(parent);
        }
        self.node_mut(parent)?.slots[index] = Slot::Child(child);
        trace!(%parent, property, ?child, "set child");
        Ok(())
    }

    /// Append to a multiple containment. A null or ignored collection is
    /// replaced by a fresh list first.
    pub fn push_child(&mut self, parent: NodeId, property: &str, child: NodeId) -> Result<()> {
        let (index, descriptor) = self.slot_of(parent, property, PropertyKind::ContainmentMultiple)?;
        self.check_attachable(parent, child, &descriptor)?;
        self.node_mut(child)?.parent = Some(parent);
        let slot = &mut self.node_mut(parent)?.slots[index];
        match slot {
            Slot::Children(Some(list)) => list.push(child),
            other => *other = Slot::Children(Some(vec![child])),
        }
        trace!(%parent, property, %child, "pushed child");
        Ok(())
    }

    /// Make a multiple containment null, detaching its current children.
    pub fn set_children_null(&mut self, parent: NodeId, property: &str) -> Result<()> {
        self.replace_children(parent, property, Slot::Children(None))
    }

    /// Mark a multiple containment with the "ignore" sentinel, detaching its
    /// current children. Meant for expected trees in structural comparisons.
    pub fn ignore_children(&mut self, parent: NodeId, property: &str) -> Result<()> {
        self.replace_children(parent, property, Slot::IgnoredChildren)
    }

    pub fn set_reference(&mut self, id: NodeId, property: &str, reference: Option<NamedReference>) -> Result<()> {
        let (index, _) = self.slot_of(id, property, PropertyKind::ReferenceSingle)?;
        if let Some(target) = reference.as_ref().and_then(NamedReference::referred) {
            self.node(target)?;
        }
        self.node_mut(id)?.slots[index] = Slot::Reference(reference);
        Ok(())
    }

    /// Populate the resolution slot of an existing named reference.
    pub fn resolve_reference(&mut self, id: NodeId, property: &str, target: NodeId) -> Result<()> {
        self.node(target)?;
        let reference = self.reference_mut(id, property)?;
        reference.resolve(target);
        trace!(node = %id, property, %target, "resolved reference");
        Ok(())
    }

    pub fn unresolve_reference(&mut self, id: NodeId, property: &str) -> Result<()> {
        self.reference_mut(id, property)?.unresolve();
        Ok(())
    }

    // ========================================================================
    // Descriptor protocol
    // ========================================================================

    /// Public, non-derived properties in declaration order.
    pub fn properties(&self, id: NodeId) -> Result<Vec<Property<'_>>> {
        Ok(self.all_properties(id)?.into_iter().filter(|p| p.descriptor.is_public()).collect())
    }

    /// Every property, private and derived ones included.
    pub fn all_properties(&self, id: NodeId) -> Result<Vec<Property<'_>>> {
        let node = self.node(id)?;
        let ty = self.metamodel.require(&node.node_type)?;
        Ok(ty
            .properties()
            .iter()
            .zip(node.slots.iter())
            .map(|(descriptor, slot)| Property { descriptor, slot })
            .collect())
    }

    /// Look up a public property by name.
    pub fn property(&self, id: NodeId, name: &str) -> Result<Option<Property<'_>>> {
        Ok(self.properties(id)?.into_iter().find(|p| p.name() == name))
    }

    /// Value of an attribute, public or not.
    pub fn attribute(&self, id: NodeId, name: &str) -> Result<&Value> {
        let (index, _) = self.slot_of(id, name, PropertyKind::Attribute)?;
        match &self.node(id)?.slots[index] {
            Slot::Attribute(v) => Ok(v),
            other => Err(Error::KindMismatch {
                property: name.to_string(),
                expected: PropertyKind::Attribute.to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    pub fn reference(&self, id: NodeId, name: &str) -> Result<Option<&NamedReference>> {
        let (index, _) = self.slot_of(id, name, PropertyKind::ReferenceSingle)?;
        match &self.node(id)?.slots[index] {
            Slot::Reference(r) => Ok(r.as_ref()),
            _ => Ok(None),
        }
    }

    /// The property (and list index, for multiple containments) under which
    /// `id` is owned by its parent.
    pub fn containing_property(&self, id: NodeId) -> Option<(&str, Option<usize>)> {
        let parent = self.get(self.get(id)?.parent?)?;
        let ty = self.metamodel.node_type(&parent.node_type)?;
        for (descriptor, slot) in ty.properties().iter().zip(parent.slots.iter()) {
            match slot {
                Slot::Child(Some(c)) if *c == id => return Some((&descriptor.name, None)),
                Slot::Children(Some(list)) => {
                    if let Some(i) = list.iter().position(|c| *c == id) {
                        return Some((&descriptor.name, Some(i)));
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(Node::parent);
        while let Some(p) = current {
            if out.contains(&p) || out.len() > self.nodes.len() {
                break;
            }
            out.push(p);
            current = self.get(p).and_then(Node::parent);
        }
        out
    }

    /// Human-readable containment path, e.g. `root.body[2].condition`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        for ancestor in self.ancestors(id) {
            match self.containing_property(current) {
                Some((name, Some(i))) => segments.push(format!("{name}[{i}]")),
                Some((name, None)) => segments.push(name.to_string()),
                None => break,
            }
            current = ancestor;
        }
        segments.push("root".to_string());
        segments.reverse();
        segments.join(".")
    }

    /// Shallow string identity of a node: type tag plus containment path.
    pub fn describe(&self, id: NodeId) -> String {
        match self.get(id) {
            Some(node) => format!("{}@{}", node.node_type, self.path_of(id)),
            None => format!("<missing {id}>"),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or_else(|| Error::UnknownNode(id.to_string()))
    }

    /// Slot index and descriptor for `property`, checked against `kind`.
    fn slot_of(&self, id: NodeId, property: &str, kind: PropertyKind) -> Result<(usize, PropertyDescriptor)> {
        let node = self.node(id)?;
        let ty = self.metamodel.require(&node.node_type)?;
        let index = ty.property_index(property).ok_or_else(|| Error::UnknownProperty {
            node_type: node.node_type.clone(),
            property: property.to_string(),
        })?;
        let descriptor = &ty.properties()[index];
        if descriptor.kind != kind {
            return Err(Error::KindMismatch {
                property: property.to_string(),
                expected: kind.to_string(),
                actual: descriptor.kind.to_string(),
            });
        }
        Ok((index, descriptor.clone()))
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId, descriptor: &PropertyDescriptor) -> Result<()> {
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(Error::CyclicContainment(self.describe(child)));
        }
        let child_node = self.node(child)?;
        if let Some(existing) = child_node.parent {
            return Err(Error::InvalidContainment(format!(
                "{} already has parent {}",
                self.describe(child),
                self.describe(existing)
            )));
        }
        if let Some(expected) = &descriptor.child_type {
            if !self.metamodel.is_assignable(&child_node.node_type, expected) {
                return Err(Error::KindMismatch {
                    property: descriptor.name.clone(),
                    expected: expected.clone(),
                    actual: child_node.node_type.clone(),
                });
            }
        }
        Ok(())
    }

    fn replace_children(&mut self, parent: NodeId, property: &str, replacement: Slot) -> Result<()> {
        let (index, _) = self.slot_of(parent, property, PropertyKind::ContainmentMultiple)?;
        let detached = self.node(parent)?.slots[index].child_ids().to_vec();
        for child in detached {
            self.node_mut(child)?.parent = None;
        }
        self.node_mut(parent)?.slots[index] = replacement;
        Ok(())
    }

    fn reference_mut(&mut self, id: NodeId, property: &str) -> Result<&mut NamedReference> {
        let (index, _) = self.slot_of(id, property, PropertyKind::ReferenceSingle)?;
        match &mut self.node_mut(id)?.slots[index] {
            Slot::Reference(Some(r)) => Ok(r),
            _ => Err(Error::KindMismatch {
                property: property.to_string(),
                expected: "a named reference".to_string(),
                actual: "an empty reference slot".to_string(),
            }),
        }
    }
}
