//! Property descriptor tables.
//!
//! Every concrete node type registers its ordered property list once, in a
//! [`Metamodel`]. Walkers, the differ and the exporter iterate these tables and
//! never inspect node payloads to discover shape.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// The closed set of property shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Attribute,
    ContainmentSingle,
    ContainmentMultiple,
    ReferenceSingle,
}

impl PropertyKind {
    pub fn is_containment(self) -> bool {
        matches!(self, PropertyKind::ContainmentSingle | PropertyKind::ContainmentMultiple)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyKind::Attribute => "ATTRIBUTE",
            PropertyKind::ContainmentSingle => "CONTAINMENT-SINGLE",
            PropertyKind::ContainmentMultiple => "CONTAINMENT-MULTIPLE",
            PropertyKind::ReferenceSingle => "REFERENCE-SINGLE",
        };
        f.write_str(s)
    }
}

/// Private properties are invisible to walking, diffing and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Int,
    Float,
    Bool,
    /// Name of an enumeration registered in the same metamodel.
    Enum(String),
    Opaque,
}

// ============================================================================
// PropertyDescriptor
// ============================================================================

/// One named facet of a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    /// Computed properties are excluded from walking, equality and export.
    pub derived: bool,
    pub visibility: Visibility,
    /// Only meaningful for attributes.
    pub data_type: Option<DataType>,
    /// Statically known child type of a containment.
    pub child_type: Option<String>,
    /// Declared target type of a reference.
    pub target_type: Option<String>,
    /// Type that declares this property; filled in at registration.
    pub declared_by: String,
}

impl PropertyDescriptor {
    fn base(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            derived: false,
            visibility: Visibility::Public,
            data_type: None,
            child_type: None,
            target_type: None,
            declared_by: String::new(),
        }
    }

    pub fn attribute(name: impl Into<String>, data_type: DataType) -> Self {
        Self { data_type: Some(data_type), ..Self::base(name, PropertyKind::Attribute) }
    }

    pub fn child(name: impl Into<String>, child_type: impl Into<String>) -> Self {
        Self { child_type: Some(child_type.into()), ..Self::base(name, PropertyKind::ContainmentSingle) }
    }

    pub fn children(name: impl Into<String>, child_type: impl Into<String>) -> Self {
        Self { child_type: Some(child_type.into()), ..Self::base(name, PropertyKind::ContainmentMultiple) }
    }

    pub fn reference(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self { target_type: Some(target_type.into()), ..Self::base(name, PropertyKind::ReferenceSingle) }
    }

    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Participates in walking, diffing and export.
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public && !self.derived
    }
}

// ============================================================================
// NodeType
// ============================================================================

/// Descriptor table of one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    pub supertypes: Vec<String>,
    pub is_abstract: bool,
    declared: Vec<PropertyDescriptor>,
    /// Inherited then declared properties; computed by `Metamodel::register`.
    effective: Vec<PropertyDescriptor>,
}

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            is_abstract: false,
            declared: Vec::new(),
            effective: Vec::new(),
        }
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.declared.push(descriptor);
        self
    }

    pub fn declared_properties(&self) -> &[PropertyDescriptor] {
        &self.declared
    }

    /// Full ordered property table, including private and derived entries.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.effective
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.effective.iter().position(|p| p.name == name)
    }
}

// ============================================================================
// Metamodel
// ============================================================================

/// Registration-time table of node types and enumerations.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    name: String,
    types: HashMap<String, NodeType>,
    order: Vec<String>,
    enums: HashMap<String, Vec<String>>,
}

impl Metamodel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_enum<I, S>(&mut self, name: impl Into<String>, literals: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.enums.contains_key(&name) {
            return Err(Error::Configuration(format!("enumeration {name} registered twice")));
        }
        let literals: Vec<String> = literals.into_iter().map(Into::into).collect();
        if let Some(literal) = first_duplicate(literals.iter().map(String::as_str)) {
            return Err(Error::Configuration(format!("enumeration {name} repeats literal {literal}")));
        }
        self.enums.insert(name, literals);
        Ok(())
    }

    /// Register a node type. Supertypes must already be registered, which
    /// also rules out inheritance cycles.
    pub fn register(&mut self, mut node_type: NodeType) -> Result<()> {
        if self.types.contains_key(&node_type.name) {
            return Err(Error::Configuration(format!("node type {} registered twice", node_type.name)));
        }

        let mut effective: Vec<PropertyDescriptor> = Vec::new();
        for supertype in &node_type.supertypes {
            let parent = self.types.get(supertype).ok_or_else(|| {
                Error::Configuration(format!("{} extends unknown type {supertype}", node_type.name))
            })?;
            for inherited in parent.properties() {
                push_unique(&mut effective, inherited.clone(), &node_type.name)?;
            }
        }

        if let Some(name) = first_duplicate(node_type.declared.iter().map(|p| p.name.as_str())) {
            return Err(Error::Configuration(format!("{} declares property {name} twice", node_type.name)));
        }

        for declared in &mut node_type.declared {
            declared.declared_by = node_type.name.clone();
            if let Some(DataType::Enum(enumeration)) = &declared.data_type {
                if !self.enums.contains_key(enumeration) {
                    return Err(Error::Configuration(format!(
                        "{}.{} uses unknown enumeration {enumeration}",
                        node_type.name, declared.name
                    )));
                }
            }
            push_unique(&mut effective, declared.clone(), &node_type.name)?;
        }
        node_type.effective = effective;

        debug!(
            metamodel = %self.name,
            node_type = %node_type.name,
            properties = node_type.effective.len(),
            "registered node type"
        );
        self.order.push(node_type.name.clone());
        self.types.insert(node_type.name.clone(), node_type);
        Ok(())
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&NodeType> {
        self.types.get(name).ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    /// Node types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.order.iter().filter_map(|n| self.types.get(n))
    }

    pub fn enum_literals(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// Reflexive, transitive subtype check.
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let mut stack = vec![sub];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(t) = self.types.get(current) {
                for s in &t.supertypes {
                    if s == sup {
                        return true;
                    }
                    stack.push(s.as_str());
                }
            }
        }
        false
    }
}

/// Diamond inheritance brings the same descriptor twice; keep one. Two
/// different declarations sharing a name are rejected.
/// First name occurring twice, owned so the caller's borrow ends here.
fn first_duplicate<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut seen = HashSet::new();
    names.into_iter().find(|n| !seen.insert(*n)).map(str::to_string)
}

fn push_unique(effective: &mut Vec<PropertyDescriptor>, candidate: PropertyDescriptor, owner: &str) -> Result<()> {
    match effective.iter().find(|p| p.name == candidate.name) {
        Some(existing) if existing.declared_by == candidate.declared_by => Ok(()),
        Some(existing) => Err(Error::Configuration(format!(
            "property {} of {owner} collides: declared by both {} and {}",
            candidate.name, existing.declared_by, candidate.declared_by
        ))),
        None => {
            effective.push(candidate);
            Ok(())
        }
    }
}
