//! Reference resolution assertions.
//!
//! Resolution itself is the producer's job (`Tree::resolve_reference`). This
//! module only inspects resolution state across a subtree, recursing through
//! direct containment.
//!
//! A subtree with no matching reference passes vacuously. That permissive
//! default is kept for compatibility; [`ReferenceCheck::checked`] tells the
//! caller how many references were actually inspected.

use tracing::debug;

use crate::model::{NodeId, Property, PropertyKind, Slot, Tree};
use crate::walk::{check_containment, walk_children};
use crate::{Error, Result};

/// Which reference properties an assertion looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceSelector {
    /// Every reference property.
    #[default]
    Any,
    /// One property, identified by its declaring type (or the owning node's
    /// own type) and name.
    Property { owner: String, name: String },
    /// Every reference property whose declared target type is `capability`
    /// or more specific.
    TargetType(String),
}

impl ReferenceSelector {
    pub fn property(owner: impl Into<String>, name: impl Into<String>) -> Self {
        ReferenceSelector::Property { owner: owner.into(), name: name.into() }
    }

    pub fn target_type(capability: impl Into<String>) -> Self {
        ReferenceSelector::TargetType(capability.into())
    }

    fn matches(&self, tree: &Tree, node_type: &str, property: &Property<'_>) -> bool {
        if property.kind() != PropertyKind::ReferenceSingle {
            return false;
        }
        match self {
            ReferenceSelector::Any => true,
            ReferenceSelector::Property { owner, name } => {
                property.name() == name && (property.descriptor.declared_by == *owner || node_type == owner)
            }
            ReferenceSelector::TargetType(capability) => property
                .descriptor
                .target_type
                .as_deref()
                .is_some_and(|target| tree.metamodel().is_assignable(target, capability)),
        }
    }
}

/// Outcome of a successful assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReferenceCheck {
    /// Number of reference values inspected.
    pub checked: usize,
}

impl ReferenceCheck {
    /// True when nothing matched and the assertion passed without checking anything.
    pub fn is_vacuous(&self) -> bool {
        self.checked == 0
    }
}

/// Every matching reference in the subtree must be resolved.
pub fn assert_references_resolved(tree: &Tree, root: NodeId, selector: &ReferenceSelector) -> Result<ReferenceCheck> {
    assert_resolution(tree, root, selector, true)
}

/// Every matching reference in the subtree must be unresolved.
pub fn assert_references_not_resolved(tree: &Tree, root: NodeId, selector: &ReferenceSelector) -> Result<ReferenceCheck> {
    assert_resolution(tree, root, selector, false)
}

fn assert_resolution(tree: &Tree, root: NodeId, selector: &ReferenceSelector, expect_resolved: bool) -> Result<ReferenceCheck> {
    check_containment(tree, root)?;
    let mut check = ReferenceCheck::default();
    visit(tree, root, selector, expect_resolved, &mut check)?;
    if check.is_vacuous() {
        debug!(root = %root, ?selector, "reference assertion matched nothing");
    }
    Ok(check)
}

fn visit(
    tree: &Tree,
    node: NodeId,
    selector: &ReferenceSelector,
    expect_resolved: bool,
    check: &mut ReferenceCheck,
) -> Result<()> {
    let node_type = tree.node(node)?.node_type();
    for property in tree.properties(node)? {
        if !selector.matches(tree, node_type, &property) {
            continue;
        }
        let Slot::Reference(Some(reference)) = property.slot else {
            continue;
        };
        check.checked += 1;
        if reference.is_resolved() != expect_resolved {
            return Err(Error::ReferenceAssertion {
                path: tree.path_of(node),
                property: property.name().to_string(),
                name: reference.name().to_string(),
                expected: if expect_resolved { "resolved" } else { "unresolved" }.to_string(),
            });
        }
    }
    for child in walk_children(tree, node) {
        visit(tree, child, selector, expect_resolved, check)?;
    }
    Ok(())
}
