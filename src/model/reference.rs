//! Named references: lazily resolved, non-owning links between nodes.

use serde::{Deserialize, Serialize};

use super::NodeId;

/// A reference written in the source as a name, optionally resolved to a node
/// of the same tree.
///
/// Equality always compares names and compares targets only when both sides
/// are resolved. This relation is deliberately not `Eq`: it is not transitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedReference {
    name: String,
    referred: Option<NodeId>,
}

impl NamedReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), referred: None }
    }

    pub fn resolved(name: impl Into<String>, target: NodeId) -> Self {
        Self { name: name.into(), referred: Some(target) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn referred(&self) -> Option<NodeId> {
        self.referred
    }

    pub fn is_resolved(&self) -> bool {
        self.referred.is_some()
    }

    /// Populate the resolution slot. Re-assignment is allowed.
    pub fn resolve(&mut self, target: NodeId) {
        self.referred = Some(target);
    }

    pub fn unresolve(&mut self) {
        self.referred = None;
    }
}

impl PartialEq for NamedReference {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        match (self.referred, other.referred) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}
