//! Build results handed over by an external parser or constructor.

use serde::{Deserialize, Serialize};

use super::{NodeId, Position, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A diagnostic produced while building a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub message: String,
    pub severity: Severity,
    pub position: Option<Position>,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Error, position: None }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// A tree plus the issues found while producing it. `root` is `None` when the
/// producer could not build anything.
#[derive(Debug, Clone)]
pub struct ParsingResult {
    pub tree: Tree,
    pub root: Option<NodeId>,
    pub issues: Vec<Issue>,
}

impl ParsingResult {
    pub fn new(tree: Tree, root: Option<NodeId>) -> Self {
        Self { tree, root, issues: Vec::new() }
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn is_correct(&self) -> bool {
        self.issues.iter().all(|i| i.severity != Severity::Error)
    }
}
