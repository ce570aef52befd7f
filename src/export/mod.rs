//! Portable graph export — serialize a tree as a flat, namespace-qualified
//! node-graph document for cross-process and cross-language exchange.
//!
//! ```text
//! Tree + SchemaRegistry → GraphExporter::export() → GraphDocument → JSON
//! JSON → GraphDocument → GraphImporter::import() → Tree
//! ```
//!
//! Field order of every record is part of the wire contract:
//! `id, concept, properties, children, references, parent`. Struct field
//! order below is what serde emits, so do not reorder fields.

pub mod import;
pub mod language;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::{compute_ids, IdentityMap, StructuralIdProvider, DEFAULT_NAMESPACE};
use crate::model::{NodeId, Slot, Tree};
use crate::walk::{check_containment, walk_pre_order};
use crate::{Error, Result};

pub use import::GraphImporter;
pub use language::{Language, LanguageRegistry, MetaPointer, SchemaRegistry};

/// The only serialization format version this crate reads and writes.
pub const SERIALIZATION_FORMAT_VERSION: &str = "1";

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub serialization_format_version: String,
    pub languages: Vec<UsedLanguage>,
    pub nodes: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedLanguage {
    pub version: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: String,
    pub concept: MetaPointer,
    pub properties: Vec<SerializedProperty>,
    pub children: Vec<SerializedContainment>,
    pub references: Vec<SerializedReference>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedProperty {
    pub property: MetaPointer,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedContainment {
    pub containment: MetaPointer,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedReference {
    pub reference: MetaPointer,
    pub targets: Vec<ReferenceTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTarget {
    pub resolve_info: Option<String>,
    pub reference: Option<String>,
}

impl GraphDocument {
    pub fn new() -> Self {
        Self {
            serialization_format_version: SERIALIZATION_FORMAT_VERSION.to_string(),
            languages: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&SerializedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Two-space indented JSON, the layout existing consumers diff against.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for GraphDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializedNode {
    /// Value of the first property whose key matches.
    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.property.key.as_deref() == Some(key))
            .and_then(|p| p.value.as_deref())
    }

    pub fn containment(&self, key: &str) -> Option<&[String]> {
        self.children
            .iter()
            .find(|c| c.containment.key.as_deref() == Some(key))
            .map(|c| c.children.as_slice())
    }

    pub fn reference(&self, key: &str) -> Option<&[ReferenceTarget]> {
        self.references
            .iter()
            .find(|r| r.reference.key.as_deref() == Some(key))
            .map(|r| r.targets.as_slice())
    }
}

// ============================================================================
// Exporter
// ============================================================================

/// Exporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Prefix of every node id, usually the source the tree was built from.
    pub namespace: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { namespace: DEFAULT_NAMESPACE.to_string() }
    }
}

/// Serializes trees against a schema registry.
pub struct GraphExporter<'r, R: SchemaRegistry + ?Sized> {
    registry: &'r R,
    config: ExportConfig,
}

impl<'r, R: SchemaRegistry + ?Sized> GraphExporter<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self::with_config(registry, ExportConfig::default())
    }

    pub fn with_config(registry: &'r R, config: ExportConfig) -> Self {
        Self { registry, config }
    }

    /// Export the subtree under `root`. Records come out in pre-order; the
    /// root's `parent` is always null.
    pub fn export(&self, tree: &Tree, root: NodeId) -> Result<GraphDocument> {
        check_containment(tree, root)?;
        let mut provider = StructuralIdProvider::new(&self.config.namespace);
        let ids = compute_ids(tree, root, walk_pre_order, &mut provider)?;

        let mut document = GraphDocument::new();
        for node in walk_pre_order(tree, root) {
            let record = self.serialize_node(tree, root, node, &ids)?;
            let used = UsedLanguage {
                version: record.concept.version.clone().unwrap_or_default(),
                key: record.concept.language.clone().unwrap_or_default(),
            };
            if !document.languages.contains(&used) {
                document.languages.push(used);
            }
            document.nodes.push(record);
        }
        debug!(
            root = %root,
            nodes = document.nodes.len(),
            languages = document.languages.len(),
            "exported graph document"
        );
        Ok(document)
    }

    fn serialize_node(&self, tree: &Tree, root: NodeId, node: NodeId, ids: &IdentityMap) -> Result<SerializedNode> {
        let n = tree.node(node)?;
        let node_type = n.node_type();
        let concept = self
            .registry
            .resolve_concept(node_type)
            .filter(MetaPointer::is_resolved)
            .ok_or_else(|| Error::UnresolvedSchemaReference {
                what: "concept".to_string(),
                name: node_type.to_string(),
                path: tree.path_of(node),
            })?;

        let mut record = SerializedNode {
            id: id_of(ids, tree, node)?,
            concept,
            properties: Vec::new(),
            children: Vec::new(),
            references: Vec::new(),
            parent: None,
        };

        for property in tree.properties(node)? {
            let key = self.registry.resolve_property_key(node_type, property.name()).unwrap_or_else(|| {
                warn!(node_type, property = property.name(), "property not registered, emitting null key");
                MetaPointer::unresolved()
            });
            match property.slot {
                Slot::Attribute(value) => record.properties.push(SerializedProperty {
                    property: key,
                    value: value.to_wire(),
                }),
                Slot::Child(_) | Slot::Children(_) | Slot::IgnoredChildren => {
                    let children = property
                        .slot
                        .child_ids()
                        .iter()
                        .map(|c| id_of(ids, tree, *c))
                        .collect::<Result<Vec<_>>>()?;
                    record.children.push(SerializedContainment { containment: key, children });
                }
                Slot::Reference(reference) => {
                    let targets = reference
                        .iter()
                        .map(|r| ReferenceTarget {
                            resolve_info: Some(r.name().to_string()),
                            reference: r.referred().and_then(|t| ids.get(t)).map(str::to_string),
                        })
                        .collect();
                    record.references.push(SerializedReference { reference: key, targets });
                }
            }
        }

        if node != root {
            record.parent = n.parent().and_then(|p| ids.get(p)).map(str::to_string);
        }
        Ok(record)
    }
}

fn id_of(ids: &IdentityMap, tree: &Tree, node: NodeId) -> Result<String> {
    ids.get(node)
        .map(str::to_string)
        .ok_or_else(|| Error::UnknownNode(tree.describe(node)))
}
