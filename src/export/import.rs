//! Graph document import: rebuild a `Tree` from a `GraphDocument`.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, warn};

use super::{GraphDocument, SchemaRegistry, SerializedNode, SERIALIZATION_FORMAT_VERSION};
use crate::model::{DataType, Metamodel, NamedReference, NodeId, PropertyDescriptor, PropertyKind, Tree, Value};
use crate::{Error, Result};

/// Rebuilds trees from documents using the same schema registry the exporter
/// used.
pub struct GraphImporter<'r, R: SchemaRegistry + ?Sized> {
    metamodel: Arc<Metamodel>,
    registry: &'r R,
}

impl<'r, R: SchemaRegistry + ?Sized> GraphImporter<'r, R> {
    pub fn new(metamodel: Arc<Metamodel>, registry: &'r R) -> Self {
        Self { metamodel, registry }
    }

    /// Import a document holding exactly one root. References to ids outside
    /// the document stay unresolved; properties with null keys are skipped.
    pub fn import(&self, document: &GraphDocument) -> Result<(Tree, NodeId)> {
        if document.serialization_format_version != SERIALIZATION_FORMAT_VERSION {
            return Err(Error::Import(format!(
                "unsupported serialization format version {}",
                document.serialization_format_version
            )));
        }

        let mut tree = Tree::new(Arc::clone(&self.metamodel));
        let mut nodes: HashMap<&str, NodeId> = HashMap::new();
        let mut types: Vec<String> = Vec::with_capacity(document.nodes.len());

        // Pass 1: one node per record.
        for record in &document.nodes {
            let node_type = self.registry.concept_type(&record.concept).ok_or_else(|| {
                Error::UnresolvedSchemaReference {
                    what: "concept".to_string(),
                    name: format!("{:?}", record.concept.key),
                    path: record.id.clone(),
                }
            })?;
            let id = tree.add_node(&node_type)?;
            if nodes.insert(record.id.as_str(), id).is_some() {
                return Err(Error::DuplicateId { id: record.id.clone(), node: node_type });
            }
            types.push(node_type);
        }

        // Pass 2: features, now that every id is known.
        for (record, node_type) in document.nodes.iter().zip(types.iter()) {
            let id = nodes[record.id.as_str()];
            self.import_features(&mut tree, id, node_type, record, &nodes)?;
        }

        let root = find_root(document, &tree, &nodes)?;
        debug!(nodes = tree.len(), root = %root, "imported graph document");
        Ok((tree, root))
    }

    fn import_features(
        &self,
        tree: &mut Tree,
        id: NodeId,
        node_type: &str,
        record: &SerializedNode,
        nodes: &HashMap<&str, NodeId>,
    ) -> Result<()> {
        for property in &record.properties {
            let Some(descriptor) = self.descriptor(node_type, &property.property, record)? else {
                continue;
            };
            expect_kind(&descriptor, &[PropertyKind::Attribute], "property")?;
            let value = match &property.value {
                None => Value::Null,
                Some(text) => {
                    let data_type = descriptor.data_type.clone().unwrap_or(DataType::Opaque);
                    Value::parse(&data_type, text).ok_or_else(|| {
                        Error::Import(format!(
                            "{}: cannot read '{text}' as {data_type:?} for {}",
                            record.id, descriptor.name
                        ))
                    })?
                }
            };
            tree.set_attribute(id, &descriptor.name, value)?;
        }

        for containment in &record.children {
            let Some(descriptor) = self.descriptor(node_type, &containment.containment, record)? else {
                continue;
            };
            expect_kind(
                &descriptor,
                &[PropertyKind::ContainmentSingle, PropertyKind::ContainmentMultiple],
                "containment",
            )?;
            let children = containment
                .children
                .iter()
                .map(|c| lookup(nodes, c, &record.id))
                .collect::<Result<Vec<_>>>()?;
            match descriptor.kind {
                PropertyKind::ContainmentSingle => {
                    if children.len() > 1 {
                        return Err(Error::Import(format!(
                            "{}: single containment {} holds {} children",
                            record.id,
                            descriptor.name,
                            children.len()
                        )));
                    }
                    tree.set_child(id, &descriptor.name, children.first().copied())?;
                }
                _ => {
                    for child in children {
                        tree.push_child(id, &descriptor.name, child)?;
                    }
                }
            }
        }

        for reference in &record.references {
            let Some(descriptor) = self.descriptor(node_type, &reference.reference, record)? else {
                continue;
            };
            expect_kind(&descriptor, &[PropertyKind::ReferenceSingle], "reference")?;
            let target = match reference.targets.as_slice() {
                [] => None,
                [single] => Some(single),
                more => {
                    return Err(Error::Import(format!(
                        "{}: single reference {} has {} targets",
                        record.id,
                        descriptor.name,
                        more.len()
                    )));
                }
            };
            let value = target.map(|t| {
                let mut named = NamedReference::new(t.resolve_info.clone().unwrap_or_default());
                if let Some(target_id) = t.reference.as_deref().and_then(|r| nodes.get(r)) {
                    named.resolve(*target_id);
                }
                named
            });
            tree.set_reference(id, &descriptor.name, value)?;
        }
        Ok(())
    }

    /// Descriptor for a feature key; `None` (skip) when the key is null.
    fn descriptor(
        &self,
        node_type: &str,
        pointer: &super::MetaPointer,
        record: &SerializedNode,
    ) -> Result<Option<PropertyDescriptor>> {
        if !pointer.is_resolved() {
            warn!(node = %record.id, "skipping feature with null key");
            return Ok(None);
        }
        let name = self.registry.property_name(node_type, pointer).ok_or_else(|| {
            Error::UnresolvedSchemaReference {
                what: "property".to_string(),
                name: format!("{:?}", pointer.key),
                path: record.id.clone(),
            }
        })?;
        let ty = self.metamodel.require(node_type)?;
        let index = ty.property_index(&name).ok_or_else(|| Error::UnknownProperty {
            node_type: node_type.to_string(),
            property: name.clone(),
        })?;
        Ok(Some(ty.properties()[index].clone()))
    }
}

fn expect_kind(descriptor: &PropertyDescriptor, allowed: &[PropertyKind], group: &str) -> Result<()> {
    if allowed.contains(&descriptor.kind) {
        Ok(())
    } else {
        Err(Error::UnknownPropertyKind {
            property: descriptor.name.clone(),
            kind: format!("{} listed under {group}", descriptor.kind),
        })
    }
}

fn lookup(nodes: &HashMap<&str, NodeId>, id: &str, owner: &str) -> Result<NodeId> {
    nodes
        .get(id)
        .copied()
        .ok_or_else(|| Error::Import(format!("{owner}: child {id} is not in the document")))
}

/// The single record without a parent inside the document; parents recorded
/// on the others must agree with the rebuilt containment.
fn find_root(document: &GraphDocument, tree: &Tree, nodes: &HashMap<&str, NodeId>) -> Result<NodeId> {
    let mut roots = Vec::new();
    for record in &document.nodes {
        let id = nodes[record.id.as_str()];
        let actual = tree.node(id)?.parent();
        let declared = record.parent.as_deref().and_then(|p| nodes.get(p).copied());
        if actual != declared {
            return Err(Error::Import(format!(
                "{}: declared parent {:?} but contained by {:?}",
                record.id, record.parent, actual
            )));
        }
        if actual.is_none() {
            roots.push(id);
        }
    }
    match roots.as_slice() {
        [root] => Ok(*root),
        [] => Err(Error::Import("document has no root".to_string())),
        many => Err(Error::Import(format!("document has {} roots", many.len()))),
    }
}
