//! Schema registry: maps type tags and property names to namespace-qualified
//! keys (language, version, key) and back.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Metamodel;
use crate::{Error, Result};

/// Namespace-qualified key of a concept or feature. All three fields are
/// `None` when the feature is not registered in any language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaPointer {
    pub language: Option<String>,
    pub version: Option<String>,
    pub key: Option<String>,
}

impl MetaPointer {
    pub fn new(language: impl Into<String>, version: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            version: Some(version.into()),
            key: Some(key.into()),
        }
    }

    /// The all-null pointer emitted for unregistered properties.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.language.is_some() && self.version.is_some() && self.key.is_some()
    }
}

/// Lookups the exporter and importer need from a schema description.
pub trait SchemaRegistry {
    fn resolve_concept(&self, node_type: &str) -> Option<MetaPointer>;

    fn resolve_property_key(&self, node_type: &str, property: &str) -> Option<MetaPointer>;

    /// Reverse of `resolve_concept`.
    fn concept_type(&self, concept: &MetaPointer) -> Option<String>;

    /// Reverse of `resolve_property_key`.
    fn property_name(&self, node_type: &str, property: &MetaPointer) -> Option<String>;
}

// ============================================================================
// Language
// ============================================================================

#[derive(Debug, Clone)]
struct Concept {
    key: String,
    /// property name → property key
    properties: HashMap<String, String>,
}

/// One versioned namespace of concepts.
///
/// Concept keys are `{language}-{Type}`; property keys are the property names.
/// A property is registered only when the type that declares it is itself a
/// concept of this language, so properties inherited from outside types
/// resolve to nothing.
#[derive(Debug, Clone)]
pub struct Language {
    key: String,
    version: String,
    concepts: HashMap<String, Concept>,
}

impl Language {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self { key: key.into(), version: version.into(), concepts: HashMap::new() }
    }

    /// Every node type of the metamodel becomes a concept.
    pub fn from_metamodel(key: impl Into<String>, version: impl Into<String>, metamodel: &Metamodel) -> Result<Self> {
        let mut language = Self::new(key, version);
        language.add_concepts(metamodel, metamodel.types().map(|t| t.name.as_str()))?;
        Ok(language)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Register the named types as concepts and (re)compute property keys for
    /// every concept of this language.
    pub fn add_concepts<'a>(&mut self, metamodel: &Metamodel, types: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in types {
            metamodel.require(name)?;
            let key = format!("{}-{name}", self.key);
            self.concepts.entry(name.to_string()).or_insert_with(|| Concept { key, properties: HashMap::new() });
        }

        let registered: HashSet<String> = self.concepts.keys().cloned().collect();
        for (name, concept) in self.concepts.iter_mut() {
            let ty = metamodel.require(name)?;
            concept.properties = ty
                .properties()
                .iter()
                .filter(|p| registered.contains(&p.declared_by))
                .map(|p| (p.name.clone(), p.name.clone()))
                .collect();
        }
        debug!(language = %self.key, concepts = self.concepts.len(), "language updated");
        Ok(())
    }

    pub fn concept_pointer(&self, node_type: &str) -> Option<MetaPointer> {
        let concept = self.concepts.get(node_type)?;
        Some(MetaPointer::new(&self.key, &self.version, &concept.key))
    }

    pub fn property_pointer(&self, node_type: &str, property: &str) -> Option<MetaPointer> {
        let key = self.concepts.get(node_type)?.properties.get(property)?;
        Some(MetaPointer::new(&self.key, &self.version, key))
    }

    fn owns(&self, pointer: &MetaPointer) -> bool {
        pointer.language.as_deref() == Some(self.key.as_str())
            && pointer.version.as_deref() == Some(self.version.as_str())
    }
}

// ============================================================================
// LanguageRegistry
// ============================================================================

/// Ordered set of languages; the first one that knows a type wins.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, language: Language) -> Result<()> {
        if self.languages.iter().any(|l| l.key == language.key && l.version == language.version) {
            return Err(Error::Configuration(format!(
                "language {} version {} registered twice",
                language.key, language.version
            )));
        }
        self.languages.push(language);
        Ok(())
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    fn language_of(&self, node_type: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.concepts.contains_key(node_type))
    }
}

impl SchemaRegistry for LanguageRegistry {
    fn resolve_concept(&self, node_type: &str) -> Option<MetaPointer> {
        self.language_of(node_type)?.concept_pointer(node_type)
    }

    fn resolve_property_key(&self, node_type: &str, property: &str) -> Option<MetaPointer> {
        self.language_of(node_type)?.property_pointer(node_type, property)
    }

    fn concept_type(&self, concept: &MetaPointer) -> Option<String> {
        let key = concept.key.as_deref()?;
        self.languages
            .iter()
            .filter(|l| l.owns(concept))
            .find_map(|l| l.concepts.iter().find(|(_, c)| c.key == key).map(|(name, _)| name.clone()))
    }

    fn property_name(&self, node_type: &str, property: &MetaPointer) -> Option<String> {
        let language = self.language_of(node_type)?;
        if !language.owns(property) {
            return None;
        }
        let key = property.key.as_deref()?;
        language
            .concepts
            .get(node_type)?
            .properties
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(name, _)| name.clone())
    }
}

impl SchemaRegistry for Language {
    fn resolve_concept(&self, node_type: &str) -> Option<MetaPointer> {
        self.concept_pointer(node_type)
    }

    fn resolve_property_key(&self, node_type: &str, property: &str) -> Option<MetaPointer> {
        self.property_pointer(node_type, property)
    }

    fn concept_type(&self, concept: &MetaPointer) -> Option<String> {
        let key = concept.key.as_deref()?;
        if !self.owns(concept) {
            return None;
        }
        self.concepts.iter().find(|(_, c)| c.key == key).map(|(name, _)| name.clone())
    }

    fn property_name(&self, node_type: &str, property: &MetaPointer) -> Option<String> {
        if !self.owns(property) {
            return None;
        }
        let key = property.key.as_deref()?;
        self.concepts
            .get(node_type)?
            .properties
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(name, _)| name.clone())
    }
}
