//! Type catalog
//!
//! Read-only lookup of type definitions for the binder, plus an in-memory
//! registry that can be loaded from and saved to JSON.

use crate::builtin_types::BuiltinType;
use crate::error::{Error, Result};
use crate::types::{Cardinality, PropertyType};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn default_true() -> bool {
    true
}

/// Property definition of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub id: String,
    /// Name used in query text; defaults to the id
    #[serde(default)]
    pub query_name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default = "default_true")]
    pub queryable: bool,
    #[serde(default = "default_true")]
    pub orderable: bool,
}

impl PropertyDefinition {
    pub fn new(id: &str, property_type: PropertyType) -> Self {
        Self {
            id: id.to_string(),
            query_name: id.to_string(),
            property_type,
            cardinality: Cardinality::Single,
            queryable: true,
            orderable: true,
        }
    }

    pub fn multi(id: &str, property_type: PropertyType) -> Self {
        Self {
            cardinality: Cardinality::Multi,
            orderable: false,
            ..Self::new(id, property_type)
        }
    }

    pub fn is_multi_valued(&self) -> bool {
        self.cardinality == Cardinality::Multi
    }
}

/// Type definition with its (inherited and own) properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub id: String,
    #[serde(default, rename = "parent")]
    pub parent_id: Option<String>,
    #[serde(default = "default_true")]
    pub queryable: bool,
    #[serde(default)]
    pub fulltext_indexed: bool,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl TypeDefinition {
    pub fn new(id: &str, parent_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            queryable: true,
            fulltext_indexed: false,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }

    /// Property by query name
    pub fn property(&self, query_name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.query_name == query_name)
    }
}

/// Read-only type lookup used during binding
pub trait TypeCatalog {
    fn lookup(&self, type_id: &str) -> Option<Arc<TypeDefinition>>;

    /// True when `type_id` is `ancestor_id` or derives from it.
    fn is_subtype_of(&self, type_id: &str, ancestor_id: &str) -> bool {
        let mut current = Some(type_id.to_string());
        // Depth bound guards against parent cycles in hand-written catalogs.
        for _ in 0..64 {
            match current {
                Some(ref id) if id == ancestor_id => return true,
                Some(ref id) => current = self.lookup(id).and_then(|t| t.parent_id.clone()),
                None => return false,
            }
        }
        false
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CatalogFile {
    types: Vec<TypeDefinition>,
}

/// In-memory type registry, preloaded with the CMIS base types.
pub struct InMemoryTypeCatalog {
    types: RwLock<IndexMap<String, Arc<TypeDefinition>>>,
}

impl Default for InMemoryTypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTypeCatalog {
    pub fn new() -> Self {
        let types = BuiltinType::ALL
            .iter()
            .map(|b| (b.id().to_string(), Arc::new(b.definition())))
            .collect();
        Self {
            types: RwLock::new(types),
        }
    }

    /// Register a type. Properties of the parent type are inherited; a
    /// property redefined by the child replaces the inherited one.
    pub fn register(&self, mut definition: TypeDefinition) -> Result<Arc<TypeDefinition>> {
        let mut types = self.types.write();
        if types.contains_key(&definition.id) {
            return Err(Error::QueryExecutionError(format!(
                "Type '{}' already exists",
                definition.id
            )));
        }

        for property in &mut definition.properties {
            if property.query_name.is_empty() {
                property.query_name = property.id.clone();
            }
        }

        if let Some(parent_id) = &definition.parent_id {
            let parent = types
                .get(parent_id)
                .ok_or_else(|| Error::TypeNotFound(parent_id.clone()))?;
            let own = std::mem::take(&mut definition.properties);
            let mut properties: Vec<PropertyDefinition> = parent
                .properties
                .iter()
                .filter(|p| !own.iter().any(|o| o.query_name == p.query_name))
                .cloned()
                .collect();
            properties.extend(own);
            definition.properties = properties;
            definition.fulltext_indexed |= parent.fulltext_indexed;
        }

        let definition = Arc::new(definition);
        types.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    pub fn type_ids(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    /// Load user types from a JSON file (`{"types": [...]}`). Parents must
    /// appear before their children.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let file: CatalogFile = serde_json::from_slice(&data)?;
        let catalog = Self::new();
        catalog.register_all(file.types)?;
        Ok(catalog)
    }

    pub fn register_all(&self, definitions: Vec<TypeDefinition>) -> Result<()> {
        for definition in definitions {
            if BuiltinType::is_builtin(&definition.id) {
                continue;
            }
            self.register(definition)?;
        }
        Ok(())
    }

    /// Save user types (base types excluded) as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let types = self
            .types
            .read()
            .values()
            .filter(|t| !BuiltinType::is_builtin(&t.id))
            .map(|t| t.as_ref().clone())
            .collect();
        let data = serde_json::to_vec_pretty(&CatalogFile { types })?;
        fs::write(path.as_ref(), data)?;
        Ok(())
    }
}

impl TypeCatalog for InMemoryTypeCatalog {
    fn lookup(&self, type_id: &str) -> Option<Arc<TypeDefinition>> {
        self.types.read().get(type_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn book_type() -> TypeDefinition {
        TypeDefinition::new("BookType", Some("cmis:document"))
            .with_property(PropertyDefinition::new("Title", PropertyType::String))
            .with_property(PropertyDefinition::multi("Authors", PropertyType::String))
    }

    #[test]
    fn test_register_inherits_parent_properties() {
        let catalog = InMemoryTypeCatalog::new();
        let book = catalog.register(book_type()).unwrap();
        assert!(book.property("Title").is_some());
        assert!(book.property("cmis:name").is_some());
        assert!(book.fulltext_indexed);
        assert!(book.property("Authors").unwrap().is_multi_valued());
    }

    #[test]
    fn test_redefined_property_replaces_inherited() {
        let catalog = InMemoryTypeCatalog::new();
        let definition = TypeDefinition::new("Memo", Some("cmis:document"))
            .with_property(PropertyDefinition::new("cmis:name", PropertyType::Id));
        let memo = catalog.register(definition).unwrap();

        let names: Vec<_> = memo.properties.iter().filter(|p| p.query_name == "cmis:name").collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].property_type, PropertyType::Id);
        // Own properties follow the inherited ones.
        assert_eq!(memo.properties.last().unwrap().query_name, "cmis:name");
        assert!(memo.property(crate::builtin_types::OBJECT_ID).is_some());
    }

    #[test]
    fn test_register_rejects_duplicates_and_missing_parents() {
        let catalog = InMemoryTypeCatalog::new();
        catalog.register(book_type()).unwrap();
        assert!(catalog.register(book_type()).is_err());

        let orphan = TypeDefinition::new("Orphan", Some("NoSuchType"));
        assert!(matches!(catalog.register(orphan), Err(Error::TypeNotFound(_))));
    }

    #[test]
    fn test_subtype_chain() {
        let catalog = InMemoryTypeCatalog::new();
        catalog.register(book_type()).unwrap();
        catalog
            .register(TypeDefinition::new("Novel", Some("BookType")))
            .unwrap();

        assert!(catalog.is_subtype_of("Novel", "cmis:document"));
        assert!(catalog.is_subtype_of("Novel", "Novel"));
        assert!(!catalog.is_subtype_of("BookType", "Novel"));
        assert!(!catalog.is_subtype_of("Novel", "cmis:folder"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let catalog = InMemoryTypeCatalog::new();
        catalog.register(book_type()).unwrap();

        let file = NamedTempFile::new().unwrap();
        catalog.save(file.path()).unwrap();

        let loaded = InMemoryTypeCatalog::load(file.path()).unwrap();
        let book = loaded.lookup("BookType").unwrap();
        assert_eq!(book.property("Title").unwrap().property_type, PropertyType::String);
        assert_eq!(loaded.type_ids().len(), 3);
    }
}
