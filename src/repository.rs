//! In-memory content repository
//!
//! Object storage used by the executor, plus the collaborator traits the
//! evaluator reads objects, folder ancestry and full-text matches through.

use crate::builtin_types::{OBJECT_ID, OBJECT_TYPE_ID, PARENT_ID};
use crate::catalog::{InMemoryTypeCatalog, TypeCatalog, TypeDefinition};
use crate::error::{Error, Result};
use crate::query::{parse_timestamp, FullTextMatch, FullTextNode, TextMatcher};
use crate::types::{ObjectId, PropertyType, PropertyValue, Value};
use indexmap::IndexMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Collaborator traits
// ============================================================================

/// Property access for one candidate object
pub trait ObjectPropertySource {
    fn object_id(&self) -> &str;

    fn type_id(&self) -> &str;

    /// Stored value by property id; `None` when absent
    fn get(&self, property_id: &str) -> Option<&PropertyValue>;

    /// Free text used by CONTAINS when no full-text index is configured
    fn full_text(&self) -> Option<String> {
        None
    }
}

pub trait FolderHierarchy {
    fn parent_of(&self, object_id: &str) -> Option<String>;

    /// Ancestor folder ids, nearest first. Stops at the first repeated id.
    fn ancestors_of(&self, object_id: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(object_id.to_string());

        let mut current = self.parent_of(object_id);
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            current = self.parent_of(&parent);
            ancestors.push(parent);
        }
        ancestors
    }
}

pub trait FullTextIndex {
    fn match_text(&self, search: &FullTextNode, object_id: &str) -> Result<FullTextMatch>;
}

// ============================================================================
// Content object
// ============================================================================

/// A document, folder or custom-typed object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentObject {
    pub id: ObjectId,
    pub type_id: String,
    #[serde(default)]
    pub parent_id: Option<ObjectId>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    /// Content stream text, if any
    #[serde(default)]
    pub content: Option<String>,
}

impl ContentObject {
    pub fn new(id: &str, type_id: &str) -> Self {
        Self {
            id: ObjectId::from(id),
            type_id: type_id.to_string(),
            parent_id: None,
            properties: IndexMap::new(),
            content: None,
        }
    }

    pub fn with_property(mut self, property_id: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(property_id.to_string(), value.into());
        self
    }

    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(ObjectId::from(parent_id));
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }
}

impl ObjectPropertySource for ContentObject {
    fn object_id(&self) -> &str {
        self.id.as_str()
    }

    fn type_id(&self) -> &str {
        &self.type_id
    }

    fn get(&self, property_id: &str) -> Option<&PropertyValue> {
        self.properties.get(property_id)
    }

    /// Content stream text followed by every string property value
    fn full_text(&self) -> Option<String> {
        let strings = self
            .properties
            .values()
            .flat_map(|p| p.values())
            .filter_map(|v| match v {
                Value::String(s) => Some(s.as_str()),
                _ => None,
            });
        let parts: Vec<&str> = self.content.as_deref().into_iter().chain(strings).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Objects in insertion order
pub struct InMemoryRepository {
    objects: RwLock<IndexMap<String, Arc<ContentObject>>>,
    text_matcher: TextMatcher,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(IndexMap::new()),
            text_matcher: TextMatcher::default(),
        }
    }

    pub fn with_case_sensitive_text(mut self, case_sensitive: bool) -> Self {
        self.text_matcher = TextMatcher::new(case_sensitive);
        self
    }

    /// Store an object. `cmis:objectId`, `cmis:objectTypeId` and
    /// `cmis:parentId` are filled in from the object's own fields.
    pub fn insert(&self, mut object: ContentObject) -> Result<Arc<ContentObject>> {
        let mut objects = self.objects.write();
        if objects.contains_key(object.id.as_str()) {
            return Err(Error::QueryExecutionError(format!(
                "Object '{}' already exists",
                object.id
            )));
        }

        object
            .properties
            .insert(OBJECT_ID.to_string(), PropertyValue::Single(Value::Id(object.id.0.clone())));
        object.properties.insert(
            OBJECT_TYPE_ID.to_string(),
            PropertyValue::Single(Value::Id(object.type_id.clone())),
        );
        if let Some(parent) = &object.parent_id {
            object
                .properties
                .entry(PARENT_ID.to_string())
                .or_insert_with(|| PropertyValue::Single(Value::Id(parent.0.clone())));
        }

        let object = Arc::new(object);
        objects.insert(object.id.0.clone(), object.clone());
        Ok(object)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ContentObject>> {
        self.objects.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Objects of `type_id`, and of its descendant types when
    /// `include_subtypes` is set, in insertion order.
    pub fn objects_of_type(
        &self,
        type_id: &str,
        catalog: &dyn TypeCatalog,
        include_subtypes: bool,
    ) -> Vec<Arc<ContentObject>> {
        self.objects
            .read()
            .values()
            .filter(|o| {
                o.type_id == type_id || (include_subtypes && catalog.is_subtype_of(&o.type_id, type_id))
            })
            .cloned()
            .collect()
    }
}

impl FolderHierarchy for InMemoryRepository {
    fn parent_of(&self, object_id: &str) -> Option<String> {
        self.objects
            .read()
            .get(object_id)
            .and_then(|o| o.parent_id.as_ref())
            .map(|p| p.0.clone())
    }
}

impl FullTextIndex for InMemoryRepository {
    fn match_text(&self, search: &FullTextNode, object_id: &str) -> Result<FullTextMatch> {
        let object = self
            .get(object_id)
            .ok_or_else(|| Error::ObjectNotFound(object_id.to_string()))?;
        match object.full_text() {
            Some(text) => Ok(self.text_matcher.evaluate(search, &text)?),
            None => Ok(FullTextMatch::default()),
        }
    }
}

// ============================================================================
// JSON fixtures
// ============================================================================

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    types: Vec<TypeDefinition>,
    #[serde(default)]
    objects: Vec<FixtureObject>,
}

#[derive(Debug, Deserialize)]
struct FixtureObject {
    id: String,
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    properties: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    content: Option<String>,
}

/// Load `{"types": [...], "objects": [...]}`. Property values are converted
/// with the catalog's property types; properties the type does not define
/// keep the kind their JSON value suggests.
pub fn load_fixture<P: AsRef<Path>>(path: P) -> Result<(InMemoryTypeCatalog, InMemoryRepository)> {
    let data = fs::read(path.as_ref())?;
    let fixture: FixtureFile = serde_json::from_slice(&data)?;

    let catalog = InMemoryTypeCatalog::new();
    catalog.register_all(fixture.types)?;

    let repository = InMemoryRepository::new();
    for entry in fixture.objects {
        let definition = catalog
            .lookup(&entry.type_id)
            .ok_or_else(|| Error::TypeNotFound(entry.type_id.clone()))?;

        let mut object = ContentObject::new(&entry.id, &entry.type_id);
        object.parent_id = entry.parent.as_deref().map(ObjectId::from);
        object.content = entry.content;
        for (name, json) in entry.properties {
            let property_type = definition
                .properties
                .iter()
                .find(|p| p.id == name || p.query_name == name)
                .map(|p| p.property_type);
            let value = json_to_property(&name, property_type, &json)?;
            object.properties.insert(name, value);
        }
        repository.insert(object)?;
    }

    Ok((catalog, repository))
}

fn json_to_property(
    name: &str,
    property_type: Option<PropertyType>,
    json: &serde_json::Value,
) -> Result<PropertyValue> {
    match json {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| json_to_value(name, property_type, item))
            .collect::<Result<Vec<_>>>()
            .map(PropertyValue::Multi),
        other => json_to_value(name, property_type, other).map(PropertyValue::Single),
    }
}

fn json_to_value(
    name: &str,
    property_type: Option<PropertyType>,
    json: &serde_json::Value,
) -> Result<Value> {
    use serde_json::Value as Json;

    let invalid = || {
        Error::SerializationError(format!(
            "Property '{}': cannot convert {} to {}",
            name,
            json,
            property_type.map(|t| t.as_str()).unwrap_or("a value")
        ))
    };

    let value = match (property_type, json) {
        (Some(PropertyType::Boolean), Json::Bool(b)) | (None, Json::Bool(b)) => Value::Boolean(*b),
        (Some(PropertyType::Integer), Json::Number(n)) => Value::Integer(n.as_i64().ok_or_else(invalid)?),
        (Some(PropertyType::Decimal), Json::Number(n)) => {
            Value::Decimal(Decimal::from_str(&n.to_string()).map_err(|_| invalid())?)
        }
        (Some(PropertyType::Decimal), Json::String(s)) => {
            Value::Decimal(Decimal::from_str(s).map_err(|_| invalid())?)
        }
        (Some(PropertyType::String), Json::String(s)) | (None, Json::String(s)) => Value::String(s.clone()),
        (Some(PropertyType::Id), Json::String(s)) => Value::Id(s.clone()),
        (Some(PropertyType::DateTime), Json::String(s)) => {
            Value::DateTime(parse_timestamp(s).ok_or_else(invalid)?)
        }
        (None, Json::Number(n)) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Decimal(Decimal::from_str(&n.to_string()).map_err(|_| invalid())?),
        },
        _ => return Err(invalid()),
    };
    Ok(value)
}
