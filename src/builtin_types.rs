//! 内置类型系统
//!
//! 定义 CMIS 的两个基础类型 `cmis:document` 与 `cmis:folder`，
//! 用户类型通过 parent 继承它们的属性。

use crate::catalog::{PropertyDefinition, TypeDefinition};
use crate::types::{Cardinality, PropertyType};

/// 内置类型前缀
pub const BUILTIN_PREFIX: &str = "cmis:";

pub const OBJECT_ID: &str = "cmis:objectId";
pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
pub const BASE_TYPE_ID: &str = "cmis:baseTypeId";
pub const NAME: &str = "cmis:name";
pub const PARENT_ID: &str = "cmis:parentId";

/// 内置基础类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// cmis:document - 带内容流的文档
    Document,
    /// cmis:folder - 文件夹
    Folder,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 2] = [BuiltinType::Document, BuiltinType::Folder];

    /// 获取内置类型 ID
    pub fn id(&self) -> &'static str {
        match self {
            BuiltinType::Document => "cmis:document",
            BuiltinType::Folder => "cmis:folder",
        }
    }

    /// 从 ID 解析内置类型
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "cmis:document" => Some(BuiltinType::Document),
            "cmis:folder" => Some(BuiltinType::Folder),
            _ => None,
        }
    }

    pub fn is_builtin(id: &str) -> bool {
        Self::from_id(id).is_some()
    }

    /// 获取属性定义
    pub fn properties(&self) -> Vec<PropertyDefinition> {
        let mut props = vec![
            prop(OBJECT_ID, PropertyType::Id),
            prop(OBJECT_TYPE_ID, PropertyType::Id),
            prop(BASE_TYPE_ID, PropertyType::Id),
            prop(NAME, PropertyType::String),
            prop("cmis:createdBy", PropertyType::String),
            prop("cmis:creationDate", PropertyType::DateTime),
            prop("cmis:lastModifiedBy", PropertyType::String),
            prop("cmis:lastModificationDate", PropertyType::DateTime),
            PropertyDefinition {
                cardinality: Cardinality::Multi,
                orderable: false,
                ..prop("cmis:secondaryObjectTypeIds", PropertyType::Id)
            },
        ];

        match self {
            BuiltinType::Document => props.extend([
                prop("cmis:isLatestVersion", PropertyType::Boolean),
                prop("cmis:versionLabel", PropertyType::String),
                prop("cmis:contentStreamLength", PropertyType::Integer),
                prop("cmis:contentStreamMimeType", PropertyType::String),
                prop("cmis:contentStreamFileName", PropertyType::String),
            ]),
            BuiltinType::Folder => props.extend([
                prop(PARENT_ID, PropertyType::Id),
                prop("cmis:path", PropertyType::String),
            ]),
        }
        props
    }

    /// 构建类型定义
    pub fn definition(&self) -> TypeDefinition {
        TypeDefinition {
            id: self.id().to_string(),
            parent_id: None,
            queryable: true,
            fulltext_indexed: matches!(self, BuiltinType::Document),
            properties: self.properties(),
        }
    }
}

fn prop(id: &str, property_type: PropertyType) -> PropertyDefinition {
    PropertyDefinition::new(id, property_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(BuiltinType::from_id("cmis:folder"), Some(BuiltinType::Folder));
        assert!(BuiltinType::is_builtin("cmis:document"));
        assert!(!BuiltinType::is_builtin("BookType"));
    }

    #[test]
    fn test_builtin_properties() {
        let doc = BuiltinType::Document.definition();
        assert!(doc.property(NAME).is_some());
        assert!(doc.property(PARENT_ID).is_none());
        assert!(doc.fulltext_indexed);

        let folder = BuiltinType::Folder.definition();
        assert!(folder.property(PARENT_ID).is_some());

        let secondary = doc.property("cmis:secondaryObjectTypeIds").unwrap();
        assert_eq!(secondary.cardinality, Cardinality::Multi);
        assert!(!secondary.orderable);
    }
}
