//! cmis-query - CMIS 查询语言编译与执行引擎
//!
//! 面向内容仓库的 CMIS-QL 实现，支持：
//! - 类型目录与属性定义（含继承与内置 cmis: 类型）
//! - 语句解析、名称绑定与语义校验
//! - 谓词求值、全文检索与文件夹层级查询
//! - 基于内存仓库的查询执行与命令行工具

pub mod builtin_types;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod query;
pub mod repository;
pub mod types;

// 重导出常用类型
pub use builtin_types::BuiltinType;
pub use catalog::{InMemoryTypeCatalog, PropertyDefinition, TypeCatalog, TypeDefinition};
pub use config::EngineConfig;
pub use error::{BindError, Error, LiteralError, Result};
pub use query::{QueryExecutor, QueryResult};
pub use repository::{ContentObject, FolderHierarchy, FullTextIndex, InMemoryRepository, ObjectPropertySource};
pub use types::{Cardinality, ObjectId, PropertyType, PropertyValue, Value};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
