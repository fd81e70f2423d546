//! 错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("绑定错误: {source} (语句: {statement})")]
    Bind {
        statement: String,
        #[source]
        source: BindError,
    },

    #[error("无法识别的字面量: {0}")]
    MalformedLiteral(#[from] LiteralError),

    #[error("查询执行错误: {0}")]
    QueryExecutionError(String),

    #[error("类型不存在: {0}")]
    TypeNotFound(String),

    #[error("对象不存在: {0}")]
    ObjectNotFound(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// 名称与类型绑定错误，遇到第一个错误即中止整条语句
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{clause} 子句中别名重复: '{alias}'")]
    DuplicateAlias { clause: &'static str, alias: String },

    #[error("未知的类型或别名: '{0}'")]
    UnknownType(String),

    #[error("{scope} 中不存在属性 '{property}'")]
    UnknownProperty { property: String, scope: String },

    #[error(
        "属性 '{property}' 不唯一 (出现在 {})，请用类型或别名限定",
        .types.join(", ")
    )]
    AmbiguousProperty { property: String, types: Vec<String> },

    #[error("ANY 只能用于多值属性，'{0}' 是单值属性")]
    InvalidQuantifier(String),

    #[error("属性 '{0}' 是多值属性，只能通过 ANY 查询")]
    QuantifierRequired(String),

    #[error("运算符 {operator} 不能比较布尔值的大小 ({property})")]
    InvalidComparison { operator: &'static str, property: String },

    #[error("属性 '{0}' 不可查询")]
    NotQueryable(String),

    #[error("属性 '{0}' 不可排序")]
    NotOrderable(String),

    #[error(transparent)]
    MalformedLiteral(#[from] LiteralError),

    #[error("不支持的函数: '{0}'")]
    UnsupportedFunction(String),

    #[error("无效的语句: {0}")]
    InvalidStatement(String),
}

/// 无法转换为任何受支持类型的字面量
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{text} ({reason})")]
pub struct LiteralError {
    pub text: String,
    pub reason: String,
}

impl LiteralError {
    pub fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::Bind {
            statement: "SELECT * FROM Nope".into(),
            source: BindError::UnknownType("Nope".into()),
        };
        assert_eq!(
            err.to_string(),
            "绑定错误: 未知的类型或别名: 'Nope' (语句: SELECT * FROM Nope)"
        );

        let err = Error::from(LiteralError::new("TIMESTAMP 'x'", "bad timestamp"));
        assert_eq!(err.to_string(), "无法识别的字面量: TIMESTAMP 'x' (bad timestamp)");
        assert_eq!(
            BindError::from(LiteralError::new("1e", "bad number")).to_string(),
            "1e (bad number)"
        );
    }
}
