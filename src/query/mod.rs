//! CMIS-QL 查询模块
//!
//! 解析、绑定并执行 CMIS 查询语句
//!
//! 主要特性:
//! - SELECT / FROM / JOIN / WHERE / ORDER BY
//! - 比较、IN、LIKE、IS NULL 以及多值属性的 ANY 量词
//! - CONTAINS 全文检索与 SCORE()
//! - IN_FOLDER / IN_TREE 文件夹谓词
//! - 谓词树的访问者遍历

mod ast;
mod binder;
mod evaluator;
mod executor;
mod fulltext;
mod like;
mod literal;
mod parser;
mod walker;

// 导出 AST 类型
pub use ast::{
    ColumnReference,
    FromItem,
    // 全文检索
    FullTextNode,
    FunctionReference,
    JoinKind,
    JoinSpec,
    // WHERE 谓词
    PredicateNode,
    // 顶级语句
    QueryStatement,
    SelectItem,
    Selector,
    SelectorId,
    SortSpec,
    WILDCARD,
};

// 导出遍历器
pub use walker::{
    fulltext_text, literal_value, literal_values, walk_fulltext, walk_predicate, FullTextVisitor,
    PredicateVisitor,
};

// 导出字面量与模式工具
pub use fulltext::{FullTextMatch, TextMatcher};
pub use like::{translate_pattern, LikeMatcher};
pub use literal::{coerce_literal, decode_fulltext_literal, decode_string_literal, parse_timestamp};

// 导出绑定器与求值器
pub use binder::{bind, Binder, BoundStatement, FullTextClause, ResolvedSelector};
pub use evaluator::{compare_sort_keys, compare_values, Evaluator, Row};

// 导出执行器
pub use executor::{QueryExecutor, QueryResult, QueryStats, ResultValue};

// 导出解析器
pub use parser::{parse, QueryParser};
