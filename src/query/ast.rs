//! CMIS-QL Abstract Syntax Tree
//!
//! The statement model produced by the parser: SELECT list, FROM/JOIN
//! bindings, the WHERE predicate tree, the full-text tree nested in a
//! CONTAINS argument, and ORDER BY specs.
//!
//! Nodes are never annotated in place. Every column and function reference
//! carries a [`SelectorId`] and the binder records its resolution in a side
//! table keyed by that id.

use std::fmt;

/// Identity of a column or function reference inside one statement.
pub type SelectorId = usize;

/// Property query name that selects every property of a type.
pub const WILDCARD: &str = "*";

// ============================================================================
// Selectors
// ============================================================================

/// `[qualifier.]property` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    pub id: SelectorId,
    /// Type alias or type id, when qualified
    pub qualifier: Option<String>,
    /// Property query name or `*`
    pub property: String,
}

impl ColumnReference {
    pub fn new(id: SelectorId, qualifier: Option<&str>, property: &str) -> Self {
        Self {
            id,
            qualifier: qualifier.map(str::to_string),
            property: property.to_string(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.property == WILDCARD
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.property),
            None => f.write_str(&self.property),
        }
    }
}

/// Zero-argument function reference, e.g. `SCORE()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReference {
    pub id: SelectorId,
    pub name: String,
}

impl FunctionReference {
    pub fn new(id: SelectorId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for FunctionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Column(ColumnReference),
    Function(FunctionReference),
}

impl Selector {
    pub fn id(&self) -> SelectorId {
        match self {
            Selector::Column(c) => c.id,
            Selector::Function(f) => f.id,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Column(c) => fmt::Display::fmt(c, f),
            Selector::Function(func) => fmt::Display::fmt(func, f),
        }
    }
}

/// SELECT list entry with its optional `AS` alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub selector: Selector,
    pub alias: Option<String>,
}

/// ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub selector: Selector,
    pub ascending: bool,
}

// ============================================================================
// FROM / JOIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::LeftOuter => write!(f, "LEFT OUTER JOIN"),
        }
    }
}

/// `JOIN ... ON left = right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub left: ColumnReference,
    pub right: ColumnReference,
}

/// One type in the FROM clause. Every entry after the first carries the join
/// that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromItem {
    pub type_id: String,
    pub alias: Option<String>,
    pub join: Option<JoinSpec>,
}

impl FromItem {
    pub fn new(type_id: &str, alias: Option<&str>) -> Self {
        Self {
            type_id: type_id.to_string(),
            alias: alias.map(str::to_string),
            join: None,
        }
    }

    /// Alias this entry binds: the explicit alias, or the type id itself.
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.type_id)
    }
}

// ============================================================================
// Statement
// ============================================================================

/// A parsed `SELECT ... FROM ... [WHERE ...] [ORDER BY ...]` statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatement {
    /// Original statement text, reported with bind errors
    pub text: String,
    pub select: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<PredicateNode>,
    pub order_by: Vec<SortSpec>,
}

impl QueryStatement {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            select: Vec::new(),
            from: Vec::new(),
            where_clause: None,
            order_by: Vec::new(),
        }
    }

    /// JOIN conditions in FROM order
    pub fn joins(&self) -> impl Iterator<Item = &JoinSpec> {
        self.from.iter().filter_map(|item| item.join.as_ref())
    }
}

// ============================================================================
// WHERE predicate
// ============================================================================

/// WHERE clause node.
///
/// Comparison and membership operators hold `(left, right)` exactly as
/// written: `x = ANY prop` is `EqAny(literal, column)` while
/// `ANY prop IN (...)` is `InAny(column, list)`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateNode {
    Eq(Box<PredicateNode>, Box<PredicateNode>),
    Neq(Box<PredicateNode>, Box<PredicateNode>),
    Gt(Box<PredicateNode>, Box<PredicateNode>),
    Ge(Box<PredicateNode>, Box<PredicateNode>),
    Lt(Box<PredicateNode>, Box<PredicateNode>),
    Le(Box<PredicateNode>, Box<PredicateNode>),

    And(Box<PredicateNode>, Box<PredicateNode>),
    Or(Box<PredicateNode>, Box<PredicateNode>),
    Not(Box<PredicateNode>),

    In(Box<PredicateNode>, Box<PredicateNode>),
    NotIn(Box<PredicateNode>, Box<PredicateNode>),
    InAny(Box<PredicateNode>, Box<PredicateNode>),
    NotInAny(Box<PredicateNode>, Box<PredicateNode>),
    EqAny(Box<PredicateNode>, Box<PredicateNode>),

    IsNull(Box<PredicateNode>),
    IsNotNull(Box<PredicateNode>),

    Like(Box<PredicateNode>, Box<PredicateNode>),
    NotLike(Box<PredicateNode>, Box<PredicateNode>),

    /// `CONTAINS([qualifier,] 'full text')`
    Contains {
        qualifier: Option<String>,
        search: FullTextNode,
    },
    /// `IN_FOLDER([qualifier,] 'folder id')`. The qualifier is a `alias.*`
    /// column node.
    InFolder {
        qualifier: Option<Box<PredicateNode>>,
        folder: Box<PredicateNode>,
    },
    /// `IN_TREE([qualifier,] 'folder id')`
    InTree {
        qualifier: Option<Box<PredicateNode>>,
        folder: Box<PredicateNode>,
    },
    Score(FunctionReference),

    Column(ColumnReference),
    /// Raw literal token text, coerced lazily
    Literal(String),
    LiteralList(Vec<PredicateNode>),
}

impl PredicateNode {
    pub fn column(id: SelectorId, qualifier: Option<&str>, property: &str) -> Self {
        PredicateNode::Column(ColumnReference::new(id, qualifier, property))
    }

    pub fn literal(text: &str) -> Self {
        PredicateNode::Literal(text.to_string())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PredicateNode::Eq(..) => "EQ",
            PredicateNode::Neq(..) => "NEQ",
            PredicateNode::Gt(..) => "GT",
            PredicateNode::Ge(..) => "GE",
            PredicateNode::Lt(..) => "LT",
            PredicateNode::Le(..) => "LE",
            PredicateNode::And(..) => "AND",
            PredicateNode::Or(..) => "OR",
            PredicateNode::Not(..) => "NOT",
            PredicateNode::In(..) => "IN",
            PredicateNode::NotIn(..) => "NOT_IN",
            PredicateNode::InAny(..) => "IN_ANY",
            PredicateNode::NotInAny(..) => "NOT_IN_ANY",
            PredicateNode::EqAny(..) => "EQ_ANY",
            PredicateNode::IsNull(..) => "IS_NULL",
            PredicateNode::IsNotNull(..) => "IS_NOT_NULL",
            PredicateNode::Like(..) => "LIKE",
            PredicateNode::NotLike(..) => "NOT_LIKE",
            PredicateNode::Contains { .. } => "CONTAINS",
            PredicateNode::InFolder { .. } => "IN_FOLDER",
            PredicateNode::InTree { .. } => "IN_TREE",
            PredicateNode::Score(..) => "SCORE",
            PredicateNode::Column(..) => "COLUMN",
            PredicateNode::Literal(..) => "LITERAL",
            PredicateNode::LiteralList(..) => "LITERAL_LIST",
        }
    }

    pub fn as_column(&self) -> Option<&ColumnReference> {
        match self {
            PredicateNode::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Visit this node and every descendant in pre-order.
    pub fn for_each(&self, f: &mut dyn FnMut(&PredicateNode)) {
        f(self);
        match self {
            PredicateNode::Eq(l, r)
            | PredicateNode::Neq(l, r)
            | PredicateNode::Gt(l, r)
            | PredicateNode::Ge(l, r)
            | PredicateNode::Lt(l, r)
            | PredicateNode::Le(l, r)
            | PredicateNode::And(l, r)
            | PredicateNode::Or(l, r)
            | PredicateNode::In(l, r)
            | PredicateNode::NotIn(l, r)
            | PredicateNode::InAny(l, r)
            | PredicateNode::NotInAny(l, r)
            | PredicateNode::EqAny(l, r)
            | PredicateNode::Like(l, r)
            | PredicateNode::NotLike(l, r) => {
                l.for_each(f);
                r.for_each(f);
            }
            PredicateNode::Not(c) | PredicateNode::IsNull(c) | PredicateNode::IsNotNull(c) => {
                c.for_each(f)
            }
            PredicateNode::InFolder { qualifier, folder }
            | PredicateNode::InTree { qualifier, folder } => {
                if let Some(q) = qualifier {
                    q.for_each(f);
                }
                folder.for_each(f);
            }
            PredicateNode::LiteralList(items) => items.iter().for_each(|i| i.for_each(f)),
            PredicateNode::Contains { .. }
            | PredicateNode::Score(_)
            | PredicateNode::Column(_)
            | PredicateNode::Literal(_) => {}
        }
    }
}

// ============================================================================
// Full-text search
// ============================================================================

/// Full-text query inside a CONTAINS argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullTextNode {
    /// Implicit conjunction of juxtaposed terms
    And(Vec<FullTextNode>),
    Or(Vec<FullTextNode>),
    /// `-term`
    Minus(Box<FullTextNode>),
    /// Raw word token
    Word(String),
    /// Raw `"..."` phrase token, quotes included
    Phrase(String),
}

impl FullTextNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FullTextNode::And(_) => "AND",
            FullTextNode::Or(_) => "OR",
            FullTextNode::Minus(_) => "MINUS",
            FullTextNode::Word(_) => "WORD",
            FullTextNode::Phrase(_) => "PHRASE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_reference_display() {
        assert_eq!(ColumnReference::new(0, Some("d"), "cmis:name").to_string(), "d.cmis:name");
        assert_eq!(ColumnReference::new(1, None, "title").to_string(), "title");
        assert!(ColumnReference::new(2, Some("d"), WILDCARD).is_wildcard());
    }

    #[test]
    fn test_binding_name_defaults_to_type() {
        assert_eq!(FromItem::new("BookType", None).binding_name(), "BookType");
        assert_eq!(FromItem::new("BookType", Some("b")).binding_name(), "b");
    }

    #[test]
    fn test_for_each_visits_all_nodes() {
        let node = PredicateNode::And(
            Box::new(PredicateNode::Eq(
                Box::new(PredicateNode::column(0, None, "a")),
                Box::new(PredicateNode::literal("1")),
            )),
            Box::new(PredicateNode::Not(Box::new(PredicateNode::IsNull(Box::new(
                PredicateNode::column(1, None, "b"),
            ))))),
        );

        let mut kinds = Vec::new();
        node.for_each(&mut |n| kinds.push(n.kind_name()));
        assert_eq!(
            kinds,
            vec!["AND", "EQ", "COLUMN", "LITERAL", "NOT", "IS_NULL", "COLUMN"]
        );
    }
}
