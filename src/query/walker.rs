//! Predicate and full-text tree walker
//!
//! The walker owns traversal order; consumers (binder, evaluator, tests)
//! implement one hook per node kind. Hook order per kind:
//!
//! - comparisons, membership, LIKE: descend left, hook, descend right
//! - `AND` / `OR`: `before_*`, descend left, hook, descend right, `after_*`
//! - `NOT`: `before_not`, hook, descend child, `after_not`
//! - `IS [NOT] NULL`, `SCORE`: hook only
//! - `IN_FOLDER` / `IN_TREE`: without a qualifier the hook gets `None` and the
//!   folder node, then the folder node is descended; with a qualifier the
//!   qualifier is descended first, then the hook, then the folder node
//! - `CONTAINS`: hook only, the consumer walks the full-text tree itself
//! - literals reach their hook already decoded
//!
//! Full-text `AND` / `OR`: `before_*`, descend every child, hook, `after_*`.
//! `MINUS` is a hook on the negated leaf with no separate descent.

use super::ast::{ColumnReference, FullTextNode, FunctionReference, PredicateNode};
use super::literal::{coerce_literal, decode_fulltext_literal};
use crate::error::LiteralError;
use crate::types::Value;

type Node = PredicateNode;

/// Hooks for [`walk_predicate`]. Structural hooks have no default so that a
/// new node kind cannot be silently ignored by any consumer.
pub trait PredicateVisitor {
    type Error: From<LiteralError>;

    fn on_eq(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn on_neq(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn on_gt(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn on_ge(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn on_lt(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn on_le(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;

    fn before_and(&mut self, _node: &Node, _left: &Node, _right: &Node) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_and(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn after_and(&mut self, _node: &Node, _left: &Node, _right: &Node) -> Result<(), Self::Error> {
        Ok(())
    }

    fn before_or(&mut self, _node: &Node, _left: &Node, _right: &Node) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_or(&mut self, node: &Node, left: &Node, right: &Node) -> Result<(), Self::Error>;
    fn after_or(&mut self, _node: &Node, _left: &Node, _right: &Node) -> Result<(), Self::Error> {
        Ok(())
    }

    fn before_not(&mut self, _node: &Node, _child: &Node) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_not(&mut self, node: &Node, child: &Node) -> Result<(), Self::Error>;
    fn after_not(&mut self, _node: &Node, _child: &Node) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_in(&mut self, node: &Node, column: &Node, list: &Node) -> Result<(), Self::Error>;
    fn on_not_in(&mut self, node: &Node, column: &Node, list: &Node) -> Result<(), Self::Error>;
    fn on_in_any(&mut self, node: &Node, column: &Node, list: &Node) -> Result<(), Self::Error>;
    fn on_not_in_any(&mut self, node: &Node, column: &Node, list: &Node) -> Result<(), Self::Error>;
    fn on_eq_any(&mut self, node: &Node, literal: &Node, column: &Node) -> Result<(), Self::Error>;

    fn on_is_null(&mut self, node: &Node, column: &Node) -> Result<(), Self::Error>;
    fn on_is_not_null(&mut self, node: &Node, column: &Node) -> Result<(), Self::Error>;

    fn on_like(&mut self, node: &Node, column: &Node, pattern: &Node) -> Result<(), Self::Error>;
    fn on_not_like(&mut self, node: &Node, column: &Node, pattern: &Node) -> Result<(), Self::Error>;

    fn on_contains(
        &mut self,
        node: &Node,
        qualifier: Option<&str>,
        search: &FullTextNode,
    ) -> Result<(), Self::Error>;
    fn on_in_folder(
        &mut self,
        node: &Node,
        qualifier: Option<&Node>,
        folder: &Node,
    ) -> Result<(), Self::Error>;
    fn on_in_tree(
        &mut self,
        node: &Node,
        qualifier: Option<&Node>,
        folder: &Node,
    ) -> Result<(), Self::Error>;
    fn on_score(&mut self, node: &Node, function: &FunctionReference) -> Result<(), Self::Error>;

    fn on_column(&mut self, node: &Node, column: &ColumnReference) -> Result<(), Self::Error>;
    fn on_literal(&mut self, node: &Node, value: &Value) -> Result<(), Self::Error>;
    fn on_literal_list(&mut self, node: &Node, values: &[Value]) -> Result<(), Self::Error>;
}

/// Walk a predicate tree, calling `visitor`'s hooks in the documented order.
pub fn walk_predicate<V>(visitor: &mut V, node: &Node) -> Result<(), V::Error>
where
    V: PredicateVisitor,
{
    match node {
        Node::Eq(l, r) => in_order(visitor, node, l, r, V::on_eq),
        Node::Neq(l, r) => in_order(visitor, node, l, r, V::on_neq),
        Node::Gt(l, r) => in_order(visitor, node, l, r, V::on_gt),
        Node::Ge(l, r) => in_order(visitor, node, l, r, V::on_ge),
        Node::Lt(l, r) => in_order(visitor, node, l, r, V::on_lt),
        Node::Le(l, r) => in_order(visitor, node, l, r, V::on_le),
        Node::In(l, r) => in_order(visitor, node, l, r, V::on_in),
        Node::NotIn(l, r) => in_order(visitor, node, l, r, V::on_not_in),
        Node::InAny(l, r) => in_order(visitor, node, l, r, V::on_in_any),
        Node::NotInAny(l, r) => in_order(visitor, node, l, r, V::on_not_in_any),
        Node::EqAny(l, r) => in_order(visitor, node, l, r, V::on_eq_any),
        Node::Like(l, r) => in_order(visitor, node, l, r, V::on_like),
        Node::NotLike(l, r) => in_order(visitor, node, l, r, V::on_not_like),

        Node::And(l, r) => {
            visitor.before_and(node, l, r)?;
            walk_predicate(visitor, l)?;
            visitor.on_and(node, l, r)?;
            walk_predicate(visitor, r)?;
            visitor.after_and(node, l, r)
        }
        Node::Or(l, r) => {
            visitor.before_or(node, l, r)?;
            walk_predicate(visitor, l)?;
            visitor.on_or(node, l, r)?;
            walk_predicate(visitor, r)?;
            visitor.after_or(node, l, r)
        }
        Node::Not(child) => {
            visitor.before_not(node, child)?;
            visitor.on_not(node, child)?;
            walk_predicate(visitor, child)?;
            visitor.after_not(node, child)
        }

        Node::IsNull(child) => visitor.on_is_null(node, child),
        Node::IsNotNull(child) => visitor.on_is_not_null(node, child),
        Node::Score(function) => visitor.on_score(node, function),

        Node::InFolder { qualifier, folder } => {
            walk_folder(visitor, node, qualifier.as_deref(), folder, V::on_in_folder)
        }
        Node::InTree { qualifier, folder } => {
            walk_folder(visitor, node, qualifier.as_deref(), folder, V::on_in_tree)
        }
        Node::Contains { qualifier, search } => {
            visitor.on_contains(node, qualifier.as_deref(), search)
        }

        Node::Column(column) => visitor.on_column(node, column),
        Node::Literal(_) => {
            let value = literal_value(node)?;
            visitor.on_literal(node, &value)
        }
        Node::LiteralList(_) => {
            let values = literal_values(node)?;
            visitor.on_literal_list(node, &values)
        }
    }
}

type BinaryHook<V> =
    fn(&mut V, &Node, &Node, &Node) -> Result<(), <V as PredicateVisitor>::Error>;
type FolderHook<V> =
    fn(&mut V, &Node, Option<&Node>, &Node) -> Result<(), <V as PredicateVisitor>::Error>;

fn in_order<V>(
    visitor: &mut V,
    node: &Node,
    left: &Node,
    right: &Node,
    hook: BinaryHook<V>,
) -> Result<(), V::Error>
where
    V: PredicateVisitor,
{
    walk_predicate(visitor, left)?;
    hook(visitor, node, left, right)?;
    walk_predicate(visitor, right)
}

fn walk_folder<V>(
    visitor: &mut V,
    node: &Node,
    qualifier: Option<&Node>,
    folder: &Node,
    hook: FolderHook<V>,
) -> Result<(), V::Error>
where
    V: PredicateVisitor,
{
    match qualifier {
        None => {
            hook(visitor, node, None, folder)?;
            walk_predicate(visitor, folder)
        }
        Some(q) => {
            walk_predicate(visitor, q)?;
            hook(visitor, node, Some(q), folder)?;
            walk_predicate(visitor, folder)
        }
    }
}

/// Decode a literal node into its typed value.
pub fn literal_value(node: &Node) -> Result<Value, LiteralError> {
    match node {
        Node::Literal(text) => coerce_literal(text),
        other => Err(LiteralError::new(other.kind_name(), "expected a literal")),
    }
}

/// Decode a literal list, or a single literal as a one-element list.
pub fn literal_values(node: &Node) -> Result<Vec<Value>, LiteralError> {
    match node {
        Node::LiteralList(items) => items.iter().map(literal_value).collect(),
        other => literal_value(other).map(|v| vec![v]),
    }
}

// ============================================================================
// Full-text
// ============================================================================

/// Hooks for [`walk_fulltext`]
pub trait FullTextVisitor {
    type Error: From<LiteralError>;

    fn before_and(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_and(&mut self, node: &FullTextNode, children: &[FullTextNode]) -> Result<(), Self::Error>;
    fn after_and(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn before_or(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_or(&mut self, node: &FullTextNode, children: &[FullTextNode]) -> Result<(), Self::Error>;
    fn after_or(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_minus(&mut self, node: &FullTextNode, child: &FullTextNode) -> Result<(), Self::Error>;
    fn on_word(&mut self, node: &FullTextNode, text: &str) -> Result<(), Self::Error>;
    fn on_phrase(&mut self, node: &FullTextNode, text: &str) -> Result<(), Self::Error>;
}

pub fn walk_fulltext<V>(visitor: &mut V, node: &FullTextNode) -> Result<(), V::Error>
where
    V: FullTextVisitor,
{
    match node {
        FullTextNode::And(children) => {
            visitor.before_and(node, children)?;
            for child in children {
                walk_fulltext(visitor, child)?;
            }
            visitor.on_and(node, children)?;
            visitor.after_and(node, children)
        }
        FullTextNode::Or(children) => {
            visitor.before_or(node, children)?;
            for child in children {
                walk_fulltext(visitor, child)?;
            }
            visitor.on_or(node, children)?;
            visitor.after_or(node, children)
        }
        FullTextNode::Minus(child) => visitor.on_minus(node, child),
        FullTextNode::Word(raw) => {
            let text = decode_fulltext_literal(raw)?;
            visitor.on_word(node, &text)
        }
        FullTextNode::Phrase(raw) => {
            let text = decode_fulltext_literal(raw)?;
            visitor.on_phrase(node, &text)
        }
    }
}

/// Decoded text of a WORD or PHRASE leaf
pub fn fulltext_text(node: &FullTextNode) -> Result<String, LiteralError> {
    match node {
        FullTextNode::Word(raw) | FullTextNode::Phrase(raw) => decode_fulltext_literal(raw),
        other => Err(LiteralError::new(other.kind_name(), "expected a word or phrase")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every hook call as a short string.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Recorder {
        fn push(&mut self, call: impl Into<String>) -> Result<(), LiteralError> {
            self.calls.push(call.into());
            Ok(())
        }
    }

    impl PredicateVisitor for Recorder {
        type Error = LiteralError;

        fn on_eq(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("eq")
        }
        fn on_neq(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("neq")
        }
        fn on_gt(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("gt")
        }
        fn on_ge(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("ge")
        }
        fn on_lt(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("lt")
        }
        fn on_le(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("le")
        }
        fn before_and(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("before_and")
        }
        fn on_and(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("and")
        }
        fn after_and(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("after_and")
        }
        fn on_or(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("or")
        }
        fn before_not(&mut self, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("before_not")
        }
        fn on_not(&mut self, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("not")
        }
        fn after_not(&mut self, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("after_not")
        }
        fn on_in(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("in")
        }
        fn on_not_in(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("not_in")
        }
        fn on_in_any(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("in_any")
        }
        fn on_not_in_any(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("not_in_any")
        }
        fn on_eq_any(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("eq_any")
        }
        fn on_is_null(&mut self, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("is_null")
        }
        fn on_is_not_null(&mut self, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("is_not_null")
        }
        fn on_like(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("like")
        }
        fn on_not_like(&mut self, _: &Node, _: &Node, _: &Node) -> Result<(), LiteralError> {
            self.push("not_like")
        }
        fn on_contains(&mut self, _: &Node, q: Option<&str>, _: &FullTextNode) -> Result<(), LiteralError> {
            self.push(format!("contains({})", q.unwrap_or("-")))
        }
        fn on_in_folder(&mut self, _: &Node, q: Option<&Node>, _: &Node) -> Result<(), LiteralError> {
            self.push(format!("in_folder({})", q.is_some()))
        }
        fn on_in_tree(&mut self, _: &Node, q: Option<&Node>, _: &Node) -> Result<(), LiteralError> {
            self.push(format!("in_tree({})", q.is_some()))
        }
        fn on_score(&mut self, _: &Node, _: &FunctionReference) -> Result<(), LiteralError> {
            self.push("score")
        }
        fn on_column(&mut self, _: &Node, column: &ColumnReference) -> Result<(), LiteralError> {
            self.push(format!("col:{}", column))
        }
        fn on_literal(&mut self, _: &Node, value: &Value) -> Result<(), LiteralError> {
            self.push(format!("lit:{}", value))
        }
        fn on_literal_list(&mut self, _: &Node, values: &[Value]) -> Result<(), LiteralError> {
            self.push(format!("list:{}", values.len()))
        }
    }

    impl FullTextVisitor for Recorder {
        type Error = LiteralError;

        fn before_and(&mut self, _: &FullTextNode, c: &[FullTextNode]) -> Result<(), LiteralError> {
            self.push(format!("before_and:{}", c.len()))
        }
        fn on_and(&mut self, _: &FullTextNode, c: &[FullTextNode]) -> Result<(), LiteralError> {
            self.push(format!("and:{}", c.len()))
        }
        fn on_or(&mut self, _: &FullTextNode, c: &[FullTextNode]) -> Result<(), LiteralError> {
            self.push(format!("or:{}", c.len()))
        }
        fn on_minus(&mut self, _: &FullTextNode, child: &FullTextNode) -> Result<(), LiteralError> {
            let text = fulltext_text(child)?;
            self.push(format!("minus:{}", text))
        }
        fn on_word(&mut self, _: &FullTextNode, text: &str) -> Result<(), LiteralError> {
            self.push(format!("word:{}", text))
        }
        fn on_phrase(&mut self, _: &FullTextNode, text: &str) -> Result<(), LiteralError> {
            self.push(format!("phrase:{}", text))
        }
    }

    fn col(id: usize, name: &str) -> Box<Node> {
        Box::new(Node::column(id, None, name))
    }

    fn lit(text: &str) -> Box<Node> {
        Box::new(Node::literal(text))
    }

    fn record(node: &Node) -> Vec<String> {
        let mut recorder = Recorder::default();
        walk_predicate(&mut recorder, node).unwrap();
        recorder.calls
    }

    #[test]
    fn test_comparison_hook_fires_between_children() {
        let node = Node::Eq(col(0, "intProp"), lit("50"));
        assert_eq!(record(&node), vec!["col:intProp", "eq", "lit:50"]);
    }

    #[test]
    fn test_boolean_connectives_order() {
        let node = Node::And(
            Box::new(Node::Lt(col(0, "a"), lit("1"))),
            Box::new(Node::Not(Box::new(Node::IsNull(col(1, "b"))))),
        );
        assert_eq!(
            record(&node),
            vec![
                "before_and",
                "col:a",
                "lt",
                "lit:1",
                "and",
                "before_not",
                "not",
                "is_null",
                "after_not",
                "after_and",
            ]
        );
    }

    #[test]
    fn test_any_forms_and_lists() {
        let eq_any = Node::EqAny(lit("'x'"), col(0, "tags"));
        assert_eq!(record(&eq_any), vec!["lit:x", "eq_any", "col:tags"]);

        let in_any = Node::InAny(
            col(0, "tags"),
            Box::new(Node::LiteralList(vec![Node::literal("'a'"), Node::literal("'b'")])),
        );
        assert_eq!(record(&in_any), vec!["col:tags", "in_any", "list:2"]);
    }

    #[test]
    fn test_folder_predicates() {
        let plain = Node::InFolder {
            qualifier: None,
            folder: lit("'f1'"),
        };
        assert_eq!(record(&plain), vec!["in_folder(false)", "lit:f1"]);

        let qualified = Node::InTree {
            qualifier: Some(Box::new(Node::column(0, Some("d"), "*"))),
            folder: lit("'f1'"),
        };
        assert_eq!(record(&qualified), vec!["col:d.*", "in_tree(true)", "lit:f1"]);
    }

    #[test]
    fn test_unary_functions_do_not_descend() {
        let score = Node::Gt(
            Box::new(Node::Score(FunctionReference::new(0, "SCORE"))),
            lit("0.5"),
        );
        assert_eq!(record(&score), vec!["score", "gt", "lit:0.5"]);

        let contains = Node::Contains {
            qualifier: Some("d".into()),
            search: FullTextNode::Word("x".into()),
        };
        assert_eq!(record(&contains), vec!["contains(d)"]);
    }

    #[test]
    fn test_malformed_literal_is_reported() {
        let node = Node::Eq(col(0, "a"), lit("'unterminated"));
        let mut recorder = Recorder::default();
        let err = walk_predicate(&mut recorder, &node).unwrap_err();
        assert_eq!(err.text, "'unterminated");
        assert_eq!(recorder.calls, vec!["col:a", "eq"]);
    }

    #[test]
    fn test_fulltext_order() {
        let node = FullTextNode::And(vec![
            FullTextNode::Word("alpha".into()),
            FullTextNode::Or(vec![
                FullTextNode::Phrase("\"beta gamma\"".into()),
                FullTextNode::Word("delta".into()),
            ]),
            FullTextNode::Minus(Box::new(FullTextNode::Word("omega".into()))),
        ]);
        let mut recorder = Recorder::default();
        walk_fulltext(&mut recorder, &node).unwrap();
        assert_eq!(
            recorder.calls,
            vec![
                "before_and:3",
                "word:alpha",
                "phrase:beta gamma",
                "word:delta",
                "or:2",
                "minus:omega",
                "and:3",
            ]
        );
    }
}
