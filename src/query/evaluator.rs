//! Predicate evaluation
//!
//! Walks the bound WHERE tree once per candidate row. Comparison and
//! membership hooks push their result on a stack; AND, OR and NOT combine
//! the results in their `after_*` hooks, once both children have been
//! evaluated.
//!
//! An absent property fails every test except `IS NULL`.

use super::ast::*;
use super::binder::{BoundStatement, ResolvedSelector};
use super::fulltext::{FullTextMatch, TextMatcher};
use super::like::LikeMatcher;
use super::literal::decode_string_literal;
use super::walker::{literal_value, literal_values, walk_predicate, PredicateVisitor};
use crate::error::{Error, Result};
use crate::repository::{FolderHierarchy, FullTextIndex, ObjectPropertySource};
use crate::types::{PropertyValue, Value};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Compare two values of compatible kinds.
///
/// Integers and decimals compare numerically, strings and ids by ordinal
/// order, datetimes by instant and booleans with `false < true`. Any other
/// pairing is incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => {
            if let (Some(x), Some(y)) = (a.as_decimal(), b.as_decimal()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
                Some(x.cmp(y))
            } else {
                None
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Order two sort keys by the ORDER BY specs. Absent values sort first when
/// ascending; descending reverses the whole comparison.
pub fn compare_sort_keys(specs: &[SortSpec], a: &[Option<Value>], b: &[Option<Value>]) -> Ordering {
    for (spec, (x, y)) in specs.iter().zip(a.iter().zip(b.iter())) {
        let ordering = match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = if spec.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

// ============================================================================
// Rows
// ============================================================================

/// One candidate: an object (or nothing, for the outer side of a LEFT
/// OUTER JOIN) per FROM alias
#[derive(Clone, Default)]
pub struct Row<'a> {
    objects: IndexMap<String, Option<&'a dyn ObjectPropertySource>>,
}

impl<'a> Row<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row with `object` under every alias of the statement
    pub fn single(bound: &BoundStatement, object: &'a dyn ObjectPropertySource) -> Self {
        let objects = bound
            .aliases()
            .map(|alias| (alias.to_string(), Some(object)))
            .collect();
        Self { objects }
    }

    pub fn insert(&mut self, alias: &str, object: Option<&'a dyn ObjectPropertySource>) {
        self.objects.insert(alias.to_string(), object);
    }

    pub fn get(&self, alias: &str) -> Option<&'a dyn ObjectPropertySource> {
        self.objects.get(alias).copied().flatten()
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates a bound statement against candidate rows
pub struct Evaluator<'a> {
    bound: &'a BoundStatement,
    folders: &'a dyn FolderHierarchy,
    index: Option<&'a dyn FullTextIndex>,
    text_matcher: TextMatcher,
    like_patterns: HashMap<String, LikeMatcher>,
}

impl<'a> Evaluator<'a> {
    /// Prepare evaluation. LIKE patterns are compiled once here.
    pub fn new(
        bound: &'a BoundStatement,
        folders: &'a dyn FolderHierarchy,
        index: Option<&'a dyn FullTextIndex>,
    ) -> Result<Self> {
        let mut raw_patterns = Vec::new();
        if let Some(predicate) = &bound.statement.where_clause {
            predicate.for_each(&mut |node| {
                if let PredicateNode::Like(_, pattern) | PredicateNode::NotLike(_, pattern) = node {
                    if let PredicateNode::Literal(raw) = pattern.as_ref() {
                        raw_patterns.push(raw.clone());
                    }
                }
            });
        }

        let mut like_patterns = HashMap::new();
        for raw in raw_patterns {
            let pattern = decode_string_literal(&raw)?;
            let matcher = LikeMatcher::new(&pattern).map_err(|e| {
                Error::QueryExecutionError(format!("Invalid LIKE pattern '{}': {}", pattern, e))
            })?;
            like_patterns.insert(pattern, matcher);
        }

        Ok(Self {
            bound,
            folders,
            index,
            text_matcher: TextMatcher::default(),
            like_patterns,
        })
    }

    /// Case sensitivity of the built-in CONTAINS matching, used when no
    /// full-text index is configured
    pub fn with_case_sensitive_text(mut self, case_sensitive: bool) -> Self {
        self.text_matcher = TextMatcher::new(case_sensitive);
        self
    }

    pub fn bound(&self) -> &BoundStatement {
        self.bound
    }

    /// Evaluate the WHERE clause for a single-type statement
    pub fn evaluate(&self, object: &dyn ObjectPropertySource) -> Result<bool> {
        self.evaluate_row(&Row::single(self.bound, object))
    }

    pub fn evaluate_row(&self, row: &Row<'_>) -> Result<bool> {
        let Some(predicate) = &self.bound.statement.where_clause else {
            return Ok(true);
        };

        let mut visitor = RowVisitor {
            evaluator: self,
            row,
            stack: Vec::new(),
            full_text: None,
        };
        walk_predicate(&mut visitor, predicate)?;
        visitor
            .stack
            .pop()
            .ok_or_else(|| Error::QueryExecutionError("Predicate produced no result".to_string()))
    }

    /// CONTAINS result for a row; unmatched with score 0 when the statement
    /// has no CONTAINS.
    pub fn full_text_match(&self, row: &Row<'_>) -> Result<FullTextMatch> {
        let Some(clause) = &self.bound.full_text else {
            return Ok(FullTextMatch::default());
        };
        let Some(object) = row.get(&clause.alias) else {
            return Ok(FullTextMatch::default());
        };

        match self.index {
            Some(index) => index.match_text(&clause.search, object.object_id()),
            None => match object.full_text() {
                Some(text) => Ok(self.text_matcher.evaluate(&clause.search, &text)?),
                None => Ok(FullTextMatch::default()),
            },
        }
    }

    pub fn score(&self, row: &Row<'_>) -> Result<Decimal> {
        Ok(self.full_text_match(row)?.score)
    }

    /// Value of a property or SCORE() selector for a row
    pub fn selector_value(&self, id: SelectorId, row: &Row<'_>) -> Result<Option<PropertyValue>> {
        match self.bound.resolved(id) {
            Some(ResolvedSelector::Property {
                alias, property, ..
            }) => Ok(row
                .get(alias)
                .and_then(|object| object.get(&property.id))
                .cloned()),
            Some(ResolvedSelector::Score) => Ok(Some(PropertyValue::Single(Value::Decimal(
                self.score(row)?,
            )))),
            Some(ResolvedSelector::Wildcard { .. }) | None => Err(Error::QueryExecutionError(
                format!("Selector {} has no single value", id),
            )),
        }
    }

    /// ORDER BY key of a row, one entry per sort spec
    pub fn sort_key(&self, row: &Row<'_>) -> Result<Vec<Option<Value>>> {
        self.bound
            .statement
            .order_by
            .iter()
            .map(|spec| {
                self.selector_value(spec.selector.id(), row)
                    .map(|value| value.and_then(|v| v.single().cloned()))
            })
            .collect()
    }

    fn like_matcher(&self, pattern: &str) -> Result<LikeMatcher> {
        match self.like_patterns.get(pattern) {
            Some(matcher) => Ok(matcher.clone()),
            None => LikeMatcher::new(pattern).map_err(|e| {
                Error::QueryExecutionError(format!("Invalid LIKE pattern '{}': {}", pattern, e))
            }),
        }
    }
}

// ============================================================================
// Per-row visitor
// ============================================================================

struct RowVisitor<'v> {
    evaluator: &'v Evaluator<'v>,
    row: &'v Row<'v>,
    stack: Vec<bool>,
    full_text: Option<FullTextMatch>,
}

impl<'v> RowVisitor<'v> {
    fn push(&mut self, result: bool) -> Result<()> {
        self.stack.push(result);
        Ok(())
    }

    fn pop(&mut self) -> Result<bool> {
        self.stack
            .pop()
            .ok_or_else(|| Error::QueryExecutionError("Evaluation stack underflow".to_string()))
    }

    fn full_text(&mut self) -> Result<FullTextMatch> {
        if let Some(cached) = self.full_text {
            return Ok(cached);
        }
        let result = self.evaluator.full_text_match(self.row)?;
        self.full_text = Some(result);
        Ok(result)
    }

    fn property_value(&self, node: &PredicateNode) -> Option<&'v PropertyValue> {
        let column = node.as_column()?;
        let bound: &'v BoundStatement = self.evaluator.bound;
        let row: &'v Row<'v> = self.row;
        let (alias, property) = bound.property(column.id)?;
        row.get(alias)?.get(&property.id)
    }

    fn stored_values(&self, node: &PredicateNode) -> &'v [Value] {
        self.property_value(node).map(|p| p.values()).unwrap_or(&[])
    }

    fn operand_value(&mut self, node: &PredicateNode) -> Result<Option<Value>> {
        match node {
            PredicateNode::Column(column) => {
                if let Some(ResolvedSelector::Score) = self.evaluator.bound.resolved(column.id) {
                    return Ok(Some(Value::Decimal(self.full_text()?.score)));
                }
                Ok(self.property_value(node).and_then(|p| p.single()).cloned())
            }
            PredicateNode::Literal(_) => Ok(Some(literal_value(node)?)),
            PredicateNode::Score(_) => Ok(Some(Value::Decimal(self.full_text()?.score))),
            other => Err(Error::QueryExecutionError(format!(
                "{} cannot be used as a value",
                other.kind_name()
            ))),
        }
    }

    fn compare(
        &mut self,
        left: &PredicateNode,
        right: &PredicateNode,
        accept: fn(Ordering) -> bool,
        ordering: bool,
    ) -> Result<()> {
        let result = match (self.operand_value(left)?, self.operand_value(right)?) {
            (Some(Value::Boolean(_)), _) | (_, Some(Value::Boolean(_))) if ordering => false,
            (Some(a), Some(b)) => compare_values(&a, &b).map(accept).unwrap_or(false),
            _ => false,
        };
        self.push(result)
    }

    fn like(&mut self, column: &PredicateNode, pattern: &PredicateNode, negated: bool) -> Result<()> {
        let pattern = match literal_value(pattern)? {
            Value::String(p) => p,
            other => {
                return Err(Error::QueryExecutionError(format!(
                    "LIKE pattern must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        let matcher = self.evaluator.like_matcher(&pattern)?;
        let result = self
            .operand_value(column)?
            .as_ref()
            .and_then(Value::as_str)
            .map(|s| matcher.is_match(s) != negated)
            .unwrap_or(false);
        self.push(result)
    }

    fn folder_target(&self, qualifier: Option<&PredicateNode>, folder: &PredicateNode) -> Result<Option<(String, String)>> {
        let alias = qualifier
            .and_then(|q| q.as_column())
            .and_then(|c| c.qualifier.as_deref())
            .unwrap_or_else(|| self.evaluator.bound.default_alias());
        let folder_id = match literal_value(folder)? {
            Value::String(id) | Value::Id(id) => id,
            other => {
                return Err(Error::QueryExecutionError(format!(
                    "Folder id must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        Ok(self
            .row
            .get(alias)
            .map(|object| (object.object_id().to_string(), folder_id)))
    }
}

impl PredicateVisitor for RowVisitor<'_> {
    type Error = Error;

    fn on_eq(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o == Ordering::Equal, false)
    }

    fn on_neq(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o != Ordering::Equal, false)
    }

    fn on_gt(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o == Ordering::Greater, true)
    }

    fn on_ge(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o != Ordering::Less, true)
    }

    fn on_lt(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o == Ordering::Less, true)
    }

    fn on_le(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> Result<()> {
        self.compare(left, right, |o| o != Ordering::Greater, true)
    }

    fn on_and(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> Result<()> {
        Ok(())
    }

    fn after_and(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(left && right)
    }

    fn on_or(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> Result<()> {
        Ok(())
    }

    fn after_or(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(left || right)
    }

    fn on_not(&mut self, _node: &PredicateNode, _child: &PredicateNode) -> Result<()> {
        Ok(())
    }

    fn after_not(&mut self, _node: &PredicateNode, _child: &PredicateNode) -> Result<()> {
        let value = self.pop()?;
        self.push(!value)
    }

    fn on_in(&mut self, _node: &PredicateNode, column: &PredicateNode, list: &PredicateNode) -> Result<()> {
        let list = literal_values(list)?;
        let result = self
            .operand_value(column)?
            .map(|v| list.iter().any(|l| values_equal(&v, l)))
            .unwrap_or(false);
        self.push(result)
    }

    fn on_not_in(&mut self, _node: &PredicateNode, column: &PredicateNode, list: &PredicateNode) -> Result<()> {
        let list = literal_values(list)?;
        let result = self
            .operand_value(column)?
            .map(|v| !list.iter().any(|l| values_equal(&v, l)))
            .unwrap_or(false);
        self.push(result)
    }

    fn on_in_any(&mut self, _node: &PredicateNode, column: &PredicateNode, list: &PredicateNode) -> Result<()> {
        let list = literal_values(list)?;
        let result = self
            .stored_values(column)
            .iter()
            .any(|v| list.iter().any(|l| values_equal(v, l)));
        self.push(result)
    }

    fn on_not_in_any(&mut self, _node: &PredicateNode, column: &PredicateNode, list: &PredicateNode) -> Result<()> {
        let list = literal_values(list)?;
        let result = self
            .stored_values(column)
            .iter()
            .any(|v| !list.iter().any(|l| values_equal(v, l)));
        self.push(result)
    }

    fn on_eq_any(&mut self, _node: &PredicateNode, literal: &PredicateNode, column: &PredicateNode) -> Result<()> {
        let expected = literal_value(literal)?;
        let result = self
            .stored_values(column)
            .iter()
            .any(|v| values_equal(v, &expected));
        self.push(result)
    }

    fn on_is_null(&mut self, _node: &PredicateNode, column: &PredicateNode) -> Result<()> {
        let result = self.property_value(column).map(|p| p.is_empty()).unwrap_or(true);
        self.push(result)
    }

    fn on_is_not_null(&mut self, _node: &PredicateNode, column: &PredicateNode) -> Result<()> {
        let result = self.property_value(column).map(|p| !p.is_empty()).unwrap_or(false);
        self.push(result)
    }

    fn on_like(&mut self, _node: &PredicateNode, column: &PredicateNode, pattern: &PredicateNode) -> Result<()> {
        self.like(column, pattern, false)
    }

    fn on_not_like(&mut self, _node: &PredicateNode, column: &PredicateNode, pattern: &PredicateNode) -> Result<()> {
        self.like(column, pattern, true)
    }

    fn on_contains(&mut self, _node: &PredicateNode, _qualifier: Option<&str>, _search: &FullTextNode) -> Result<()> {
        let matched = self.full_text()?.matched;
        self.push(matched)
    }

    fn on_in_folder(
        &mut self,
        _node: &PredicateNode,
        qualifier: Option<&PredicateNode>,
        folder: &PredicateNode,
    ) -> Result<()> {
        let result = match self.folder_target(qualifier, folder)? {
            Some((object_id, folder_id)) => {
                self.evaluator.folders.parent_of(&object_id).as_deref() == Some(folder_id.as_str())
            }
            None => false,
        };
        self.push(result)
    }

    fn on_in_tree(
        &mut self,
        _node: &PredicateNode,
        qualifier: Option<&PredicateNode>,
        folder: &PredicateNode,
    ) -> Result<()> {
        let result = match self.folder_target(qualifier, folder)? {
            Some((object_id, folder_id)) => self
                .evaluator
                .folders
                .ancestors_of(&object_id)
                .iter()
                .any(|id| *id == folder_id),
            None => false,
        };
        self.push(result)
    }

    // Operands are read by the enclosing operator's hook.

    fn on_score(&mut self, _node: &PredicateNode, _function: &FunctionReference) -> Result<()> {
        Ok(())
    }

    fn on_column(&mut self, _node: &PredicateNode, _column: &ColumnReference) -> Result<()> {
        Ok(())
    }

    fn on_literal(&mut self, _node: &PredicateNode, _value: &Value) -> Result<()> {
        Ok(())
    }

    fn on_literal_list(&mut self, _node: &PredicateNode, _values: &[Value]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryTypeCatalog, PropertyDefinition, TypeDefinition};
    use crate::query::binder::bind;
    use crate::query::parser::parse;
    use crate::repository::{ContentObject, InMemoryRepository};
    use crate::types::PropertyType;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn catalog() -> InMemoryTypeCatalog {
        let catalog = InMemoryTypeCatalog::new();
        catalog
            .register(
                TypeDefinition::new("TestType", Some("cmis:document"))
                    .with_property(PropertyDefinition::new("intProp", PropertyType::Integer))
                    .with_property(PropertyDefinition::new("decProp", PropertyType::Decimal))
                    .with_property(PropertyDefinition::new("stringProp", PropertyType::String))
                    .with_property(PropertyDefinition::new("boolProp", PropertyType::Boolean))
                    .with_property(PropertyDefinition::new("dateProp", PropertyType::DateTime))
                    .with_property(PropertyDefinition::multi("tags", PropertyType::String)),
            )
            .unwrap();
        catalog
    }

    fn sample() -> ContentObject {
        ContentObject::new("o1", "TestType")
            .with_property("intProp", 50i64)
            .with_property("decProp", Decimal::from_str("2.5").unwrap())
            .with_property("stringProp", "ABCDEF")
            .with_property("boolProp", true)
            .with_property("dateProp", Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
            .with_property(
                "tags",
                PropertyValue::Multi(vec![Value::from("red"), Value::from("green")]),
            )
            .with_content("annual report on widgets")
    }

    fn evaluates(query: &str, object: &ContentObject) -> bool {
        let catalog = catalog();
        let repo = InMemoryRepository::new();
        let bound = bind(&parse(query).unwrap(), &catalog).unwrap();
        let evaluator = Evaluator::new(&bound, &repo, None).unwrap();
        evaluator.evaluate(object).unwrap()
    }

    fn check(predicate: &str) -> bool {
        evaluates(&format!("SELECT * FROM TestType WHERE {}", predicate), &sample())
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(
            compare_values(&Value::Integer(2), &Value::Decimal(Decimal::from_str("2.0").unwrap())),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&Value::from("abc"), &Value::Id("abd".into())),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&Value::from("1"), &Value::Integer(1)), None);
        assert_eq!(
            compare_values(&Value::Boolean(false), &Value::Boolean(true)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(check("intProp = 50"));
        assert!(check("intProp <> 100"));
        assert!(check("intProp > -50"));
        assert!(check("intProp >= 50"));
        assert!(!check("intProp < 50"));
        assert!(check("intProp <= 50.0"));
        assert!(check("decProp > 2"));
        assert!(check("decProp = 2.50"));
    }

    #[test]
    fn test_string_and_date_comparisons() {
        assert!(check("stringProp = 'ABCDEF'"));
        assert!(check("stringProp > 'ABC'"));
        assert!(check("dateProp > TIMESTAMP '2024-01-01T00:00:00Z'"));
        assert!(!check("dateProp < TIMESTAMP '2024-01-01T00:00:00Z'"));
    }

    #[test]
    fn test_mismatched_kinds_do_not_match() {
        assert!(!check("intProp = '50'"));
        assert!(!check("intProp <> '50'"));
    }

    #[test]
    fn test_boolean_connectives() {
        assert!(check("intProp = 50 AND boolProp = true"));
        assert!(!check("intProp = 50 AND boolProp = false"));
        assert!(check("intProp = 1 OR boolProp = true"));
        assert!(check("NOT intProp = 1"));
        assert!(!check("NOT (intProp = 50 OR intProp = 1)"));
    }

    #[test]
    fn test_membership() {
        assert!(check("intProp IN (10, 50)"));
        assert!(!check("intProp NOT IN (10, 50)"));
        assert!(check("'red' = ANY tags"));
        assert!(!check("'blue' = ANY tags"));
        assert!(check("ANY tags IN ('blue', 'green')"));
        assert!(!check("ANY tags IN ('blue', 'white')"));
        assert!(check("ANY tags NOT IN ('red')"));
        assert!(!check("ANY tags NOT IN ('red', 'green')"));
    }

    #[test]
    fn test_null_checks() {
        let bare = ContentObject::new("o2", "TestType");
        let query = "SELECT * FROM TestType WHERE intProp IS NULL";
        assert!(evaluates(query, &bare));
        assert!(!evaluates(query, &sample()));
        assert!(check("tags IS NOT NULL"));

        let empty = ContentObject::new("o3", "TestType").with_property("tags", PropertyValue::Multi(Vec::new()));
        assert!(evaluates("SELECT * FROM TestType WHERE tags IS NULL", &empty));
    }

    #[test]
    fn test_absent_values_fail_comparisons() {
        let bare = ContentObject::new("o2", "TestType");
        for predicate in [
            "intProp = 1",
            "intProp <> 1",
            "intProp NOT IN (1)",
            "stringProp LIKE '%'",
            "stringProp NOT LIKE 'x'",
            "ANY tags NOT IN ('x')",
        ] {
            let query = format!("SELECT * FROM TestType WHERE {}", predicate);
            assert!(!evaluates(&query, &bare), "{} matched an empty object", predicate);
        }
    }

    #[test]
    fn test_like() {
        assert!(check("stringProp LIKE 'ABC%'"));
        assert!(!check("stringProp LIKE '%ABC'"));
        assert!(check("stringProp LIKE 'ABC_EF'"));
        assert!(check("stringProp NOT LIKE 'XYZ%'"));
    }

    #[test]
    fn test_contains_and_score() {
        let catalog = catalog();
        let repo = InMemoryRepository::new();
        let bound = bind(
            &parse("SELECT SCORE() FROM TestType WHERE CONTAINS('widgets -gadgets')").unwrap(),
            &catalog,
        )
        .unwrap();
        let evaluator = Evaluator::new(&bound, &repo, None).unwrap();
        let object = sample();
        let row = Row::single(&bound, &object);

        assert!(evaluator.evaluate_row(&row).unwrap());
        assert_eq!(evaluator.score(&row).unwrap(), Decimal::ONE);
        assert_eq!(
            evaluator.selector_value(0, &row).unwrap(),
            Some(PropertyValue::Single(Value::Decimal(Decimal::ONE)))
        );

        assert!(check("CONTAINS('\"annual report\"')"));
        assert!(!check("CONTAINS('report -widgets')"));
        assert!(check("CONTAINS('REPORT')"));
    }

    #[test]
    fn test_folder_predicates() {
        let catalog = catalog();
        let repo = InMemoryRepository::new();
        repo.insert(ContentObject::new("root", "cmis:folder")).unwrap();
        repo.insert(ContentObject::new("f1", "cmis:folder").with_parent("root"))
            .unwrap();
        let object = repo.insert(sample().with_parent("f1")).unwrap();

        let run = |query: &str| {
            let bound = bind(&parse(query).unwrap(), &catalog).unwrap();
            let evaluator = Evaluator::new(&bound, &repo, None).unwrap();
            evaluator.evaluate(object.as_ref()).unwrap()
        };

        assert!(run("SELECT * FROM TestType WHERE IN_FOLDER('f1')"));
        assert!(!run("SELECT * FROM TestType WHERE IN_FOLDER('root')"));
        assert!(run("SELECT * FROM TestType t WHERE IN_TREE(t, 'root')"));
        assert!(!run("SELECT * FROM TestType WHERE IN_TREE('elsewhere')"));
    }

    #[test]
    fn test_sort_keys() {
        let catalog = catalog();
        let repo = InMemoryRepository::new();
        let bound = bind(
            &parse("SELECT * FROM TestType ORDER BY boolProp, intProp DESC").unwrap(),
            &catalog,
        )
        .unwrap();
        let evaluator = Evaluator::new(&bound, &repo, None).unwrap();

        let object = sample();
        let key = evaluator.sort_key(&Row::single(&bound, &object)).unwrap();
        assert_eq!(key, vec![Some(Value::Boolean(true)), Some(Value::Integer(50))]);

        let specs = &bound.statement.order_by;
        let absent = vec![None, Some(Value::Integer(1))];
        assert_eq!(compare_sort_keys(specs, &absent, &key), Ordering::Less);

        let higher = vec![Some(Value::Boolean(true)), Some(Value::Integer(60))];
        assert_eq!(compare_sort_keys(specs, &higher, &key), Ordering::Less);
    }
}
