//! Name and type resolution
//!
//! Binds a parsed [`QueryStatement`] against a [`TypeCatalog`]. FROM types are
//! bound to aliases first, then every selector in SELECT, JOIN ON, WHERE and
//! ORDER BY is resolved. Results go into a side table keyed by
//! [`SelectorId`]; the parsed statement is never modified.
//!
//! Binding is all-or-nothing: the first error aborts the statement.

use super::ast::*;
use super::walker::{literal_value, walk_fulltext, walk_predicate, FullTextVisitor, PredicateVisitor};
use crate::catalog::{PropertyDefinition, TypeCatalog, TypeDefinition};
use crate::error::{BindError, Error, Result};
use crate::types::{PropertyType, Value};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a selector resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSelector {
    /// A property of the type bound to `alias`
    Property {
        alias: String,
        type_id: String,
        property: PropertyDefinition,
    },
    /// `*` or `alias.*`: every property of the listed aliases
    Wildcard { aliases: Vec<String> },
    /// `SCORE()`
    Score,
}

/// The single CONTAINS of a statement and the alias it searches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTextClause {
    pub alias: String,
    pub search: FullTextNode,
}

/// A statement whose every reference has been resolved
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub statement: QueryStatement,
    /// alias -> type, in FROM order
    pub types: IndexMap<String, Arc<TypeDefinition>>,
    /// Selector ids of the JOIN ON columns, in FROM order
    pub join_references: Vec<SelectorId>,
    pub full_text: Option<FullTextClause>,
    resolved: HashMap<SelectorId, ResolvedSelector>,
}

impl BoundStatement {
    pub fn resolved(&self, id: SelectorId) -> Option<&ResolvedSelector> {
        self.resolved.get(&id)
    }

    /// Alias and property definition of a property selector
    pub fn property(&self, id: SelectorId) -> Option<(&str, &PropertyDefinition)> {
        match self.resolved.get(&id)? {
            ResolvedSelector::Property {
                alias, property, ..
            } => Some((alias.as_str(), property)),
            _ => None,
        }
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Alias that unqualified CONTAINS / IN_FOLDER / IN_TREE apply to
    pub fn default_alias(&self) -> &str {
        self.types.keys().next().map(String::as_str).unwrap_or_default()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

/// Bind a statement, wrapping any failure with the statement text.
pub fn bind(statement: &QueryStatement, catalog: &dyn TypeCatalog) -> Result<BoundStatement> {
    Binder::new(catalog)
        .bind(statement)
        .map_err(|source| Error::Bind {
            statement: statement.text.clone(),
            source,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    Join,
    Where,
    OrderBy,
}

/// One-shot resolver for a single statement
pub struct Binder<'a> {
    catalog: &'a dyn TypeCatalog,
    types: IndexMap<String, Arc<TypeDefinition>>,
    select_aliases: HashMap<String, SelectorId>,
    resolved: HashMap<SelectorId, ResolvedSelector>,
    join_references: Vec<SelectorId>,
    full_text: Option<FullTextClause>,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a dyn TypeCatalog) -> Self {
        Self {
            catalog,
            types: IndexMap::new(),
            select_aliases: HashMap::new(),
            resolved: HashMap::new(),
            join_references: Vec::new(),
            full_text: None,
        }
    }

    pub fn bind(mut self, statement: &QueryStatement) -> std::result::Result<BoundStatement, BindError> {
        self.bind_from(&statement.from)?;
        self.bind_select(&statement.select)?;

        for join in statement.joins() {
            for column in [&join.left, &join.right] {
                self.resolve_property(column, Clause::Join)?;
                self.join_references.push(column.id);
            }
        }

        if let Some(predicate) = &statement.where_clause {
            walk_predicate(&mut self, predicate)?;
        }

        self.bind_order_by(&statement.order_by)?;

        debug!(
            types = self.types.len(),
            references = self.resolved.len(),
            "statement bound"
        );

        Ok(BoundStatement {
            statement: statement.clone(),
            types: self.types,
            join_references: self.join_references,
            full_text: self.full_text,
            resolved: self.resolved,
        })
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    fn bind_from(&mut self, items: &[FromItem]) -> std::result::Result<(), BindError> {
        if items.is_empty() {
            return Err(BindError::InvalidStatement("FROM clause is empty".to_string()));
        }

        for item in items {
            let alias = item.binding_name().to_string();
            if self.types.contains_key(&alias) {
                return Err(BindError::DuplicateAlias {
                    clause: "from",
                    alias,
                });
            }

            let definition = self
                .catalog
                .lookup(&item.type_id)
                .ok_or_else(|| BindError::UnknownType(item.type_id.clone()))?;
            if !definition.queryable {
                return Err(BindError::InvalidStatement(format!(
                    "type '{}' is not queryable",
                    item.type_id
                )));
            }

            trace!(alias = %alias, type_id = %definition.id, "bound FROM type");
            self.types.insert(alias, definition);
        }
        Ok(())
    }

    fn bind_select(&mut self, items: &[SelectItem]) -> std::result::Result<(), BindError> {
        for item in items {
            match &item.selector {
                Selector::Column(column) => {
                    self.resolve_column(column, Clause::Select)?;
                }
                Selector::Function(function) => self.resolve_function(function)?,
            }

            if let Some(alias) = &item.alias {
                if self.select_aliases.contains_key(alias) {
                    return Err(BindError::DuplicateAlias {
                        clause: "select",
                        alias: alias.clone(),
                    });
                }
                self.select_aliases.insert(alias.clone(), item.selector.id());
            }
        }
        Ok(())
    }

    fn bind_order_by(&mut self, specs: &[SortSpec]) -> std::result::Result<(), BindError> {
        for spec in specs {
            match &spec.selector {
                Selector::Function(function) => self.resolve_function(function)?,
                Selector::Column(column) => match self.resolve_column(column, Clause::OrderBy)? {
                    ResolvedSelector::Property { property, .. } => {
                        if property.is_multi_valued() || !property.orderable {
                            return Err(BindError::NotOrderable(column.to_string()));
                        }
                    }
                    // SELECT alias of SCORE()
                    ResolvedSelector::Score => {}
                    ResolvedSelector::Wildcard { .. } => {
                        return Err(BindError::NotOrderable(column.to_string()))
                    }
                },
            }
        }
        Ok(())
    }

    // ========================================================================
    // Selector resolution
    // ========================================================================

    /// Resolve a column once; later calls for the same id return the cached
    /// resolution.
    fn resolve_column(
        &mut self,
        column: &ColumnReference,
        clause: Clause,
    ) -> std::result::Result<ResolvedSelector, BindError> {
        if let Some(existing) = self.resolved.get(&column.id) {
            return Ok(existing.clone());
        }
        let resolved = self.lookup_column(column, clause)?;
        self.resolved.insert(column.id, resolved.clone());
        Ok(resolved)
    }

    fn resolve_property(
        &mut self,
        column: &ColumnReference,
        clause: Clause,
    ) -> std::result::Result<PropertyDefinition, BindError> {
        match self.resolve_column(column, clause)? {
            ResolvedSelector::Property { property, .. } => Ok(property),
            _ => Err(BindError::InvalidStatement(format!(
                "'{}' does not name a property",
                column
            ))),
        }
    }

    fn lookup_column(
        &self,
        column: &ColumnReference,
        clause: Clause,
    ) -> std::result::Result<ResolvedSelector, BindError> {
        if column.is_wildcard() {
            return self.lookup_wildcard(column, clause);
        }

        // A SELECT alias shadows a property of the same name.
        if column.qualifier.is_none() && clause != Clause::Select {
            if let Some(item_id) = self.select_aliases.get(&column.property) {
                if let Some(resolved) = self.resolved.get(item_id) {
                    return Ok(resolved.clone());
                }
            }
        }

        let (alias, definition, property) = match &column.qualifier {
            Some(qualifier) => {
                let definition = self
                    .types
                    .get(qualifier)
                    .ok_or_else(|| BindError::UnknownType(qualifier.clone()))?;
                let property = definition.property(&column.property).ok_or_else(|| {
                    BindError::UnknownProperty {
                        property: column.property.clone(),
                        scope: format!("type '{}'", definition.id),
                    }
                })?;
                (qualifier.as_str(), definition, property)
            }
            None => {
                let matches: Vec<_> = self
                    .types
                    .iter()
                    .filter_map(|(alias, definition)| {
                        definition
                            .property(&column.property)
                            .map(|p| (alias.as_str(), definition, p))
                    })
                    .collect();

                match matches.as_slice() {
                    [] => {
                        return Err(BindError::UnknownProperty {
                            property: column.property.clone(),
                            scope: self.scope_description(),
                        })
                    }
                    [single] => *single,
                    many => {
                        return Err(BindError::AmbiguousProperty {
                            property: column.property.clone(),
                            types: many.iter().map(|(alias, _, _)| alias.to_string()).collect(),
                        })
                    }
                }
            }
        };

        if matches!(clause, Clause::Where | Clause::Join) && !property.queryable {
            return Err(BindError::NotQueryable(column.to_string()));
        }

        Ok(ResolvedSelector::Property {
            alias: alias.to_string(),
            type_id: definition.id.clone(),
            property: property.clone(),
        })
    }

    fn lookup_wildcard(
        &self,
        column: &ColumnReference,
        clause: Clause,
    ) -> std::result::Result<ResolvedSelector, BindError> {
        match (&column.qualifier, clause) {
            (None, Clause::Select) => Ok(ResolvedSelector::Wildcard {
                aliases: self.types.keys().cloned().collect(),
            }),
            // `alias.*` also qualifies IN_FOLDER / IN_TREE.
            (Some(qualifier), Clause::Select | Clause::Where) => {
                if !self.types.contains_key(qualifier) {
                    return Err(BindError::UnknownType(qualifier.clone()));
                }
                Ok(ResolvedSelector::Wildcard {
                    aliases: vec![qualifier.clone()],
                })
            }
            _ => Err(BindError::InvalidStatement(format!(
                "'{}' is only valid in the SELECT list",
                column
            ))),
        }
    }

    fn resolve_function(&mut self, function: &FunctionReference) -> std::result::Result<(), BindError> {
        if !function.name.eq_ignore_ascii_case("SCORE") {
            return Err(BindError::UnsupportedFunction(function.to_string()));
        }
        self.resolved.insert(function.id, ResolvedSelector::Score);
        Ok(())
    }

    fn scope_description(&self) -> String {
        let types: Vec<&str> = self.types.values().map(|t| t.id.as_str()).collect();
        format!("types [{}]", types.join(", "))
    }

    /// Alias a CONTAINS / IN_FOLDER / IN_TREE applies to when unqualified
    fn implicit_alias(&self, function: &str) -> std::result::Result<String, BindError> {
        if self.types.len() > 1 {
            return Err(BindError::InvalidStatement(format!(
                "{} must name a type alias when more than one type is queried",
                function
            )));
        }
        Ok(self.types.keys().next().cloned().unwrap_or_default())
    }

    // ========================================================================
    // Operand checks
    // ========================================================================

    /// Comparison operand: a single-valued property, a literal, or SCORE().
    fn check_comparison(
        &mut self,
        operator: &'static str,
        left: &PredicateNode,
        right: &PredicateNode,
        ordering: bool,
    ) -> std::result::Result<(), BindError> {
        for operand in [left, right] {
            match operand {
                PredicateNode::Column(column) => {
                    let property = match self.resolve_column(column, Clause::Where)? {
                        ResolvedSelector::Property { property, .. } => property,
                        ResolvedSelector::Score => continue,
                        ResolvedSelector::Wildcard { .. } => {
                            return Err(BindError::InvalidStatement(format!(
                                "'{}' is not a valid {} operand",
                                column, operator
                            )))
                        }
                    };
                    if property.is_multi_valued() {
                        return Err(BindError::QuantifierRequired(column.to_string()));
                    }
                    if ordering && property.property_type == PropertyType::Boolean {
                        return Err(BindError::InvalidComparison {
                            operator,
                            property: column.to_string(),
                        });
                    }
                }
                PredicateNode::Literal(text) => {
                    if ordering && matches!(literal_value(operand)?, Value::Boolean(_)) {
                        return Err(BindError::InvalidComparison {
                            operator,
                            property: text.clone(),
                        });
                    }
                }
                PredicateNode::Score(function) => self.resolve_function(function)?,
                other => {
                    return Err(BindError::InvalidStatement(format!(
                        "{} is not a valid {} operand",
                        other.kind_name(),
                        operator
                    )))
                }
            }
        }
        Ok(())
    }

    fn column_operand(
        &mut self,
        operator: &'static str,
        node: &PredicateNode,
    ) -> std::result::Result<(ColumnReference, PropertyDefinition), BindError> {
        let column = node.as_column().ok_or_else(|| {
            BindError::InvalidStatement(format!("{} requires a property operand", operator))
        })?;
        let property = self.resolve_property(column, Clause::Where)?;
        Ok((column.clone(), property))
    }

    fn check_single_valued(
        &mut self,
        operator: &'static str,
        node: &PredicateNode,
    ) -> std::result::Result<PropertyDefinition, BindError> {
        let (column, property) = self.column_operand(operator, node)?;
        if property.is_multi_valued() {
            return Err(BindError::QuantifierRequired(column.to_string()));
        }
        Ok(property)
    }

    fn check_quantified(
        &mut self,
        operator: &'static str,
        node: &PredicateNode,
    ) -> std::result::Result<(), BindError> {
        let (column, property) = self.column_operand(operator, node)?;
        if !property.is_multi_valued() {
            return Err(BindError::InvalidQuantifier(column.to_string()));
        }
        Ok(())
    }

    fn check_like(&mut self, column: &PredicateNode, pattern: &PredicateNode) -> std::result::Result<(), BindError> {
        let property = self.check_single_valued("LIKE", column)?;
        if !matches!(property.property_type, PropertyType::String | PropertyType::Id) {
            return Err(BindError::InvalidStatement(format!(
                "LIKE requires a string property, '{}' is {}",
                property.query_name, property.property_type
            )));
        }
        match literal_value(pattern)? {
            Value::String(_) => Ok(()),
            other => Err(BindError::InvalidStatement(format!(
                "LIKE pattern must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn check_folder(
        &mut self,
        function: &str,
        qualifier: Option<&PredicateNode>,
        folder: &PredicateNode,
    ) -> std::result::Result<(), BindError> {
        match qualifier {
            Some(node) => match node.as_column() {
                Some(column) if column.is_wildcard() && column.qualifier.is_some() => {}
                _ => {
                    return Err(BindError::InvalidStatement(format!(
                        "{} qualifier must be a type alias",
                        function
                    )))
                }
            },
            None => {
                self.implicit_alias(function)?;
            }
        }

        match literal_value(folder)? {
            Value::String(_) => Ok(()),
            other => Err(BindError::InvalidStatement(format!(
                "{} expects a folder id string, got {}",
                function,
                other.type_name()
            ))),
        }
    }
}

impl PredicateVisitor for Binder<'_> {
    type Error = BindError;

    fn on_eq(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison("=", left, right, false)
    }

    fn on_neq(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison("<>", left, right, false)
    }

    fn on_gt(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison(">", left, right, true)
    }

    fn on_ge(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison(">=", left, right, true)
    }

    fn on_lt(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison("<", left, right, true)
    }

    fn on_le(&mut self, _node: &PredicateNode, left: &PredicateNode, right: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_comparison("<=", left, right, true)
    }

    fn on_and(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_or(&mut self, _node: &PredicateNode, _left: &PredicateNode, _right: &PredicateNode) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_not(&mut self, _node: &PredicateNode, _child: &PredicateNode) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_in(&mut self, _node: &PredicateNode, column: &PredicateNode, _list: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_single_valued("IN", column).map(|_| ())
    }

    fn on_not_in(&mut self, _node: &PredicateNode, column: &PredicateNode, _list: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_single_valued("NOT IN", column).map(|_| ())
    }

    fn on_in_any(&mut self, _node: &PredicateNode, column: &PredicateNode, _list: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_quantified("ANY ... IN", column)
    }

    fn on_not_in_any(&mut self, _node: &PredicateNode, column: &PredicateNode, _list: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_quantified("ANY ... NOT IN", column)
    }

    fn on_eq_any(&mut self, _node: &PredicateNode, _literal: &PredicateNode, column: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_quantified("= ANY", column)
    }

    fn on_is_null(&mut self, _node: &PredicateNode, column: &PredicateNode) -> std::result::Result<(), BindError> {
        self.column_operand("IS NULL", column).map(|_| ())
    }

    fn on_is_not_null(&mut self, _node: &PredicateNode, column: &PredicateNode) -> std::result::Result<(), BindError> {
        self.column_operand("IS NOT NULL", column).map(|_| ())
    }

    fn on_like(&mut self, _node: &PredicateNode, column: &PredicateNode, pattern: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_like(column, pattern)
    }

    fn on_not_like(&mut self, _node: &PredicateNode, column: &PredicateNode, pattern: &PredicateNode) -> std::result::Result<(), BindError> {
        self.check_like(column, pattern)
    }

    fn on_contains(
        &mut self,
        _node: &PredicateNode,
        qualifier: Option<&str>,
        search: &FullTextNode,
    ) -> std::result::Result<(), BindError> {
        if self.full_text.is_some() {
            return Err(BindError::InvalidStatement(
                "only one CONTAINS is allowed per statement".to_string(),
            ));
        }

        let alias = match qualifier {
            Some(q) => q.to_string(),
            None => self.implicit_alias("CONTAINS")?,
        };
        let definition = self
            .types
            .get(&alias)
            .ok_or_else(|| BindError::UnknownType(alias.clone()))?;
        if !definition.fulltext_indexed {
            return Err(BindError::InvalidStatement(format!(
                "type '{}' is not full-text indexed",
                definition.id
            )));
        }

        walk_fulltext(&mut FullTextValidator, search)?;
        self.full_text = Some(FullTextClause {
            alias,
            search: search.clone(),
        });
        Ok(())
    }

    fn on_in_folder(
        &mut self,
        _node: &PredicateNode,
        qualifier: Option<&PredicateNode>,
        folder: &PredicateNode,
    ) -> std::result::Result<(), BindError> {
        self.check_folder("IN_FOLDER", qualifier, folder)
    }

    fn on_in_tree(
        &mut self,
        _node: &PredicateNode,
        qualifier: Option<&PredicateNode>,
        folder: &PredicateNode,
    ) -> std::result::Result<(), BindError> {
        self.check_folder("IN_TREE", qualifier, folder)
    }

    fn on_score(&mut self, _node: &PredicateNode, function: &FunctionReference) -> std::result::Result<(), BindError> {
        self.resolve_function(function)
    }

    fn on_column(&mut self, _node: &PredicateNode, column: &ColumnReference) -> std::result::Result<(), BindError> {
        self.resolve_column(column, Clause::Where).map(|_| ())
    }

    fn on_literal(&mut self, _node: &PredicateNode, _value: &Value) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_literal_list(&mut self, _node: &PredicateNode, _values: &[Value]) -> std::result::Result<(), BindError> {
        Ok(())
    }
}

/// Decodes every full-text leaf so malformed terms fail at bind time.
struct FullTextValidator;

impl FullTextVisitor for FullTextValidator {
    type Error = BindError;

    fn on_and(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_or(&mut self, _node: &FullTextNode, _children: &[FullTextNode]) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_minus(&mut self, _node: &FullTextNode, child: &FullTextNode) -> std::result::Result<(), BindError> {
        walk_fulltext(self, child)
    }

    fn on_word(&mut self, _node: &FullTextNode, _text: &str) -> std::result::Result<(), BindError> {
        Ok(())
    }

    fn on_phrase(&mut self, _node: &FullTextNode, _text: &str) -> std::result::Result<(), BindError> {
        Ok(())
    }
}
