//! CMIS-QL Query Executor
//!
//! Runs a bound statement against the repository: candidate lookup per FROM
//! type, joins, WHERE filtering, ordering, paging and projection.

use super::ast::*;
use super::binder::{bind, BoundStatement, ResolvedSelector};
use super::evaluator::{compare_sort_keys, compare_values, Evaluator, Row};
use super::parser::QueryParser;
use crate::catalog::TypeCatalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::repository::{ContentObject, FullTextIndex, InMemoryRepository, ObjectPropertySource};
use crate::types::{PropertyValue, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Query result page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ResultValue>>,
    pub stats: QueryStats,
    /// More matching rows exist after this page
    pub has_more_items: bool,
    /// Total number of matching rows
    pub num_items: usize,
}

/// Result value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultValue {
    Scalar(PropertyValue),
    Null,
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Scalar(v) => write!(f, "{}", v),
            ResultValue::Null => write!(f, "NULL"),
        }
    }
}

impl From<Option<PropertyValue>> for ResultValue {
    fn from(value: Option<PropertyValue>) -> Self {
        value.map(ResultValue::Scalar).unwrap_or(ResultValue::Null)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    pub objects_scanned: usize,
    pub rows_matched: usize,
    pub rows_returned: usize,
    /// Rows skipped because evaluating them failed
    pub evaluation_errors: usize,
    pub execution_time_ms: u64,
}

/// One output column
enum Projection {
    Property { alias: String, property_id: String },
    Score,
}

/// Query executor
pub struct QueryExecutor {
    catalog: Arc<dyn TypeCatalog + Send + Sync>,
    repository: Arc<InMemoryRepository>,
    full_text_index: Option<Arc<dyn FullTextIndex + Send + Sync>>,
    config: EngineConfig,
}

impl QueryExecutor {
    pub fn new(catalog: Arc<dyn TypeCatalog + Send + Sync>, repository: Arc<InMemoryRepository>) -> Self {
        Self {
            catalog,
            repository,
            full_text_index: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an external full-text index for CONTAINS instead of matching the
    /// objects' own text
    pub fn with_full_text_index(mut self, index: Arc<dyn FullTextIndex + Send + Sync>) -> Self {
        self.full_text_index = Some(index);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, bind and execute a statement with the executor's configuration
    pub fn query(&self, text: &str) -> Result<QueryResult> {
        let statement = QueryParser::new(text).parse()?;
        let bound = bind(&statement, &*self.catalog)?;
        self.execute(&bound, &self.config)
    }

    pub fn execute(&self, bound: &BoundStatement, config: &EngineConfig) -> Result<QueryResult> {
        let start = Instant::now();
        let mut stats = QueryStats::default();

        let candidates: Vec<(String, Vec<Arc<ContentObject>>)> = bound
            .types
            .iter()
            .map(|(alias, definition)| {
                let objects = self.repository.objects_of_type(
                    &definition.id,
                    &*self.catalog,
                    config.include_subtypes,
                );
                (alias.clone(), objects)
            })
            .collect();
        stats.objects_scanned = candidates.iter().map(|(_, objects)| objects.len()).sum();

        let rows = self.join_rows(bound, &candidates)?;
        debug!(
            candidates = stats.objects_scanned,
            rows = rows.len(),
            "candidate rows built"
        );

        let index = self
            .full_text_index
            .as_ref()
            .map(|index| &**index as &dyn FullTextIndex);
        let repository: &InMemoryRepository = &self.repository;
        let evaluator = Evaluator::new(bound, repository, index)?
            .with_case_sensitive_text(config.case_sensitive_text);

        let mut matched = Vec::new();
        for row in rows {
            match evaluator.evaluate_row(&row) {
                Ok(true) => matched.push(row),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "row evaluation failed, row skipped");
                    stats.evaluation_errors += 1;
                }
            }
        }

        if !bound.statement.order_by.is_empty() {
            matched = self.sort_rows(&evaluator, matched, &mut stats);
        }
        stats.rows_matched = matched.len();

        let limit = if config.max_items == 0 {
            usize::MAX
        } else {
            config.max_items
        };
        let num_items = matched.len();
        let has_more_items = config.skip_count.saturating_add(limit) < num_items;

        let (columns, projections) = self.projections(bound)?;
        let mut result_rows = Vec::new();
        for row in matched.iter().skip(config.skip_count).take(limit) {
            let mut values = Vec::with_capacity(projections.len());
            for projection in &projections {
                let value = match projection {
                    Projection::Property { alias, property_id } => {
                        ResultValue::from(row.get(alias).and_then(|o| o.get(property_id)).cloned())
                    }
                    Projection::Score => match evaluator.score(row) {
                        Ok(score) => ResultValue::Scalar(PropertyValue::Single(Value::Decimal(score))),
                        Err(e) => {
                            warn!(error = %e, "score evaluation failed, projected as NULL");
                            stats.evaluation_errors += 1;
                            ResultValue::Null
                        }
                    },
                };
                values.push(value);
            }
            result_rows.push(values);
        }

        stats.rows_returned = result_rows.len();
        stats.execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            matched = stats.rows_matched,
            returned = stats.rows_returned,
            elapsed_ms = stats.execution_time_ms,
            "query executed"
        );

        Ok(QueryResult {
            columns,
            rows: result_rows,
            stats,
            has_more_items,
            num_items,
        })
    }

    /// Rows for the FROM clause: the first type's objects, extended by each
    /// joined type in turn.
    fn join_rows<'a>(
        &self,
        bound: &BoundStatement,
        candidates: &'a [(String, Vec<Arc<ContentObject>>)],
    ) -> Result<Vec<Row<'a>>> {
        let Some(((first_alias, first_objects), rest)) = candidates.split_first() else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Row<'a>> = first_objects
            .iter()
            .map(|object| {
                let mut row = Row::new();
                row.insert(first_alias, Some(&**object as &dyn ObjectPropertySource));
                row
            })
            .collect();

        for (item, (alias, objects)) in bound.statement.from.iter().skip(1).zip(rest) {
            let mut joined = Vec::new();
            for row in &rows {
                let mut any_match = false;
                for object in objects {
                    let object: &'a dyn ObjectPropertySource = &**object;
                    let keep = match &item.join {
                        Some(join) => join_matches(bound, join, row, alias, object)?,
                        None => true,
                    };
                    if keep {
                        let mut extended = row.clone();
                        extended.insert(alias, Some(object));
                        joined.push(extended);
                        any_match = true;
                    }
                }

                let left_outer = matches!(&item.join, Some(j) if j.kind == JoinKind::LeftOuter);
                if !any_match && left_outer {
                    let mut extended = row.clone();
                    extended.insert(alias, None);
                    joined.push(extended);
                }
            }
            rows = joined;
        }

        Ok(rows)
    }

    /// Stable sort by ORDER BY keys; rows whose key fails are dropped.
    fn sort_rows<'a>(
        &self,
        evaluator: &Evaluator<'_>,
        rows: Vec<Row<'a>>,
        stats: &mut QueryStats,
    ) -> Vec<Row<'a>> {
        let specs = &evaluator.bound().statement.order_by;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            match evaluator.sort_key(&row) {
                Ok(key) => keyed.push((key, row)),
                Err(e) => {
                    warn!(error = %e, "sort key evaluation failed, row skipped");
                    stats.evaluation_errors += 1;
                }
            }
        }

        keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(specs, a, b));
        keyed.into_iter().map(|(_, row)| row).collect()
    }

    fn projections(&self, bound: &BoundStatement) -> Result<(Vec<String>, Vec<Projection>)> {
        let qualify = bound.types.len() > 1;
        let mut columns = Vec::new();
        let mut projections = Vec::new();

        for item in &bound.statement.select {
            let id = item.selector.id();
            match bound.resolved(id) {
                Some(ResolvedSelector::Wildcard { aliases }) => {
                    for alias in aliases {
                        let definition = bound
                            .types
                            .get(alias)
                            .ok_or_else(|| Error::TypeNotFound(alias.clone()))?;
                        for property in &definition.properties {
                            columns.push(if qualify {
                                format!("{}.{}", alias, property.query_name)
                            } else {
                                property.query_name.clone()
                            });
                            projections.push(Projection::Property {
                                alias: alias.clone(),
                                property_id: property.id.clone(),
                            });
                        }
                    }
                }
                Some(ResolvedSelector::Property {
                    alias, property, ..
                }) => {
                    columns.push(
                        item.alias
                            .clone()
                            .unwrap_or_else(|| item.selector.to_string()),
                    );
                    projections.push(Projection::Property {
                        alias: alias.clone(),
                        property_id: property.id.clone(),
                    });
                }
                Some(ResolvedSelector::Score) => {
                    columns.push(
                        item.alias
                            .clone()
                            .unwrap_or_else(|| item.selector.to_string()),
                    );
                    projections.push(Projection::Score);
                }
                None => {
                    return Err(Error::QueryExecutionError(format!(
                        "Selector '{}' was not bound",
                        item.selector
                    )))
                }
            }
        }

        Ok((columns, projections))
    }
}

/// Equality of the JOIN ON values, with `object` standing for the alias
/// being joined in
fn join_matches(
    bound: &BoundStatement,
    join: &JoinSpec,
    row: &Row<'_>,
    alias: &str,
    object: &dyn ObjectPropertySource,
) -> Result<bool> {
    let side_value = |column: &ColumnReference| -> Result<Option<Value>> {
        let (side_alias, property) = bound.property(column.id).ok_or_else(|| {
            Error::QueryExecutionError(format!("Join column '{}' was not bound", column))
        })?;
        let source = if side_alias == alias {
            Some(object)
        } else {
            row.get(side_alias)
        };
        Ok(source
            .and_then(|o| o.get(&property.id))
            .and_then(|v| v.single())
            .cloned())
    };

    Ok(match (side_value(&join.left)?, side_value(&join.right)?) {
        (Some(l), Some(r)) => compare_values(&l, &r) == Some(Ordering::Equal),
        _ => false,
    })
}
