use std::path::PathBuf;
use std::sync::Arc;

use cmis_query::query::{bind, parse, FullTextMatch, FullTextNode, QueryExecutor, QueryResult, ResultValue};
use cmis_query::{
    BindError, ContentObject, EngineConfig, Error, FullTextIndex, InMemoryRepository, InMemoryTypeCatalog,
    PropertyDefinition, PropertyType, PropertyValue, TypeCatalog, TypeDefinition, Value,
};
use rust_decimal::Decimal;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/scenario.json")
}

fn load() -> (Arc<InMemoryTypeCatalog>, Arc<InMemoryRepository>) {
    let (catalog, repository) = cmis_query::repository::load_fixture(fixture_path()).unwrap();
    (Arc::new(catalog), Arc::new(repository))
}

fn executor() -> QueryExecutor {
    let (catalog, repository) = load();
    QueryExecutor::new(catalog, repository).with_config(EngineConfig::default().with_max_items(0))
}

fn names(result: &QueryResult) -> Vec<String> {
    result.rows.iter().map(|row| row[0].to_string()).collect()
}

fn query_names(query: &str) -> Vec<String> {
    names(&executor().query(query).unwrap())
}

#[test]
fn integer_equality_returns_matching_object() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE intProp = 50"),
        vec!["three"]
    );
}

#[test]
fn integer_inequality_excludes_one_object() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE intProp <> 100"),
        vec!["one", "two", "three", "five"]
    );
}

#[test]
fn like_prefix_and_suffix() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE codeProp LIKE 'ABC%'"),
        vec!["one", "two"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE codeProp LIKE '%ABC'"),
        vec!["three"]
    );
}

#[test]
fn conjunction_with_boolean() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE intProp = 50 AND boolProp = true"),
        vec!["three"]
    );
    assert!(query_names("SELECT cmis:name FROM test:scenario WHERE intProp = 50 AND boolProp = false").is_empty());
}

#[test]
fn order_by_string_both_directions() {
    let asc = executor()
        .query("SELECT stringProp FROM test:scenario ORDER BY stringProp")
        .unwrap();
    assert_eq!(names(&asc), vec!["Alpha", "Beta", "Delta", "Epsilon", "Gamma"]);

    let desc = executor()
        .query("SELECT stringProp FROM test:scenario ORDER BY stringProp DESC")
        .unwrap();
    assert_eq!(names(&desc), vec!["Gamma", "Epsilon", "Delta", "Beta", "Alpha"]);
}

#[test]
fn is_null_and_complement() {
    let catalog = InMemoryTypeCatalog::new();
    catalog
        .register(
            TypeDefinition::new("test:sparse", Some("cmis:document"))
                .with_property(PropertyDefinition::new("intProp", PropertyType::Integer)),
        )
        .unwrap();
    let repository = InMemoryRepository::new();
    for (i, value) in [Some(-100i64), Some(-50), None, Some(50), Some(100)].into_iter().enumerate() {
        let mut object = ContentObject::new(&format!("s{}", i), "test:sparse");
        if let Some(value) = value {
            object = object.with_property("intProp", value);
        }
        repository.insert(object).unwrap();
    }
    let executor = QueryExecutor::new(Arc::new(catalog), Arc::new(repository));

    let null = executor
        .query("SELECT cmis:objectId FROM test:sparse WHERE intProp IS NULL")
        .unwrap();
    assert_eq!(names(&null), vec!["s2"]);

    let not_null = executor
        .query("SELECT cmis:objectId FROM test:sparse WHERE intProp IS NOT NULL")
        .unwrap();
    assert_eq!(names(&not_null), vec!["s0", "s1", "s3", "s4"]);
}

#[test]
fn any_is_existential() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE 'red' = ANY tags"),
        vec!["one", "three"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE ANY tags IN ('purple', 'blue')"),
        vec!["two"]
    );
    assert!(query_names("SELECT cmis:name FROM test:scenario WHERE ANY tags IN ('purple')").is_empty());
    // o3 holds only 'red'; o4 holds nothing.
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE ANY tags NOT IN ('red')"),
        vec!["one", "two", "five"]
    );
}

#[test]
fn like_and_not_like_never_agree() {
    let exec = executor();
    for pattern in ["ABC%", "%ABC", "_BC%", "%Z%", "ABCDEF", "\\%%"] {
        let like = exec
            .query(&format!("SELECT cmis:name FROM test:scenario WHERE codeProp LIKE '{}'", pattern))
            .unwrap();
        let not_like = exec
            .query(&format!("SELECT cmis:name FROM test:scenario WHERE codeProp NOT LIKE '{}'", pattern))
            .unwrap();
        let like = names(&like);
        let not_like = names(&not_like);
        assert!(like.iter().all(|n| !not_like.contains(n)), "pattern {}", pattern);
        // Only the three objects carrying codeProp take part.
        assert_eq!(like.len() + not_like.len(), 3, "pattern {}", pattern);
    }
}

#[test]
fn boolean_order_groups_values() {
    let asc = executor()
        .query("SELECT cmis:name, boolProp FROM test:scenario ORDER BY boolProp")
        .unwrap();
    let flags: Vec<String> = asc.rows.iter().map(|r| r[1].to_string()).collect();
    assert_eq!(flags, vec!["false", "false", "true", "true", "true"]);
    assert_eq!(names(&asc), vec!["two", "four", "one", "three", "five"]);

    let desc = executor()
        .query("SELECT cmis:name, boolProp FROM test:scenario ORDER BY boolProp DESC")
        .unwrap();
    let flags: Vec<String> = desc.rows.iter().map(|r| r[1].to_string()).collect();
    assert_eq!(flags, vec!["true", "true", "true", "false", "false"]);
}

#[test]
fn numeric_and_date_comparisons() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE price >= 10"),
        vec!["two", "three"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE price < 9.75"),
        vec!["one"]
    );
    assert_eq!(
        query_names(
            "SELECT cmis:name FROM test:scenario WHERE published > TIMESTAMP '2020-12-31T23:59:59Z' \
             ORDER BY published DESC"
        ),
        vec!["three", "two"]
    );
}

#[test]
fn ambiguity_and_qualified_resolution() {
    let (catalog, _) = load();
    catalog
        .register(
            TypeDefinition::new("test:other", Some("cmis:document"))
                .with_property(PropertyDefinition::new("intProp", PropertyType::Integer)),
        )
        .unwrap();

    let statement =
        parse("SELECT intProp FROM test:scenario s JOIN test:other o ON s.cmis:objectId = o.cmis:objectId").unwrap();
    match bind(&statement, &*catalog) {
        Err(Error::Bind { statement, source }) => {
            assert!(statement.contains("JOIN test:other"));
            assert!(matches!(source, BindError::AmbiguousProperty { .. }));
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }

    for alias in ["s", "o"] {
        let text = format!(
            "SELECT {}.intProp FROM test:scenario s JOIN test:other o ON s.cmis:objectId = o.cmis:objectId",
            alias
        );
        let statement = parse(&text).unwrap();
        let bound = bind(&statement, &*catalog).unwrap();
        let id = statement.select[0].selector.id();
        let (resolved_alias, property) = bound.property(id).unwrap();
        assert_eq!(resolved_alias, alias);
        assert_eq!(property.id, "intProp");
    }
}

#[test]
fn binding_is_deterministic() {
    let (catalog, _) = load();
    let statement = parse(
        "SELECT cmis:name n, SCORE() FROM test:scenario WHERE CONTAINS('budget') AND intProp IN (1, 2) \
         ORDER BY n",
    )
    .unwrap();
    let first = bind(&statement, &*catalog).unwrap();
    let second = bind(&statement, &*catalog).unwrap();
    assert_eq!(first, second);
}

#[test]
fn contains_scores_matches() {
    let result = executor()
        .query("SELECT cmis:name, SCORE() AS relevance FROM test:scenario WHERE CONTAINS('budget -draft')")
        .unwrap();
    assert_eq!(names(&result), vec!["one"]);
    assert_eq!(result.columns, vec!["cmis:name", "relevance"]);
    assert_eq!(
        result.rows[0][1],
        ResultValue::Scalar(PropertyValue::Single(Value::Decimal(Decimal::ONE)))
    );

    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE CONTAINS('report')"),
        vec!["one", "five"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE CONTAINS('\"budget proposal\"')"),
        vec!["two"]
    );
}

#[test]
fn folder_predicates() {
    assert_eq!(
        query_names("SELECT cmis:name FROM test:scenario WHERE IN_FOLDER('f_reports')"),
        vec!["two", "three"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM cmis:document WHERE IN_TREE('f_root')"),
        vec!["one", "two", "three", "four"]
    );
    assert_eq!(
        query_names("SELECT cmis:name FROM cmis:folder WHERE IN_TREE('f_root')"),
        vec!["reports"]
    );
}

#[test]
fn paging_reports_more_items() {
    let (catalog, repository) = load();
    let exec = QueryExecutor::new(catalog, repository)
        .with_config(EngineConfig::default().with_max_items(2).with_skip_count(1));
    let result = exec
        .query("SELECT stringProp FROM test:scenario ORDER BY stringProp")
        .unwrap();
    assert_eq!(names(&result), vec!["Beta", "Delta"]);
    assert!(result.has_more_items);
    assert_eq!(result.num_items, 5);
}

#[test]
fn bind_errors_fail_before_execution() {
    let exec = executor();
    assert!(matches!(
        exec.query("SELECT cmis:name FROM test:scenario WHERE missing = 1"),
        Err(Error::Bind {
            source: BindError::UnknownProperty { .. },
            ..
        })
    ));
    assert!(matches!(
        exec.query("SELECT cmis:name FROM test:scenario WHERE ANY intProp IN (1)"),
        Err(Error::Bind {
            source: BindError::InvalidQuantifier(_),
            ..
        })
    ));
    assert!(matches!(
        exec.query("SELECT UPPER() FROM test:scenario"),
        Err(Error::Bind {
            source: BindError::UnsupportedFunction(_),
            ..
        })
    ));
    assert!(matches!(exec.query("SELECT * FROM"), Err(Error::ParseError(_))));
}

struct FlakyIndex;

impl FullTextIndex for FlakyIndex {
    fn match_text(&self, _search: &FullTextNode, object_id: &str) -> cmis_query::Result<FullTextMatch> {
        match object_id {
            "o2" => Err(Error::QueryExecutionError("index unavailable".to_string())),
            "o1" | "o3" => Ok(FullTextMatch::new(true, Decimal::new(25, 1))),
            _ => Ok(FullTextMatch::default()),
        }
    }
}

#[test]
fn external_index_errors_skip_rows() {
    let (catalog, repository) = load();
    assert!(catalog.lookup("test:scenario").is_some());
    let exec = QueryExecutor::new(catalog, repository).with_full_text_index(Arc::new(FlakyIndex));
    let result = exec
        .query("SELECT cmis:name, SCORE() FROM test:scenario WHERE CONTAINS('anything')")
        .unwrap();
    assert_eq!(names(&result), vec!["one", "three"]);
    assert_eq!(result.stats.evaluation_errors, 1);
    assert_eq!(result.rows[0][1].to_string(), "2.5");
}

#[test]
fn score_alias_orders_and_filters() {
    let result = executor()
        .query(
            "SELECT cmis:name, SCORE() AS relevance FROM test:scenario \
             WHERE CONTAINS('budget OR report') ORDER BY relevance DESC",
        )
        .unwrap();
    assert_eq!(names(&result), vec!["one", "two", "five"]);
    let scores: Vec<String> = result.rows.iter().map(|r| r[1].to_string()).collect();
    assert_eq!(scores, vec!["2", "1", "1"]);

    assert_eq!(
        query_names(
            "SELECT cmis:name, SCORE() relevance FROM test:scenario \
             WHERE CONTAINS('budget OR report') AND relevance > 1"
        ),
        vec!["one"]
    );
}
