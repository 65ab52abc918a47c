//! Integration tests for the complete Figura pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - JSON definition → typed Figure → registry
//! - Path resolution → argument binding → compiled SQL
//!
//! Run with: cargo test --test integration_tests

use serde_json::{json, Map, Value};

use figura_query::{ConfigError, Error, Registry, ValidationError};

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            "activity",
            &json!({
                "title": "Activity",
                "alias": "act",
                "where": "b > 10",
                "tables": "from table",
                "outline": {
                    "index": {"select": "value"},
                    "/merged": {
                        "select": "c",
                        "&arguments": {"&a[]": {"default": "Whats up!"}}
                    },
                    "/": {
                        "/(count|total)": {
                            "select": {"agg": "count", "column": "o.*", "as": "count"}
                        },
                        "/linked": {"inherit": "orders/other", "select": "that"}
                    }
                },
                "arguments": {
                    "a[]": {"validator": "string", "default": "Hello", "column": "col_a::text"},
                    "groupby": {
                        "adapt": false,
                        "options": {
                            "days?": {"select": "column_day as day", "value": "day"}
                        }
                    },
                    "compact": {"validator": "string", "ignore": "a"},
                    "bare": {"validator": "string", "ignore": ["a", "groupby"]}
                }
            }),
        )
        .expect("register activity");
    registry
        .register(
            "orders",
            &json!({
                "tables": ["from table"],
                "outline": {
                    "index": {"select": "a"},
                    "/other": {
                        "tables": ["inner join other using (this)"],
                        "select": "this",
                        "&arguments": {
                            "this": {"validator": "string", "required": true}
                        }
                    },
                    "/create": {
                        "query": "insert into _table (%(columns)s) values (%(values)s) returning _id"
                    },
                    "/update": {
                        "query": "update _table set %(updates)s where id=%(id)s::int"
                    }
                },
                "arguments": {
                    "a[]": {"validator": "integer", "column": "a::int"},
                    "r": {"validator": "string", "column": "r::text", "required": true},
                    "id[]": {"validator": "integer", "column": "id::int"}
                }
            }),
        )
        .expect("register orders");
    registry
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("argument object")
}

// ============================================================================
// Select-shaped resolution
// ============================================================================

#[test]
fn test_defaults_compile_into_the_baseline_statement() {
    let registry = registry();
    let sql = registry.resolve("activity", &[], &Map::new()).unwrap();
    assert_eq!(
        sql,
        "select value from table where b > 10 and col_a = 'Hello'::text"
    );
}

#[test]
fn test_pattern_alternatives_compile_identically() {
    let registry = registry();
    let count = registry.resolve("activity", &["count"], &Map::new()).unwrap();
    let total = registry.resolve("activity", &["total"], &Map::new()).unwrap();
    assert_eq!(count, total);
    assert_eq!(
        count,
        "select count(o.*) as count from table where b > 10 and col_a = 'Hello'::text"
    );
}

#[test]
fn test_list_values_compile_to_containment() {
    let registry = registry();
    let sql = registry
        .resolve("activity", &[], &args(json!({"a": ["this", "that"]})))
        .unwrap();
    assert_eq!(
        sql,
        "select value from table where b > 10 and ARRAY['this', 'that']::text[] @> array[col_a]"
    );
}

#[test]
fn test_option_spellings_group_identically() {
    let registry = registry();
    let day = registry
        .resolve("activity", &[], &args(json!({"groupby": "day"})))
        .unwrap();
    let days = registry
        .resolve("activity", &[], &args(json!({"groupby": "days"})))
        .unwrap();
    assert_eq!(day, days);
    assert_eq!(
        day,
        "select column_day as day, value from table where b > 10 and col_a = 'Hello'::text group by day"
    );
}

#[test]
fn test_scope_patch_overrides_only_the_default() {
    let registry = registry();
    let sql = registry.resolve("activity", &["merged"], &Map::new()).unwrap();
    assert_eq!(
        sql,
        "select c from table where b > 10 and col_a = 'Whats up!'::text"
    );
}

// ============================================================================
// Ignore rules
// ============================================================================

#[test]
fn test_truthy_ignore_suppresses_the_defaulted_sibling() {
    let registry = registry();
    let sql = registry
        .resolve("activity", &[], &args(json!({"compact": "true"})))
        .unwrap();
    assert_eq!(sql, "select value from table where b > 10");
}

#[test]
fn test_supplying_an_ignored_sibling_is_rejected() {
    let registry = registry();
    let err = registry
        .resolve("activity", &[], &args(json!({"bare": "true", "groupby": "day"})))
        .unwrap_err();
    assert!(err.to_string().contains("additional properties: groupby"));
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_inherited_requirement_names_the_missing_argument() {
    let registry = registry();
    let err = registry
        .resolve("activity", &["linked"], &args(json!({"r": "something"})))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingRequiredProperty(ref name)) if name == "this"
    ));
    assert!(err.to_string().contains("missing required property: this"));
}

#[test]
fn test_inheritance_merges_select_tables_and_schema() {
    let registry = registry();
    let sql = registry
        .resolve(
            "activity",
            &["linked"],
            &args(json!({"this": "apples", "r": "something"})),
        )
        .unwrap();
    assert_eq!(
        sql,
        "select that, this from table inner join other using (this) where r = 'something'::text"
    );
}

// ============================================================================
// Raw templates
// ============================================================================

#[test]
fn test_create_template_expands_supplied_arguments_only() {
    let registry = registry();
    let sql = registry
        .resolve("orders", &["create"], &args(json!({"a": 1, "r": "world"})))
        .unwrap();
    assert_eq!(sql, "insert into _table (a, r) values (1, 'world') returning _id");
}

#[test]
fn test_update_template_keeps_the_key_out_of_updates() {
    let registry = registry();
    let sql = registry
        .resolve("orders", &["update"], &args(json!({"id": 10, "r": "something"})))
        .unwrap();
    assert_eq!(sql, "update _table set r='something'::text where id=10::int");
}

#[test]
fn test_base_requirement_applies_to_every_path() {
    let registry = registry();
    let err = registry.resolve("orders", &[], &Map::new()).unwrap_err();
    assert!(err.to_string().contains("missing required property: r"));
}

// ============================================================================
// Registry surface
// ============================================================================

#[test]
fn test_alias_and_navigator_match_direct_resolution() {
    let registry = registry();
    let direct = registry.resolve("activity", &["count"], &Map::new()).unwrap();
    let aliased = registry.resolve("act", &["count"], &Map::new()).unwrap();
    let chained = registry.navigate("activity").path("count").sql().unwrap();
    assert_eq!(direct, aliased);
    assert_eq!(direct, chained);
}

#[test]
fn test_resolution_is_idempotent() {
    let registry = registry();
    let arguments = args(json!({"a": ["this", "that"], "groupby": "day"}));
    let first = registry.resolve("activity", &[], &arguments).unwrap();
    let second = registry.resolve("activity", &[], &arguments).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_paths_and_figures_fail_typed() {
    let registry = registry();
    let err = registry.resolve("activity", &["nowhere"], &Map::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::PathNotFound(ref path)) if path == "nowhere"
    ));

    let err = registry.resolve("ghost", &[], &Map::new()).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::UnknownFigure(_))));
}

#[test]
fn test_concurrent_resolution_needs_no_locks() {
    let registry = std::sync::Arc::new(registry());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let registry = std::sync::Arc::clone(&registry);
        handles.push(std::thread::spawn(move || {
            registry.resolve("activity", &["count"], &Map::new()).unwrap()
        }));
    }
    let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}
