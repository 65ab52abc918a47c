//! Outline resolution: navigation path → one concrete query shape.
//!
//! Walks a figure's outline tree segment by segment, collecting the argument
//! scope layers contributed along the way, and resolves `inherit`
//! cross-references through the registry (across figures) with cycle
//! detection.
//!
//! Matching rules, per level:
//! - literal child keys are checked before pattern keys; declaration order
//!   breaks ties within each class,
//! - a pattern must match the whole segment,
//! - the bare `/` group key matches without consuming the segment, so its
//!   children are tried against the same segment,
//! - the first match is committed; there is no backtracking,
//! - exhausted segments resolve to the `index` child when one exists,
//!   otherwise to the current node if it can render itself.

use std::collections::HashSet;

use figura_schema::{Figure, OutlineNode, ScopeLayer, Seed, SelectExpr};

use crate::error::ConfigError;
use crate::registry::Registry;

/// A fully merged, inheritance-resolved outline node plus the scope chain
/// accumulated along the path. Borrows from the registry; building one does
/// not copy any definition data.
#[derive(Debug)]
pub struct ResolvedOutline<'r> {
    /// Select contributions, local-most first when inheritance stacked them.
    pub select: Vec<&'r SelectExpr>,
    /// Node-level join fragments (inherited first, local appended).
    pub tables: Vec<&'r str>,
    /// Raw query template, when the node is template-shaped.
    pub query: Option<&'r str>,
    /// Seed clauses of the figure the node ultimately resolved against.
    pub seed: &'r Seed,
    /// Argument scope chain, base schema first, then every visited node's
    /// patch in traversal order.
    pub scopes: Vec<&'r ScopeLayer>,
}

/// Resolve `path` against `figure`'s outline.
pub fn resolve_outline<'r>(
    registry: &'r Registry,
    figure: &'r Figure,
    path: &[&str],
) -> Result<ResolvedOutline<'r>, ConfigError> {
    let mut visiting = HashSet::new();
    let resolved = resolve_inner(registry, figure, path, &mut visiting)?;
    tracing::debug!(
        figure = %figure.id,
        path = %path.join("/"),
        layers = resolved.scopes.len(),
        template = resolved.query.is_some(),
        "resolved outline"
    );
    Ok(resolved)
}

fn resolve_inner<'r>(
    registry: &'r Registry,
    figure: &'r Figure,
    segments: &[&str],
    visiting: &mut HashSet<String>,
) -> Result<ResolvedOutline<'r>, ConfigError> {
    let (visited, terminal) = walk(&figure.outline, segments)?;

    let Some(inherit) = &terminal.inherit else {
        let mut scopes: Vec<&ScopeLayer> = Vec::with_capacity(visited.len() + 1);
        scopes.push(&figure.arguments);
        for node in &visited {
            if !node.arguments.is_empty() {
                scopes.push(&node.arguments);
            }
        }
        return Ok(ResolvedOutline {
            select: terminal.select.iter().collect(),
            tables: terminal.tables.iter().map(String::as_str).collect(),
            query: terminal.query.as_deref(),
            seed: &figure.seed,
            scopes,
        });
    };

    // Resolve the reference first, in its own figure's context. The
    // inherited resolution carries that figure's seed and scope chain; the
    // local node's fields then overlay it.
    let reference = inherit.to_string();
    if !visiting.insert(reference.clone()) {
        return Err(ConfigError::CycleDetected(reference));
    }
    let target = registry
        .figure(&inherit.figure)
        .ok_or_else(|| ConfigError::UnknownInheritTarget(reference.clone()))?;
    let target_path: Vec<&str> = inherit.path.iter().map(String::as_str).collect();
    let mut resolved =
        resolve_inner(registry, target, &target_path, visiting).map_err(|err| match err {
            ConfigError::PathNotFound(_) => ConfigError::UnknownInheritTarget(reference.clone()),
            other => other,
        })?;
    visiting.remove(&reference);

    if let Some(select) = &terminal.select {
        resolved.select.insert(0, select);
        // Redeclaring `select` makes the node select-shaped again even if
        // the inherited node was template-shaped.
        resolved.query = None;
    }
    resolved
        .tables
        .extend(terminal.tables.iter().map(String::as_str));
    if let Some(query) = &terminal.query {
        resolved.query = Some(query.as_str());
        resolved.select.clear();
    }
    if !terminal.arguments.is_empty() {
        resolved.scopes.push(&terminal.arguments);
    }
    Ok(resolved)
}

/// Walk the tree, returning every visited node (root first) and the terminal.
fn walk<'r>(
    root: &'r OutlineNode,
    segments: &[&str],
) -> Result<(Vec<&'r OutlineNode>, &'r OutlineNode), ConfigError> {
    let not_found = || ConfigError::PathNotFound(segments.join("/"));

    let mut visited = vec![root];
    let mut node = root;
    let mut rest = segments;
    loop {
        let Some(segment) = rest.first() else {
            if let Some(index) = node.index_child() {
                visited.push(index);
                return Ok((visited, index));
            }
            if node.select.is_some() || node.query.is_some() || node.inherit.is_some() {
                return Ok((visited, node));
            }
            return Err(not_found());
        };

        let mut chosen: Option<(&OutlineNode, bool)> = None;
        for child in node.children.iter().filter(|c| c.key.is_literal()) {
            if child.key.matches(segment) {
                chosen = Some((child, true));
                break;
            }
        }
        if chosen.is_none() {
            for child in node.children.iter().filter(|c| !c.key.is_literal()) {
                if child.key.is_group() {
                    chosen = Some((child, false));
                    break;
                }
                if child.key.matches(segment) {
                    chosen = Some((child, true));
                    break;
                }
            }
        }
        match chosen {
            Some((child, consumed)) => {
                visited.push(child);
                node = child;
                if consumed {
                    rest = &rest[1..];
                }
            }
            None => return Err(not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                "metrics",
                &json!({
                    "where": "b > 10",
                    "tables": "from events",
                    "outline": {
                        "index": {"select": "value"},
                        "/": {
                            "/(count|total)": {
                                "select": {"agg": "count", "column": "o.*", "as": "count"}
                            },
                            "/linked": {"inherit": "orders/by_status", "select": "that"},
                            "&arguments": {"&agg": {"&default": "sum"}}
                        }
                    },
                    "arguments": {
                        "a[]": {"validator": "string", "default": "Hello", "column": "col_a::text"}
                    }
                }),
            )
            .unwrap();
        registry
            .register(
                "orders",
                &json!({
                    "tables": ["from orders"],
                    "outline": {
                        "index": {"select": "a"},
                        "/by_status": {
                            "tables": ["inner join status using (sid)"],
                            "select": "status",
                            "&arguments": {
                                "status": {"validator": "string", "required": true}
                            }
                        }
                    },
                    "arguments": {
                        "r": {"validator": "string", "column": "r::text", "required": true}
                    }
                }),
            )
            .unwrap();
        registry
    }

    fn selects(resolved: &ResolvedOutline<'_>) -> Vec<String> {
        resolved.select.iter().map(|s| s.render()).collect()
    }

    #[test]
    fn empty_path_resolves_to_index() {
        let registry = registry();
        let figure = registry.figure("metrics").unwrap();
        let resolved = resolve_outline(&registry, figure, &[]).unwrap();
        assert_eq!(selects(&resolved), vec!["value".to_string()]);
        assert_eq!(resolved.seed.where_clause.as_deref(), Some("b > 10"));
    }

    #[test]
    fn group_key_does_not_consume_a_segment() {
        let registry = registry();
        let figure = registry.figure("metrics").unwrap();
        let resolved = resolve_outline(&registry, figure, &["count"]).unwrap();
        assert_eq!(selects(&resolved), vec!["count(o.*) as count".to_string()]);
        // base schema + the group node's patch
        assert_eq!(resolved.scopes.len(), 2);
    }

    #[test]
    fn pattern_alternatives_resolve_to_the_same_node() {
        let registry = registry();
        let figure = registry.figure("metrics").unwrap();
        let count = resolve_outline(&registry, figure, &["count"]).unwrap();
        let total = resolve_outline(&registry, figure, &["total"]).unwrap();
        assert_eq!(selects(&count), selects(&total));
    }

    #[test]
    fn unmatched_path_is_not_found() {
        let registry = registry();
        let figure = registry.figure("metrics").unwrap();
        let err = resolve_outline(&registry, figure, &["count", "deeper"]).unwrap_err();
        assert_eq!(err, ConfigError::PathNotFound("count/deeper".to_string()));
    }

    #[test]
    fn inherit_replaces_seed_and_scopes_then_overlays() {
        let registry = registry();
        let figure = registry.figure("metrics").unwrap();
        let resolved = resolve_outline(&registry, figure, &["linked"]).unwrap();

        // local select first, inherited second
        assert_eq!(
            selects(&resolved),
            vec!["that".to_string(), "status".to_string()]
        );
        // the inherited figure's seed, not the local one
        assert_eq!(resolved.seed.where_clause, None);
        assert_eq!(resolved.seed.tables, vec!["from orders".to_string()]);
        assert_eq!(
            resolved.tables,
            vec!["inner join status using (sid)"]
        );
        // orders base schema + by_status patch; the local chain is replaced
        assert_eq!(resolved.scopes.len(), 2);
    }

    #[test]
    fn unknown_inherit_target_is_reported() {
        let mut registry = Registry::new();
        registry
            .register(
                "metrics",
                &json!({
                    "outline": {"/broken": {"inherit": "nowhere/at_all", "select": "x"}}
                }),
            )
            .unwrap();
        let figure = registry.figure("metrics").unwrap();
        let err = resolve_outline(&registry, figure, &["broken"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownInheritTarget("nowhere/at_all".to_string())
        );
    }

    #[test]
    fn inherit_cycles_are_detected() {
        let mut registry = Registry::new();
        registry
            .register(
                "ping",
                &json!({"outline": {"/loop": {"inherit": "pong/loop", "select": "p"}}}),
            )
            .unwrap();
        registry
            .register(
                "pong",
                &json!({"outline": {"/loop": {"inherit": "ping/loop", "select": "q"}}}),
            )
            .unwrap();
        let figure = registry.figure("ping").unwrap();
        let err = resolve_outline(&registry, figure, &["loop"]).unwrap_err();
        assert!(matches!(err, ConfigError::CycleDetected(_)));
    }

    #[test]
    fn literal_children_win_over_patterns() {
        let mut registry = Registry::new();
        registry
            .register(
                "routes",
                &json!({
                    "outline": {
                        "/c.*": {"select": "pattern"},
                        "count": {"select": "literal"}
                    }
                }),
            )
            .unwrap();
        let figure = registry.figure("routes").unwrap();
        let resolved = resolve_outline(&registry, figure, &["count"]).unwrap();
        assert_eq!(selects(&resolved), vec!["literal".to_string()]);
    }
}
