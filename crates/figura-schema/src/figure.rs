//! Figures: named, immutable query definition bundles.
//!
//! A figure couples an outline tree with a base argument schema and seed
//! clauses that every resolved path starts from. Figures are parsed from
//! JSON definitions once, at registration, and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arguments::{parse_layer, ScopeLayer};
use crate::error::DefError;
use crate::outline::{parse_outline, parse_string_list, OutlineNode};

/// Figure-level baseline clauses applied to every path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    /// Emitted verbatim as the first WHERE condition.
    pub where_clause: Option<String>,
    /// Emitted before any node-level join fragments.
    pub tables: Vec<String>,
    /// Fallback select list for nodes that declare none.
    pub select: Option<String>,
}

impl Seed {
    pub fn is_empty(&self) -> bool {
        self.where_clause.is_none() && self.tables.is_empty() && self.select.is_none()
    }
}

/// A named query definition bundle: outline + base argument schema + seed.
#[derive(Debug, Clone)]
pub struct Figure {
    pub id: String,
    pub title: Option<String>,
    pub help: Option<String>,
    /// Alternate lookup names.
    pub aliases: Vec<String>,
    pub outline: OutlineNode,
    /// Base argument schema; the first layer of every scope chain.
    pub arguments: ScopeLayer,
    pub seed: Seed,
}

/// Parse a JSON figure definition into its immutable registered form.
pub fn parse_figure(id: &str, definition: &Value) -> Result<Figure, DefError> {
    let map = definition
        .as_object()
        .ok_or_else(|| DefError::invalid(id, "figure definition must be an object"))?;

    let mut figure = Figure {
        id: id.to_string(),
        title: None,
        help: None,
        aliases: Vec::new(),
        outline: parse_outline(
            map.get("outline")
                .ok_or_else(|| DefError::invalid(id, "figure has no outline"))?,
            &format!("{id}/outline"),
        )?,
        arguments: ScopeLayer::default(),
        seed: Seed::default(),
    };

    for (key, value) in map {
        let at = format!("{id}/{key}");
        match key.as_str() {
            "outline" => {}
            "title" => figure.title = Some(expect_str(value, &at)?),
            "help" => figure.help = Some(expect_str(value, &at)?),
            "alias" => figure.aliases = parse_string_list(value, &at)?,
            "arguments" => figure.arguments = parse_layer(value, &at)?,
            "where" => figure.seed.where_clause = Some(expect_str(value, &at)?),
            "tables" => figure.seed.tables = parse_string_list(value, &at)?,
            "select" => figure.seed.select = Some(expect_str(value, &at)?),
            other => {
                tracing::warn!(figure = id, key = other, "ignoring unknown definition key");
            }
        }
    }
    Ok(figure)
}

fn expect_str(value: &Value, at: &str) -> Result<String, DefError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DefError::invalid(at, "expected a string"))
}
