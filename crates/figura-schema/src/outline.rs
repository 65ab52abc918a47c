//! Outline trees: the navigable shape of a figure.
//!
//! An outline is a nested tree of nodes keyed by path-segment patterns. Each
//! node describes one query variant (`select`/`tables`, or a raw `query`
//! template) and may patch the argument schema for everything resolved
//! through it.
//!
//! Definition surface:
//! - a plain key is a literal segment (`"index"` is the fallback child when
//!   no segments remain),
//! - a `/`-prefixed key is a regular expression matched against the whole
//!   segment (`"/(count|total)"`),
//! - the bare key `/` is a transparent group: it matches without consuming a
//!   segment, so its children are tried against the same segment,
//! - `"&arguments"` attaches a scope patch, `"inherit"` references another
//!   node as `"<figure>/<path...>"`.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arguments::{parse_layer, ScopeLayer};
use crate::error::DefError;

/// Name of the child selected when no path segments remain.
pub const INDEX_KEY: &str = "index";

// ============================================================================
// Matchers
// ============================================================================

/// A pre-compiled key matcher for outline children and argument options.
///
/// Compiled once at registration so per-call resolution is a sequence of
/// string/regex comparisons, never re-parsing.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Exact string key.
    Literal(String),
    /// Regex key, anchored to the whole candidate.
    Pattern { source: String, regex: Regex },
}

impl KeyPattern {
    /// Parse an outline child key: literal unless `/`-prefixed.
    pub fn segment(key: &str, at: &str) -> Result<Self, DefError> {
        match key.strip_prefix('/') {
            Some(pattern) => Self::compiled(pattern, at),
            None => Ok(Self::Literal(key.to_string())),
        }
    }

    /// Parse an argument option key. Option keys are always regexes
    /// (`"days?"` matches both `day` and `days`).
    pub fn option(key: &str, at: &str) -> Result<Self, DefError> {
        Self::compiled(key, at)
    }

    fn compiled(pattern: &str, at: &str) -> Result<Self, DefError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| DefError::Pattern {
            at: at.to_string(),
            source,
        })?;
        Ok(Self::Pattern {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether this key matches the whole candidate string.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Literal(key) => key == candidate,
            Self::Pattern { regex, .. } => regex.is_match(candidate),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// The bare `/` key: matches any segment without consuming it.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Pattern { source, .. } if source.is_empty())
    }

    /// The raw key text, for diagnostics.
    pub fn source(&self) -> &str {
        match self {
            Self::Literal(key) => key,
            Self::Pattern { source, .. } => source,
        }
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern { source: a, .. }, Self::Pattern { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

// ============================================================================
// Node fields
// ============================================================================

/// A node's select contribution: verbatim text, or an aggregate descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectExpr {
    Raw(String),
    Aggregate {
        agg: String,
        column: String,
        #[serde(rename = "as")]
        alias: String,
    },
}

impl SelectExpr {
    /// Canonical SQL text of this select item.
    pub fn render(&self) -> String {
        match self {
            Self::Raw(text) => text.clone(),
            Self::Aggregate { agg, column, alias } => format!("{agg}({column}) as {alias}"),
        }
    }

    fn parse(value: &Value, at: &str) -> Result<Self, DefError> {
        match value {
            Value::String(text) => Ok(Self::Raw(text.clone())),
            Value::Object(map) => {
                for key in map.keys() {
                    if !matches!(key.as_str(), "agg" | "column" | "as") {
                        return Err(DefError::invalid(at, format!("unknown select field `{key}`")));
                    }
                }
                let field = |name: &str| -> Result<String, DefError> {
                    map.get(name)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            DefError::invalid(at, format!("select descriptor needs string `{name}`"))
                        })
                };
                Ok(Self::Aggregate {
                    agg: field("agg")?,
                    column: field("column")?,
                    alias: field("as")?,
                })
            }
            _ => Err(DefError::invalid(
                at,
                "select must be a string or an {agg, column, as} descriptor",
            )),
        }
    }
}

/// A cross-reference to another outline node, `"<figure>/<path...>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritRef {
    pub figure: String,
    pub path: Vec<String>,
}

impl InheritRef {
    pub fn parse(text: &str, at: &str) -> Result<Self, DefError> {
        let mut parts = text.split('/').filter(|p| !p.is_empty());
        let figure = parts
            .next()
            .ok_or_else(|| DefError::invalid(at, "inherit reference is empty"))?
            .to_string();
        Ok(Self {
            figure,
            path: parts.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for InheritRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.figure)?;
        for segment in &self.path {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// One node of an outline tree, immutable after registration.
#[derive(Debug, Clone)]
pub struct OutlineNode {
    pub key: KeyPattern,
    pub select: Option<SelectExpr>,
    pub tables: Vec<String>,
    pub query: Option<String>,
    pub inherit: Option<InheritRef>,
    /// This node's `&arguments` scope patch (may be empty).
    pub arguments: ScopeLayer,
    /// Children in declaration order. Matching checks literals before
    /// patterns; declaration order breaks ties within each class.
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// The child used when no path segments remain, if declared.
    pub fn index_child(&self) -> Option<&OutlineNode> {
        self.children
            .iter()
            .find(|child| matches!(&child.key, KeyPattern::Literal(key) if key == INDEX_KEY))
    }

    fn parse(key: KeyPattern, value: &Value, at: &str) -> Result<Self, DefError> {
        let map = value
            .as_object()
            .ok_or_else(|| DefError::invalid(at, "outline node must be an object"))?;

        let mut node = OutlineNode {
            key,
            select: None,
            tables: Vec::new(),
            query: None,
            inherit: None,
            arguments: ScopeLayer::default(),
            children: Vec::new(),
        };

        for (key, entry) in map {
            let child_at = format!("{at}/{key}");
            match key.as_str() {
                "select" => node.select = Some(SelectExpr::parse(entry, &child_at)?),
                "tables" => node.tables = parse_string_list(entry, &child_at)?,
                "query" => {
                    node.query = Some(
                        entry
                            .as_str()
                            .ok_or_else(|| DefError::invalid(&child_at, "query must be a string"))?
                            .to_string(),
                    )
                }
                "inherit" => {
                    let text = entry.as_str().ok_or_else(|| {
                        DefError::invalid(&child_at, "inherit must be a string reference")
                    })?;
                    node.inherit = Some(InheritRef::parse(text, &child_at)?);
                }
                "&arguments" => node.arguments = parse_layer(entry, &child_at)?,
                _ => {
                    let child_key = KeyPattern::segment(key, &child_at)?;
                    node.children
                        .push(OutlineNode::parse(child_key, entry, &child_at)?);
                }
            }
        }

        if node.select.is_some() && node.query.is_some() {
            return Err(DefError::invalid(at, "node declares both `select` and `query`"));
        }
        Ok(node)
    }
}

/// Parse a whole outline tree. The returned root carries an empty literal key.
pub fn parse_outline(value: &Value, at: &str) -> Result<OutlineNode, DefError> {
    OutlineNode::parse(KeyPattern::Literal(String::new()), value, at)
}

/// Accept either `"one"` or `["one", "two"]`.
pub(crate) fn parse_string_list(value: &Value, at: &str) -> Result<Vec<String>, DefError> {
    match value {
        Value::String(one) => Ok(vec![one.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DefError::invalid(at, "expected a string or list of strings"))
            })
            .collect(),
        _ => Err(DefError::invalid(at, "expected a string or list of strings")),
    }
}
