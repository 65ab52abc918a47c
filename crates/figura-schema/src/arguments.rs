//! Argument schemas: validators, column bindings, options, scope patches.
//!
//! Definition surface:
//! - a name ending in `[]` is array-valued (`"a[]"` binds caller key `a`),
//! - inside an `&arguments` block, a `&`-prefixed name patches only the
//!   listed fields of an argument introduced by an earlier layer; a plain
//!   name (re)declares the whole spec,
//! - the merge marker is recursive: inside a patch, `&options` merges option
//!   entries per key instead of replacing the whole table (same for
//!   `&ignore`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DefError;
use crate::outline::{parse_string_list, KeyPattern};

// ============================================================================
// Specs
// ============================================================================

/// Type token a caller-supplied value is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    String,
    Integer,
    Number,
    Boolean,
    /// Accept any value unchanged. Used when a spec declares no validator.
    Any,
}

impl Validator {
    pub fn parse(token: &str, at: &str) -> Result<Self, DefError> {
        match token {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "any" => Ok(Self::Any),
            other => Err(DefError::invalid(
                at,
                format!("unknown validator token `{other}`"),
            )),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }
}

/// A SQL binding expression, split once at registration into the bare column
/// and an optional `::cast` suffix (`"col_a::text"` → `col_a`, `text`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnExpr {
    pub column: String,
    pub cast: Option<String>,
}

impl ColumnExpr {
    pub fn parse(text: &str) -> Self {
        match text.split_once("::") {
            Some((column, cast)) => Self {
                column: column.to_string(),
                cast: Some(cast.to_string()),
            },
            None => Self {
                column: text.to_string(),
                cast: None,
            },
        }
    }
}

/// One `options` entry: a value-keyed override of the argument's
/// contribution. A matching option replaces the argument's filter with a
/// select fragment and makes `value` the effective bound value (the group-by
/// target).
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub key: KeyPattern,
    pub select: Option<String>,
    pub value: Option<Value>,
}

/// A fully declared argument.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub validator: Option<Validator>,
    pub default: Option<Value>,
    pub required: bool,
    pub column: Option<ColumnExpr>,
    /// When false the argument never contributes a WHERE filter (it may
    /// still steer `select`/group-by through `options`).
    pub adapt: bool,
    pub options: Vec<OptionSpec>,
    /// Sibling arguments suppressed when this argument's value is truthy.
    pub ignore: Vec<String>,
    /// Declared with the `[]` suffix: accepts a list as well as a scalar.
    pub array: bool,
}

impl ArgumentSpec {
    fn empty(array: bool) -> Self {
        Self {
            validator: None,
            default: None,
            required: false,
            column: None,
            adapt: true,
            options: Vec::new(),
            ignore: Vec::new(),
            array,
        }
    }
}

// ============================================================================
// Scope layers
// ============================================================================

/// Whether a patched table-valued field replaces or extends the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Replace,
    Extend,
}

/// Field-level (`&`-marked) override of an existing argument spec. Unset
/// fields pass through from the spec being patched.
#[derive(Debug, Clone, Default)]
pub struct SpecPatch {
    pub validator: Option<Validator>,
    pub default: Option<Value>,
    pub required: Option<bool>,
    pub column: Option<ColumnExpr>,
    pub adapt: Option<bool>,
    pub options: Option<(MergeMode, Vec<OptionSpec>)>,
    pub ignore: Option<(MergeMode, Vec<String>)>,
}

impl SpecPatch {
    /// Apply this patch on top of an existing spec.
    pub fn apply(&self, spec: &mut ArgumentSpec) {
        if let Some(validator) = self.validator {
            spec.validator = Some(validator);
        }
        if let Some(default) = &self.default {
            spec.default = Some(default.clone());
        }
        if let Some(required) = self.required {
            spec.required = required;
        }
        if let Some(column) = &self.column {
            spec.column = Some(column.clone());
        }
        if let Some(adapt) = self.adapt {
            spec.adapt = adapt;
        }
        match &self.options {
            Some((MergeMode::Replace, options)) => spec.options = options.clone(),
            Some((MergeMode::Extend, options)) => {
                for option in options {
                    match spec.options.iter_mut().find(|o| o.key == option.key) {
                        Some(slot) => *slot = option.clone(),
                        None => spec.options.push(option.clone()),
                    }
                }
            }
            None => {}
        }
        match &self.ignore {
            Some((MergeMode::Replace, ignore)) => spec.ignore = ignore.clone(),
            Some((MergeMode::Extend, ignore)) => {
                for name in ignore {
                    if !spec.ignore.contains(name) {
                        spec.ignore.push(name.clone());
                    }
                }
            }
            None => {}
        }
    }

    /// Materialize a patch that targets nothing as a fresh spec.
    pub fn to_spec(&self, array: bool) -> ArgumentSpec {
        let mut spec = ArgumentSpec::empty(array);
        self.apply(&mut spec);
        spec
    }
}

/// One entry of an `&arguments` block.
#[derive(Debug, Clone)]
pub struct ScopeEntry {
    /// Caller-facing name, `[]` suffix stripped.
    pub name: String,
    /// Whether the declared name carried the `[]` suffix.
    pub array: bool,
    pub kind: ScopeEntryKind,
}

#[derive(Debug, Clone)]
pub enum ScopeEntryKind {
    /// Plain name: a complete spec that introduces or replaces the argument.
    Full(ArgumentSpec),
    /// `&`-marked name: a field-level patch of an earlier declaration.
    Partial(SpecPatch),
}

/// The argument-schema override one outline node contributes. The figure's
/// base `arguments` table is represented the same way (all entries full).
#[derive(Debug, Clone, Default)]
pub struct ScopeLayer {
    pub entries: Vec<ScopeEntry>,
}

impl ScopeLayer {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Strip the array marker: `"a[]"` → (`"a"`, true).
fn split_array_suffix(name: &str) -> (&str, bool) {
    match name.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (name, false),
    }
}

/// Parse an `arguments` / `&arguments` block into one scope layer.
pub fn parse_layer(value: &Value, at: &str) -> Result<ScopeLayer, DefError> {
    let map = value
        .as_object()
        .ok_or_else(|| DefError::invalid(at, "arguments must be an object"))?;

    let mut layer = ScopeLayer::default();
    for (raw_name, entry) in map {
        let entry_at = format!("{at}/{raw_name}");
        let (name, partial) = match raw_name.strip_prefix('&') {
            Some(rest) => (rest, true),
            None => (raw_name.as_str(), false),
        };
        let (name, array) = split_array_suffix(name);
        if name.is_empty() {
            return Err(DefError::invalid(&entry_at, "argument name is empty"));
        }
        let fields = entry
            .as_object()
            .ok_or_else(|| DefError::invalid(&entry_at, "argument spec must be an object"))?;

        let kind = if partial {
            ScopeEntryKind::Partial(parse_patch(fields, &entry_at)?)
        } else {
            ScopeEntryKind::Full(parse_spec(fields, array, &entry_at)?)
        };
        layer.entries.push(ScopeEntry {
            name: name.to_string(),
            array,
            kind,
        });
    }
    Ok(layer)
}

fn parse_spec(
    fields: &serde_json::Map<String, Value>,
    array: bool,
    at: &str,
) -> Result<ArgumentSpec, DefError> {
    let mut spec = ArgumentSpec::empty(array);
    for (field, value) in fields {
        let field_at = format!("{at}/{field}");
        match field.as_str() {
            "validator" => {
                let token = value
                    .as_str()
                    .ok_or_else(|| DefError::invalid(&field_at, "validator must be a string"))?;
                spec.validator = Some(Validator::parse(token, &field_at)?);
            }
            "default" => spec.default = Some(value.clone()),
            "required" => spec.required = expect_bool(value, &field_at)?,
            "column" => spec.column = Some(parse_column(value, &field_at)?),
            "adapt" => spec.adapt = expect_bool(value, &field_at)?,
            "options" => spec.options = parse_options(value, &field_at)?,
            "ignore" => spec.ignore = parse_string_list(value, &field_at)?,
            other => {
                return Err(DefError::invalid(
                    at,
                    format!("unknown argument field `{other}`"),
                ))
            }
        }
    }
    Ok(spec)
}

fn parse_patch(fields: &serde_json::Map<String, Value>, at: &str) -> Result<SpecPatch, DefError> {
    let mut patch = SpecPatch::default();
    for (raw_field, value) in fields {
        let field_at = format!("{at}/{raw_field}");
        // The merge marker is recursive: `&options`/`&ignore` extend instead
        // of replace. On scalar fields the marker is accepted and means the
        // same as the plain name.
        let (field, marked) = match raw_field.strip_prefix('&') {
            Some(rest) => (rest, true),
            None => (raw_field.as_str(), false),
        };
        let mode = if marked {
            MergeMode::Extend
        } else {
            MergeMode::Replace
        };
        match field {
            "validator" => {
                let token = value
                    .as_str()
                    .ok_or_else(|| DefError::invalid(&field_at, "validator must be a string"))?;
                patch.validator = Some(Validator::parse(token, &field_at)?);
            }
            "default" => patch.default = Some(value.clone()),
            "required" => patch.required = Some(expect_bool(value, &field_at)?),
            "column" => patch.column = Some(parse_column(value, &field_at)?),
            "adapt" => patch.adapt = Some(expect_bool(value, &field_at)?),
            "options" => patch.options = Some((mode, parse_options(value, &field_at)?)),
            "ignore" => patch.ignore = Some((mode, parse_string_list(value, &field_at)?)),
            other => {
                return Err(DefError::invalid(
                    at,
                    format!("unknown argument field `{other}`"),
                ))
            }
        }
    }
    Ok(patch)
}

fn parse_options(value: &Value, at: &str) -> Result<Vec<OptionSpec>, DefError> {
    let map = value
        .as_object()
        .ok_or_else(|| DefError::invalid(at, "options must be an object"))?;

    let mut options = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let option_at = format!("{at}/{key}");
        let fields = entry
            .as_object()
            .ok_or_else(|| DefError::invalid(&option_at, "option must be an object"))?;
        let mut option = OptionSpec {
            key: KeyPattern::option(key, &option_at)?,
            select: None,
            value: None,
        };
        for (field, field_value) in fields {
            match field.as_str() {
                "select" => {
                    option.select = Some(
                        field_value
                            .as_str()
                            .ok_or_else(|| {
                                DefError::invalid(&option_at, "option select must be a string")
                            })?
                            .to_string(),
                    )
                }
                "value" => option.value = Some(field_value.clone()),
                other => {
                    return Err(DefError::invalid(
                        &option_at,
                        format!("unknown option field `{other}`"),
                    ))
                }
            }
        }
        options.push(option);
    }
    Ok(options)
}

fn parse_column(value: &Value, at: &str) -> Result<ColumnExpr, DefError> {
    value
        .as_str()
        .map(ColumnExpr::parse)
        .ok_or_else(|| DefError::invalid(at, "column must be a string"))
}

fn expect_bool(value: &Value, at: &str) -> Result<bool, DefError> {
    value
        .as_bool()
        .ok_or_else(|| DefError::invalid(at, "expected a boolean"))
}
