//! Argument resolution: scope chain + caller values → ordered bindings.
//!
//! Folds the scope chain into one effective schema (later layers win,
//! `&`-marked entries patch field-wise), then applies defaults, required
//! checks, `ignore` suppression, and `options` matching. Output order is the
//! effective-schema declaration order (base schema first, later-introduced
//! names appended where they first appeared) and becomes the emission order
//! of the generated filter clauses.

use serde_json::{Map, Value};

use figura_schema::{ArgumentSpec, ColumnExpr, ScopeEntryKind, ScopeLayer, Validator};

use crate::coerce::Coerce;
use crate::error::ValidationError;

/// One argument after resolution, ready for the SQL compiler.
#[derive(Debug, Clone)]
pub struct ResolvedArgument {
    pub name: String,
    /// Coerced value; an option match substitutes the option's `value`.
    pub value: Value,
    pub column: Option<ColumnExpr>,
    /// Whether the resolved value is a list (containment filter form).
    pub is_array: bool,
    /// Caller-supplied, as opposed to filled from a default.
    pub supplied: bool,
    /// Whether this argument emits a WHERE condition.
    pub contributes_filter: bool,
    /// Select fragment contributed by a matched option.
    pub select_override: Option<String>,
    /// Group-by target contributed by a matched option.
    pub group_by: Option<String>,
}

/// Resolve the supplied values against the folded scope chain.
pub fn resolve_arguments(
    scopes: &[&ScopeLayer],
    supplied: &Map<String, Value>,
    coercer: &dyn Coerce,
) -> Result<Vec<ResolvedArgument>, ValidationError> {
    let mut schema = effective_schema(scopes);

    let unknown: Vec<&str> = supplied
        .keys()
        .filter(|name| !schema.iter().any(|(declared, _)| declared == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::AdditionalProperties(unknown.join(", ")));
    }

    // Tentative values: the caller's value wins over the default.
    let mut values: Vec<Option<(Value, bool)>> = schema
        .iter()
        .map(|(name, spec)| {
            supplied
                .get(name)
                .cloned()
                .map(|value| (value, true))
                .or_else(|| spec.default.clone().map(|value| (value, false)))
        })
        .collect();

    // Truthy ignore-bearing arguments suppress their siblings. Supplying a
    // value for a suppressed sibling is an error; a defaulted one is
    // silently dropped.
    let mut ignored_names: Vec<String> = Vec::new();
    for ((_, spec), value) in schema.iter().zip(&values) {
        if spec.ignore.is_empty() {
            continue;
        }
        if matches!(value, Some((value, _)) if truthy(value)) {
            for target in &spec.ignore {
                if !ignored_names.contains(target) {
                    ignored_names.push(target.clone());
                }
            }
        }
    }
    if !ignored_names.is_empty() {
        let clashing: Vec<&str> = ignored_names
            .iter()
            .map(String::as_str)
            .filter(|name| supplied.contains_key(*name))
            .collect();
        if !clashing.is_empty() {
            return Err(ValidationError::AdditionalProperties(clashing.join(", ")));
        }
        let (kept_schema, kept_values) = schema
            .into_iter()
            .zip(values)
            .filter(|((name, _), _)| !ignored_names.contains(name))
            .unzip();
        schema = kept_schema;
        values = kept_values;
    }

    let missing: Vec<&str> = schema
        .iter()
        .zip(&values)
        .filter(|((_, spec), value)| value.is_none() && spec.required)
        .map(|((name, _), _)| name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingRequiredProperty(missing.join(", ")));
    }

    let mut resolved = Vec::with_capacity(schema.len());
    for ((name, spec), slot) in schema.iter().zip(values) {
        let Some((raw, was_supplied)) = slot else {
            continue;
        };
        let validator = spec.validator.unwrap_or(Validator::Any);
        let mut value = coercer.coerce(name, validator, spec.array, &raw)?;

        let mut select_override = None;
        let mut group_by = None;
        let mut option_matched = false;
        if !spec.options.is_empty() {
            if let Some(text) = scalar_text(&value) {
                if let Some(option) = spec.options.iter().find(|o| o.key.matches(&text)) {
                    option_matched = true;
                    select_override = option.select.clone();
                    if let Some(substituted) = &option.value {
                        group_by = Some(bare_text(substituted));
                        value = substituted.clone();
                    }
                }
            }
        }

        let contributes_filter = spec.adapt && !option_matched && spec.column.is_some();
        resolved.push(ResolvedArgument {
            name: name.clone(),
            is_array: value.is_array(),
            value,
            column: spec.column.clone(),
            supplied: was_supplied,
            contributes_filter,
            select_override,
            group_by,
        });
    }
    Ok(resolved)
}

/// Fold the scope chain into one ordered schema. Full entries replace,
/// partial entries patch; names keep the position of their first
/// introduction.
fn effective_schema(scopes: &[&ScopeLayer]) -> Vec<(String, ArgumentSpec)> {
    let mut schema: Vec<(String, ArgumentSpec)> = Vec::new();
    for layer in scopes {
        for entry in &layer.entries {
            let slot = schema
                .iter_mut()
                .find(|(name, _)| name == &entry.name)
                .map(|(_, spec)| spec);
            match (&entry.kind, slot) {
                (ScopeEntryKind::Full(spec), Some(existing)) => *existing = spec.clone(),
                (ScopeEntryKind::Full(spec), None) => {
                    schema.push((entry.name.clone(), spec.clone()));
                }
                (ScopeEntryKind::Partial(patch), Some(existing)) => patch.apply(existing),
                (ScopeEntryKind::Partial(patch), None) => {
                    // Definitions in the wild patch arguments nothing
                    // declares; tolerate it and let the patch seed the spec.
                    tracing::warn!(
                        argument = %entry.name,
                        "partial override targets an undeclared argument"
                    );
                    schema.push((entry.name.clone(), patch.to_spec(entry.array)));
                }
            }
        }
    }
    schema
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The text an option key is matched against. Lists never match options.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Bare (unquoted) text of an option's substituted value.
fn bare_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
