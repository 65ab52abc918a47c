//! SQL assembly: resolved outline + resolved arguments → one statement.
//!
//! Two shapes:
//! - select-shaped nodes assemble `select ... from ... where ... group by`,
//! - template-shaped nodes expand `%(name)s` placeholders in a raw query
//!   string, with the `columns`/`values`/`updates` names reserved for the
//!   supplied-argument projections.
//!
//! Literal formatting follows PostgreSQL conventions: strings single-quoted
//! with `'` doubled, numbers and booleans bare. Casts declared on a column
//! binding attach to the literal (`col_a = 'Hello'::text`), or to the array
//! constructor for containment filters.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::arguments::ResolvedArgument;
use crate::error::CompileError;
use crate::outline::ResolvedOutline;

/// Render the final SQL statement.
pub fn compile(
    outline: &ResolvedOutline<'_>,
    arguments: &[ResolvedArgument],
) -> Result<String, CompileError> {
    match outline.query {
        Some(template) => compile_template(template, arguments),
        None => Ok(compile_select(outline, arguments)),
    }
}

// ============================================================================
// Select-shaped statements
// ============================================================================

fn compile_select(outline: &ResolvedOutline<'_>, arguments: &[ResolvedArgument]) -> String {
    let mut select: Vec<String> = arguments
        .iter()
        .filter_map(|argument| argument.select_override.clone())
        .collect();
    if outline.select.is_empty() {
        if let Some(seed_select) = &outline.seed.select {
            select.push(seed_select.clone());
        }
    } else {
        select.extend(outline.select.iter().map(|part| part.render()));
    }
    if select.is_empty() {
        // nothing declared anywhere on the path
        select.push("*".to_string());
    }

    let mut sql = format!("select {}", select.join(", "));

    let tables: Vec<&str> = outline
        .seed
        .tables
        .iter()
        .map(String::as_str)
        .chain(outline.tables.iter().copied())
        .collect();
    if !tables.is_empty() {
        sql.push(' ');
        sql.push_str(&tables.join(" "));
    }

    let mut conditions: Vec<String> = Vec::new();
    if let Some(seed_where) = &outline.seed.where_clause {
        conditions.push(seed_where.clone());
    }
    conditions.extend(
        arguments
            .iter()
            .filter(|argument| argument.contributes_filter)
            .filter_map(condition),
    );
    if !conditions.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&conditions.join(" and "));
    }

    let targets: Vec<&str> = arguments
        .iter()
        .filter_map(|argument| argument.group_by.as_deref())
        .collect();
    if !targets.is_empty() {
        sql.push_str(" group by ");
        sql.push_str(&targets.join(", "));
    }
    sql
}

/// One WHERE condition. Scalars bind as equality against the column, lists
/// as an array containment test.
fn condition(argument: &ResolvedArgument) -> Option<String> {
    let column = argument.column.as_ref()?;
    Some(match &argument.value {
        Value::Array(items) => {
            let literals: Vec<String> = items.iter().map(literal).collect();
            let cast = column
                .cast
                .as_deref()
                .map(|cast| format!("::{cast}[]"))
                .unwrap_or_default();
            format!(
                "ARRAY[{}]{cast} @> array[{}]",
                literals.join(", "),
                column.column
            )
        }
        scalar => {
            let cast = column
                .cast
                .as_deref()
                .map(|cast| format!("::{cast}"))
                .unwrap_or_default();
            format!("{} = {}{cast}", column.column, literal(scalar))
        }
    })
}

// ============================================================================
// Template-shaped statements
// ============================================================================

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%\((\w+)\)s").expect("placeholder pattern"))
}

fn compile_template(
    template: &str,
    arguments: &[ResolvedArgument],
) -> Result<String, CompileError> {
    let regex = placeholder_regex();

    // Arguments referenced by their own placeholder are statement keys (the
    // WHERE side of an update) and stay out of `%(updates)s`.
    let named: HashSet<&str> = regex
        .captures_iter(template)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str())
        .filter(|name| !matches!(*name, "columns" | "values" | "updates"))
        .collect();

    let supplied: Vec<&ResolvedArgument> = arguments
        .iter()
        .filter(|argument| argument.supplied)
        .collect();

    let mut output = String::with_capacity(template.len());
    let mut last = 0;
    for captures in regex.captures_iter(template) {
        let token = captures.get(0).expect("whole match");
        let name = captures.get(1).expect("capture group").as_str();
        output.push_str(&template[last..token.start()]);
        match name {
            "columns" => {
                let columns: Vec<&str> =
                    supplied.iter().map(|argument| column_name(argument)).collect();
                output.push_str(&columns.join(", "));
            }
            "values" => {
                let values: Vec<String> = supplied
                    .iter()
                    .map(|argument| literal(&argument.value))
                    .collect();
                output.push_str(&values.join(", "));
            }
            "updates" => {
                let updates: Vec<String> = supplied
                    .iter()
                    .filter(|argument| !named.contains(argument.name.as_str()))
                    .map(|argument| {
                        format!(
                            "{}={}{}",
                            column_name(argument),
                            literal(&argument.value),
                            cast_suffix(argument)
                        )
                    })
                    .collect();
                output.push_str(&updates.join(", "));
            }
            other => {
                let argument = arguments
                    .iter()
                    .find(|argument| argument.name == other)
                    .ok_or_else(|| CompileError::UnresolvedPlaceholder(other.to_string()))?;
                // The template text carries any cast, so the literal stays
                // bare (`where id=%(id)s::int` → `where id=10::int`).
                output.push_str(&literal(&argument.value));
            }
        }
        last = token.end();
    }
    output.push_str(&template[last..]);
    Ok(output)
}

fn column_name(argument: &ResolvedArgument) -> &str {
    argument
        .column
        .as_ref()
        .map(|column| column.column.as_str())
        .unwrap_or(argument.name.as_str())
}

fn cast_suffix(argument: &ResolvedArgument) -> String {
    argument
        .column
        .as_ref()
        .and_then(|column| column.cast.as_deref())
        .map(|cast| format!("::{cast}"))
        .unwrap_or_default()
}

/// PostgreSQL literal text of a value. A list renders as a bare
/// comma-joined sequence (the array constructor wraps it where needed).
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => format!("'{}'", text.replace('\'', "''")),
        Value::Array(items) => items
            .iter()
            .map(literal)
            .collect::<Vec<String>>()
            .join(", "),
        Value::Object(_) => format!("'{}'", value.to_string().replace('\'', "''")),
    }
}
