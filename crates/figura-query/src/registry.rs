//! The figure registry: setup-phase registration, shared-read resolution.
//!
//! Registration happens through `&mut self` before any resolution; dropping
//! to a shared reference is the happens-before barrier. After that the
//! registry is read-only (figures are immutable and resolution is a pure
//! function), so any number of threads may resolve concurrently without
//! locks.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use figura_schema::{parse_figure, DefError, Figure};

use crate::arguments::resolve_arguments;
use crate::coerce::{Coerce, StrictCoercer};
use crate::error::{ConfigError, Error};
use crate::navigator::Navigator;
use crate::outline::resolve_outline;
use crate::sql::compile;

/// Holds registered figures by id, with an alias index, and drives the
/// resolve → bind → compile pipeline.
pub struct Registry {
    figures: HashMap<String, Figure>,
    aliases: HashMap<String, String>,
    coercer: Box<dyn Coerce>,
}

impl Registry {
    /// A registry using the shipped [`StrictCoercer`].
    pub fn new() -> Self {
        Self::with_coercer(Box::new(StrictCoercer))
    }

    /// A registry delegating value coercion to the given collaborator.
    pub fn with_coercer(coercer: Box<dyn Coerce>) -> Self {
        Self {
            figures: HashMap::new(),
            aliases: HashMap::new(),
            coercer,
        }
    }

    /// Register a figure definition under `id`. Ids and aliases share one
    /// namespace; re-registering either is rejected.
    pub fn register(&mut self, id: &str, definition: &Value) -> Result<(), DefError> {
        if self.figures.contains_key(id) || self.aliases.contains_key(id) {
            return Err(DefError::DuplicateFigure(id.to_string()));
        }
        let figure = parse_figure(id, definition)?;
        let mut seen: Vec<&str> = Vec::new();
        for alias in &figure.aliases {
            if alias == id
                || self.figures.contains_key(alias)
                || self.aliases.contains_key(alias)
                || seen.contains(&alias.as_str())
            {
                return Err(DefError::DuplicateAlias(alias.clone()));
            }
            seen.push(alias);
        }
        for alias in &figure.aliases {
            self.aliases.insert(alias.clone(), id.to_string());
        }
        tracing::debug!(figure = id, aliases = figure.aliases.len(), "registered figure");
        self.figures.insert(id.to_string(), figure);
        Ok(())
    }

    /// [`Registry::register`] for definitions still in JSON text form.
    pub fn register_str(&mut self, id: &str, definition: &str) -> Result<(), DefError> {
        let value: Value = serde_json::from_str(definition)
            .map_err(|err| DefError::invalid(id, err.to_string()))?;
        self.register(id, &value)
    }

    /// Look a figure up by id or alias.
    pub fn figure(&self, name: &str) -> Option<&Figure> {
        self.figures.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|id| self.figures.get(id))
        })
    }

    /// Resolve a navigation path and argument set to the compiled SQL.
    pub fn resolve(
        &self,
        figure: &str,
        path: &[&str],
        arguments: &Map<String, Value>,
    ) -> Result<String, Error> {
        let figure = self
            .figure(figure)
            .ok_or_else(|| ConfigError::UnknownFigure(figure.to_string()))?;
        let outline = resolve_outline(self, figure, path)?;
        let resolved = resolve_arguments(&outline.scopes, arguments, self.coercer.as_ref())?;
        let sql = compile(&outline, &resolved)?;
        tracing::debug!(figure = %figure.id, path = %path.join("/"), "compiled statement");
        Ok(sql)
    }

    /// Start a chained navigation over one figure.
    pub fn navigate(&self, figure: impl Into<String>) -> Navigator<'_> {
        Navigator::new(self, figure.into())
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("figures", &self.figures.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}
