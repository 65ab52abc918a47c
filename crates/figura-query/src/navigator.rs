//! Chained navigation sugar over [`Registry::resolve`].
//!
//! A thin builder: it only accumulates the figure name, path segments and
//! argument values, and hands them to the registry unchanged. Nothing here
//! touches resolution semantics.

use serde_json::{Map, Value};

use crate::error::Error;
use crate::registry::Registry;

/// An in-progress navigation over one figure.
#[derive(Debug, Clone)]
pub struct Navigator<'r> {
    registry: &'r Registry,
    figure: String,
    path: Vec<String>,
    arguments: Map<String, Value>,
}

impl<'r> Navigator<'r> {
    pub(crate) fn new(registry: &'r Registry, figure: String) -> Self {
        Self {
            registry,
            figure,
            path: Vec::new(),
            arguments: Map::new(),
        }
    }

    /// Append one path segment.
    pub fn path(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }

    /// Supply one argument value.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Compile the accumulated navigation.
    pub fn sql(&self) -> Result<String, Error> {
        let segments: Vec<&str> = self.path.iter().map(String::as_str).collect();
        self.registry.resolve(&self.figure, &segments, &self.arguments)
    }
}
