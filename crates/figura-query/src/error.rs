//! Resolution-time error taxonomy.
//!
//! Three families, by what went wrong:
//! - [`ValidationError`]: the caller's argument values don't fit the
//!   effective schema. The `missing required property:` / `additional
//!   properties:` message prefixes are load-bearing; downstream callers
//!   match on them.
//! - [`ConfigError`]: the navigation path or a definition cross-reference
//!   can't be resolved.
//! - [`CompileError`]: a raw query template references a value that isn't
//!   there.
//!
//! Every failure is synchronous and final; resolution is deterministic, so
//! nothing is retried and no partial SQL is ever returned.

use figura_schema::DefError;
use thiserror::Error;

/// Caller-supplied values rejected against the effective argument schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required argument has neither a supplied value nor a default.
    /// Several names are comma-joined.
    #[error("missing required property: {0}")]
    MissingRequiredProperty(String),

    /// The caller supplied a name the effective schema does not accept:
    /// either never declared, or suppressed by a truthy `ignore`.
    #[error("additional properties: {0}")]
    AdditionalProperties(String),

    /// A value failed type coercion.
    #[error("invalid value for `{name}`: expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Navigation and cross-reference failures over registered figures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No figure or alias with this name is registered.
    #[error("unknown figure `{0}`")]
    UnknownFigure(String),

    /// No outline node matched the path and no `index` fallback exists.
    #[error("no outline entry matches path `{0}`")]
    PathNotFound(String),

    /// An inherit chain revisited a node it is already resolving.
    #[error("inheritance cycle through `{0}`")]
    CycleDetected(String),

    /// An inherit reference names a figure or path that does not resolve.
    #[error("unknown inherit target `{0}`")]
    UnknownInheritTarget(String),
}

/// Raw-template expansion failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A `%(name)s` placeholder references an argument with no resolved
    /// value.
    #[error("unresolved placeholder `{0}`")]
    UnresolvedPlaceholder(String),
}

/// Any failure surfaced by [`crate::Registry::resolve`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] DefError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}
