//! Figura definition types and parser
//!
//! This crate defines the typed, immutable form of a *figure* (a named
//! bundle of query shapes) and the parser that builds it from a JSON
//! definition at registration time.
//!
//! Notes:
//! - Declaration order is semantic throughout (child matching, argument
//!   emission order, option precedence), so definitions are consumed with
//!   key order preserved.
//! - All pattern keys are compiled here, once; resolution in `figura-query`
//!   never re-parses a regex.

pub mod arguments;
pub mod error;
pub mod figure;
pub mod outline;

pub use arguments::{
    ArgumentSpec, ColumnExpr, MergeMode, OptionSpec, ScopeEntry, ScopeEntryKind, ScopeLayer,
    SpecPatch, Validator,
};
pub use error::DefError;
pub use figure::{parse_figure, Figure, Seed};
pub use outline::{InheritRef, KeyPattern, OutlineNode, SelectExpr, INDEX_KEY};
