//! Outline resolution, argument binding, and SQL compilation for Figura.
//!
//! The pipeline, leaves first:
//! 1. [`outline::resolve_outline`] matches a navigation path against a
//!    figure's outline tree and accumulates argument scope layers,
//! 2. [`arguments::resolve_arguments`] folds the scope chain and binds the
//!    caller's values,
//! 3. [`sql::compile`] renders the final statement.
//!
//! [`Registry`] wires the three together behind one `resolve` call and is
//! the only stateful piece: registration is a distinct setup phase, after
//! which everything is an immutable read.

pub mod arguments;
pub mod coerce;
pub mod error;
pub mod navigator;
pub mod outline;
pub mod registry;
pub mod sql;

pub use arguments::{resolve_arguments, ResolvedArgument};
pub use coerce::{Coerce, StrictCoercer};
pub use error::{CompileError, ConfigError, Error, ValidationError};
pub use navigator::Navigator;
pub use outline::{resolve_outline, ResolvedOutline};
pub use registry::Registry;
pub use sql::compile;
