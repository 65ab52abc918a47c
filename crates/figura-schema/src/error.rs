//! Definition-shape errors.
//!
//! Everything here is raised while a JSON figure definition is being turned
//! into typed structures, i.e. during the setup phase. Resolution-time errors
//! live in `figura-query`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefError {
    /// A figure id was registered twice.
    #[error("figure `{0}` is already registered")]
    DuplicateFigure(String),

    /// An alias collides with an already registered figure id or alias.
    #[error("alias `{0}` is already registered")]
    DuplicateAlias(String),

    /// A definition field does not have the expected shape.
    #[error("invalid definition at {at}: {message}")]
    Invalid { at: String, message: String },

    /// A pattern key failed to compile as a regular expression.
    #[error("invalid pattern at {at}: {source}")]
    Pattern {
        at: String,
        #[source]
        source: regex::Error,
    },
}

impl DefError {
    /// Shorthand for the common shape error.
    pub fn invalid(at: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            at: at.into(),
            message: message.into(),
        }
    }
}
