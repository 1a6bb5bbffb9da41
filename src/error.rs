//! Error taxonomy shared across the crate.

use thiserror::Error;

/// Errors surfaced by parsing, configuration, and store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// User- or config-supplied text does not match the grammar of its
    /// declared value kind. Local to one value; never aborts a transaction
    /// on its own.
    #[error("invalid {kind} expression: {text}")]
    Parsing { kind: &'static str, text: String },

    /// A project definition source is structurally invalid.
    #[error("{0}")]
    Config(String),

    /// Raised by the abort import strategy when incoming qualified names
    /// collide with projects already in the store.
    #[error("conflicting project definitions: {}", names.join(", "))]
    ProjectConflict { names: Vec<String> },

    /// A write violates a model invariant (out-of-range value, type
    /// mismatch, malformed reference).
    #[error("{0}")]
    Model(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Migration(#[from] refinery::Error),
}

impl Error {
    pub fn parsing(kind: &'static str, text: impl Into<String>) -> Self {
        Error::Parsing {
            kind,
            text: text.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
