//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`LoreError`]
//! via `#[from]`. Adapters box their own error types into
//! [`LoreError::Storage`].

/// Base error for every fallible operation in lorescript.
#[derive(Debug, thiserror::Error)]
pub enum LoreError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("script error")]
    Script(#[from] ScriptError),

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("lorebook name must not be empty")]
    EmptyLorebookName,

    #[error("lorebook name {0:?} is not a valid storage name")]
    InvalidLorebookName(String),
}

/// A requested resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id:?} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure while executing a user script or reading back its result.
///
/// The interpreter itself never crosses this boundary: adapters render
/// their native errors into these variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("script failed to parse: {message}")]
    Syntax { message: String },

    #[error("script does not define an `entries` function")]
    MissingEntryPoint,

    #[error("script raised an error: {message}")]
    Runtime { message: String },

    #[error("script exceeded its resource limit: {message}")]
    ResourceLimit { message: String },

    #[error("script returned a malformed result: {reason}")]
    MalformedResult { reason: String },

    #[error("interpreter setup failed: {message}")]
    Sandbox { message: String },
}
