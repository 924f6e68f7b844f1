//! Engine error taxonomy.
//!
//! Every public operation returns `Result<_, EngineError>`. Variants are
//! deliberately coarse: callers branch on the kind (parse, missing object,
//! constraint, ...) and render the message as-is.

use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Statement text is not valid SQL, or the parsed node kind does not
    /// match the invoked operation.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database '{0}' does not exist")]
    DatabaseNotFound(String),

    #[error("Database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// A column named in an INSERT target list is absent from metadata.
    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { column: String, table: String },

    /// A value cannot be coerced to the declared column type.
    #[error("Type error: {0}")]
    Type(String),

    /// NOT NULL, PRIMARY KEY or UNIQUE violation.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// WHERE uses a node kind the predicate lowerer does not implement.
    #[error("Unsupported WHERE condition: {0}")]
    UnsupportedPredicate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl EngineError {
    /// Parse-stage failure with a rendered message.
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        EngineError::Parse(message.into())
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EngineError::Type(message.into())
    }

    pub(crate) fn constraint(message: impl Into<String>) -> Self {
        EngineError::Constraint(message.into())
    }
}
