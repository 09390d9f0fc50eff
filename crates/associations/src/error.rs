//! Error types for the association layer
//!
//! Provides error handling for association mutation, collection loading,
//! counter updates, and the underlying database operations.

use std::fmt;

/// Result type alias for model and association operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for association operations
#[derive(Debug, Clone)]
pub enum ModelError {
    /// Database connection or query error
    Database(String),
    /// Record not found in database
    NotFound(String),
    /// Record validation failed
    Validation(String),
    /// A record offered to the association is not of the declared target type
    TypeMismatch { expected: String, actual: String },
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Serialization/deserialization error
    Serialization(String),
    /// Connection pool error
    Connection(String),
    /// Association metadata is inconsistent
    Configuration(String),
    /// Query building error
    Query(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModelError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected '{}', got '{}'", expected, actual)
            }
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::Query(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}
