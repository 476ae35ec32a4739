//! Error types for schema loading and hydration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for hydration operations.
pub type HydrationResult<T> = Result<T, HydrationError>;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while mapping a result set to entities.
#[derive(Error, Debug)]
pub enum HydrationError {
    /// A row lacks a `{column}_{iteration}` key the plan expects.
    #[error("row {row} is missing column '{column}' for iteration {iteration}")]
    MalformedRow {
        /// Zero-based index of the row in the input.
        row: usize,
        /// Iteration position the column belongs to.
        iteration: usize,
        /// The aliased column name that was looked up.
        column: String,
    },

    /// A primary key column holds a value that cannot identify an entity.
    #[error("invalid primary key {value} in column '{column}' (iteration {iteration})")]
    InvalidPrimaryKey {
        iteration: usize,
        column: String,
        value: String,
    },

    /// The relation list or the rows do not match the eager-load plan.
    #[error("inconsistent metadata: {0}")]
    InconsistentMetadata(String),

    /// An entity factory refused a record.
    #[error("factory for entity '{entity}' failed: {message}")]
    Factory { entity: String, message: String },

    /// Schema lookup failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Row input was not a JSON array of flat objects.
    #[error("invalid rows: {0}")]
    InvalidRows(String),

    /// Row input could not be parsed.
    #[error("failed to parse rows: {0}")]
    Json(#[from] serde_json::Error),
}

impl HydrationError {
    /// Create a factory error.
    pub fn factory(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Factory {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Check if this error was caused by the shape of the input rows
    /// rather than by the schema or a factory.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRow { .. }
                | Self::InvalidPrimaryKey { .. }
                | Self::InvalidRows(_)
                | Self::Json(_)
        )
    }
}

/// Errors raised while building or loading entity metadata.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("relation '{relation}' on '{entity}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("field '{field}' is declared more than once on '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("lazy relation '{relation}' on '{entity}' needs a foreign_key")]
    MissingForeignKey { entity: String, relation: String },

    /// Eager relations loop back on themselves; the path is listed.
    #[error("eager relations form a cycle: {}", .0.join(" -> "))]
    EagerCycle(Vec<String>),

    #[error("schema file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read schema file: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse schema file: {0}")]
    Parse(#[from] toml::de::Error),
}
