use thiserror::Error;

/// Primary error type for sqlmorph operations.
///
/// These are failures of the testing engine itself or of an unexpected
/// execution that must be surfaced. Benign execution noise from the engine
/// under test never becomes a `MorphError`; it is classified and dropped by
/// the oracle that observed it.
#[derive(Error, Debug)]
pub enum MorphError {
    // === Schema Errors ===
    /// A random table selection was requested from a schema with no tables.
    #[error("schema has no tables to select from")]
    SchemaEmpty,

    /// A table or column lookup failed.
    #[error("no such {kind}: {name}")]
    SchemaLookup { kind: &'static str, name: String },

    // === Generation Errors ===
    /// The generator or dialect configuration violated one of its own
    /// invariants (e.g. a dialect that enables no data types).
    #[error("generation failed: {detail}")]
    Generation { detail: String },

    // === Execution Errors ===
    /// The engine under test rejected a statement with a message that is
    /// not on the active allow-list.
    #[error("unexpected execution error: {message}\n  query: {sql}")]
    UnexpectedExecution { sql: String, message: String },

    /// A query that must yield a value produced an unusable result shape.
    #[error("malformed result for query {sql}: {detail}")]
    MalformedResult { sql: String, detail: String },

    // === Harness Errors ===
    /// Invalid campaign configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading the schema from a live engine failed.
    #[error("schema introspection failed: {0}")]
    Introspection(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal logic error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl MorphError {
    /// Create a generation error.
    pub fn generation(detail: impl Into<String>) -> Self {
        Self::Generation {
            detail: detail.into(),
        }
    }

    /// Create an unexpected-execution error carrying the offending query.
    pub fn unexpected_execution(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedExecution {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The query text that triggered this error, if any.
    pub fn offending_sql(&self) -> Option<&str> {
        match self {
            Self::UnexpectedExecution { sql, .. } | Self::MalformedResult { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Whether this error points at the generator or dialect tables rather
    /// than at the database under test.
    pub const fn is_generator_fault(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::SchemaEmpty)
    }
}

/// Result type alias using `MorphError`.
pub type Result<T> = std::result::Result<T, MorphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_execution_display_carries_query() {
        let err = MorphError::unexpected_execution("SELECT 1/0", "division by zero");
        let text = err.to_string();
        assert!(text.contains("division by zero"));
        assert!(text.contains("SELECT 1/0"));
        assert_eq!(err.offending_sql(), Some("SELECT 1/0"));
    }

    #[test]
    fn generator_faults_are_distinguished() {
        assert!(MorphError::generation("no types").is_generator_fault());
        assert!(MorphError::SchemaEmpty.is_generator_fault());
        assert!(!MorphError::unexpected_execution("x", "y").is_generator_fault());
        assert!(!MorphError::internal("bug").is_generator_fault());
    }

    #[test]
    fn io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(MorphError::Io(_))));
    }
}
