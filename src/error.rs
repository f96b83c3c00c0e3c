//! Error types for the ClimaQL query engine.

use thiserror::Error;

/// Main error type for ClimaQL operations.
#[derive(Error, Debug)]
pub enum ClimaqlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("No dataset configured for domain: {0}")]
    MissingDataset(String),
}

/// Query construction errors.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Cannot build a query from the extracted filters: {0}")]
    UnresolvableQuery(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Storage-layer errors (Query Service side).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Execution(err.to_string())
    }
}

/// External collaborator errors (geocoding, text generation).
///
/// These degrade gracefully: the query result is still returned, only the
/// dependent step is skipped or replaced with a fallback.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error("Text generation failed: {0}")]
    TextGeneration(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),
}

/// Result type alias for ClimaQL operations.
pub type Result<T> = std::result::Result<T, ClimaqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClimaqlError::Config(ConfigError::MissingField("render.base_url".to_string()));
        assert!(err.to_string().contains("render.base_url"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ClimaqlError = io_err.into();
        assert!(matches!(err, ClimaqlError::Io(_)));
    }

}
