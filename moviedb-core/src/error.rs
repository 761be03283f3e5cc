// moviedb-core/src/error.rs

use thiserror::Error;

/// Every failure the store or the catalog can report
#[derive(Error, Debug)]
pub enum MovieDbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Document failed the collection validator
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    /// Unique index already holds the key
    #[error("Duplicate key error: index '{index}' already contains {key}")]
    DuplicateKey { index: String, key: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Corrupted database file: {0}")]
    Corruption(String),
}

impl From<serde_json::Error> for MovieDbError {
    fn from(err: serde_json::Error) -> Self {
        MovieDbError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MovieDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_message() {
        let err = MovieDbError::DuplicateKey {
            index: "genres_name".to_string(),
            key: "\"Drama\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate key error: index 'genres_name' already contains \"Drama\""
        );
    }

    #[test]
    fn test_serde_json_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: MovieDbError = parse_err.into();
        assert!(matches!(err, MovieDbError::Serialization(_)));
    }
}
