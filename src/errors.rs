use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Query nested deeper than {0} levels")]
    QueryTooDeep(usize),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Config error: {0}")]
    Config(String),
}
