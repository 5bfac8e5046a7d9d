use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Malformed filter key: {0:?}")]
    MalformedFilterKey(String),

    #[error("Field not found: {model}.{field}")]
    FieldNotFound { model: String, field: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl QueryError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn field_not_found(model: impl Into<String>, field: impl Into<String>) -> Self {
        QueryError::FieldNotFound {
            model: model.into(),
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
