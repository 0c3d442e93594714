use thiserror::Error;

/// Failures raised by the question-answering pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("File type '{0}' is not allowed.")]
    UnsupportedType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for RagError {
    fn from(err: redis::RedisError) -> Self {
        RagError::IndexUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
