use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid plan: {path}: {message}")]
    InvalidPlan { path: String, message: String },

    #[error("parameter validation failed: {}", violations.join("; "))]
    ParameterValidation { violations: Vec<String> },

    #[error("invalid payload for {kind}: {message}")]
    Payload { kind: String, message: String },

    #[error("handler error in {kind}: {message}")]
    Handler { kind: String, message: String },

    #[error("I/O error: {path}: {message}")]
    Io { path: String, message: String },

    #[error("manifest error: {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("HTTP error: {url}: {message}")]
    Http { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
