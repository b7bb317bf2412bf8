//! Error types for askdb.
//!
//! A single enum covers every failure the pipeline can observe. Callers branch
//! on the variant; the payload carries the detail for logs.

use thiserror::Error;

/// Unified error type for askdb.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (credentials, ports, paths)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model provider errors (network, quota, malformed replies)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Training store and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Database connection or execution errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQL could not be generated for a question
    #[error("SQL generation error: {0}")]
    Sql(String),

    /// Prompt loading or rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Chat transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The question was empty after trimming
    #[error("Question is empty")]
    EmptyQuestion,

    /// The query ran but produced nothing to answer with
    #[error("No answer: {0}")]
    NoAnswer(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the failure came from a remote collaborator and might succeed
    /// if the same request were made again later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::Database(_) | AppError::Transport(_)
        )
    }

    /// Whether the failure is a configuration problem that no retry will fix.
    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
