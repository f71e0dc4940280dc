use thiserror::Error;

use crate::core::errors::ApiError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ApiError),

    #[error("Failed to initialize LLM service: {0}")]
    Llm(#[source] ApiError),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[source] ApiError),

    #[error("Failed to initialize document parser: {0}")]
    Parser(#[source] ApiError),
}
