//! Error types shared across the adapters, backends, and serving wrappers.

use std::io;

pub type Result<T> = std::result::Result<T, InferError>;

/// Errors surfaced by the inference adapters.
///
/// Fatal conditions (model load, input parse, output serialization) abort a
/// run; everything raised inside a batch step is caught at batch granularity
/// and converted into error sentinels instead.
#[derive(Debug, thiserror::Error)]
pub enum InferError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("unknown model '{name}'; available models: {available}")]
    UnknownModel { name: String, available: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model error: {0}")]
    Backend(#[from] candle_core::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl InferError {
    /// Wrap a tokenizer failure, which carries a boxed error type.
    pub(crate) fn tokenizer(err: impl std::fmt::Display) -> Self {
        InferError::Inference(format!("tokenizer error: {err}"))
    }
}
