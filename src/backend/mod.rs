//! Model backends: the boundary to the underlying ML runtime.
//!
//! The adapters only see these traits; the concrete implementations wrap
//! candle models loaded from local weights. Batched calls must return one
//! result per input, in input order.

mod bert;
mod gguf;

pub use bert::{BertEmbedder, CrossEncoderScorer};
pub use gguf::GgufGenerator;

use candle_core::Device;

use crate::config::SamplingOptions;
use crate::error::Result;

/// Batched text embedding.
///
/// Implementations must be reentrant: the serving wrapper shares one
/// instance across concurrent requests without locking.
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Dimensionality of the returned vectors.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one L2-normalized vector per input, in input
    /// order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Batched relevance scoring of (query, content) pairs.
#[async_trait::async_trait]
pub trait PairScorer: Send + Sync {
    /// Score a batch of pairs, one score per pair, in input order.
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>>;
}

/// Single-prompt text generation.
///
/// Implementations serialize concurrent calls internally; callers may share
/// one instance freely.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: &SamplingOptions) -> Result<String>;
}

/// Pick the compute device: CUDA when available and compiled in, else CPU.
pub(crate) fn select_device() -> Result<Device> {
    Ok(Device::cuda_if_available(0)?)
}
