//! Embedding adapter: chunk content in, normalized vectors out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::TextEmbedder;
use crate::batch::BatchAdapter;
use crate::error::{InferError, Result};

/// One chunk of text to embed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub content: String,
}

/// Embedding result for one chunk. `vector` is empty exactly when `error`
/// is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub error: Option<String>,
}

pub struct EmbedAdapter {
    embedder: Arc<dyn TextEmbedder>,
}

impl EmbedAdapter {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }
}

#[async_trait::async_trait]
impl BatchAdapter for EmbedAdapter {
    type Item = ChunkRecord;
    type Output = EmbeddingRecord;

    fn task(&self) -> &'static str {
        "embed"
    }

    async fn process_batch(&self, batch: &[ChunkRecord]) -> Result<Vec<EmbeddingRecord>> {
        // One batched encode per batch; the backend guarantees positional
        // correspondence between inputs and vectors.
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        Ok(batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                chunk_id: chunk.id.clone(),
                vector,
                error: None,
            })
            .collect())
    }

    fn error_output(&self, item: &ChunkRecord, error: &InferError) -> EmbeddingRecord {
        EmbeddingRecord {
            chunk_id: item.id.clone(),
            vector: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
