//! Reranking adapter: (query, content) pairs in, relevance scores out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::PairScorer;
use crate::batch::BatchAdapter;
use crate::error::{InferError, Result};

/// One chunk to score against its query.
#[derive(Debug, Clone, Deserialize)]
pub struct RerankRecord {
    pub chunk_id: String,
    pub query: String,
    pub content: String,
}

/// Relevance score for one chunk. The error sentinel uses 0.0, a neutral
/// default rather than a claim of no relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub chunk_id: String,
    pub score: f32,
    pub error: Option<String>,
}

pub struct RerankAdapter {
    scorer: Arc<dyn PairScorer>,
}

impl RerankAdapter {
    pub fn new(scorer: Arc<dyn PairScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait::async_trait]
impl BatchAdapter for RerankAdapter {
    type Item = RerankRecord;
    type Output = ScoreRecord;

    fn task(&self) -> &'static str {
        "rerank"
    }

    async fn process_batch(&self, batch: &[RerankRecord]) -> Result<Vec<ScoreRecord>> {
        let pairs: Vec<(String, String)> = batch
            .iter()
            .map(|item| (item.query.clone(), item.content.clone()))
            .collect();
        let scores = self.scorer.score(&pairs).await?;

        Ok(batch
            .iter()
            .zip(scores)
            .map(|(item, score)| ScoreRecord {
                chunk_id: item.chunk_id.clone(),
                score,
                error: None,
            })
            .collect())
    }

    fn error_output(&self, item: &RerankRecord, error: &InferError) -> ScoreRecord {
        ScoreRecord {
            chunk_id: item.chunk_id.clone(),
            score: 0.0,
            error: Some(error.to_string()),
        }
    }
}
