//! BERT-family backends: sentence embedding and cross-encoder scoring.
//!
//! Both load a local model directory holding `config.json`,
//! `tokenizer.json`, and `model.safetensors`. Forward passes are immutable,
//! so one instance can serve concurrent callers.

use std::path::Path;

use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use tokenizers::{EncodeInput, PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

use super::{select_device, PairScorer, TextEmbedder};
use crate::error::{InferError, Result};

const MAX_INPUT_TOKENS: usize = 512;

struct BertParts {
    config: Config,
    hidden_size: usize,
    tokenizer: Tokenizer,
    vb: VarBuilder<'static>,
    device: Device,
}

/// Load the pieces shared by both BERT backends.
fn load_parts(model_dir: &Path) -> Result<BertParts> {
    let device = select_device()?;

    let config_text = std::fs::read_to_string(model_dir.join("config.json"))
        .map_err(|e| InferError::ModelLoad(format!("reading config.json: {e}")))?;
    let config: Config = serde_json::from_str(&config_text)
        .map_err(|e| InferError::ModelLoad(format!("parsing config.json: {e}")))?;
    // `Config::hidden_size` is not publicly accessible, so read the same value
    // directly from the config JSON already in memory.
    let hidden_size = serde_json::from_str::<serde_json::Value>(&config_text)
        .ok()
        .and_then(|v| v.get("hidden_size").and_then(|h| h.as_u64()))
        .map(|h| h as usize)
        .ok_or_else(|| InferError::ModelLoad("config.json missing hidden_size".to_string()))?;

    let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
        .map_err(|e| InferError::ModelLoad(format!("loading tokenizer: {e}")))?;
    tokenizer.with_padding(Some(PaddingParams::default()));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_INPUT_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| InferError::ModelLoad(format!("configuring tokenizer: {e}")))?;

    let weights = model_dir.join("model.safetensors");
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device)
            .map_err(|e| InferError::ModelLoad(format!("mapping weights: {e}")))?
    };

    Ok(BertParts {
        config,
        hidden_size,
        tokenizer,
        vb,
        device,
    })
}

/// Tokenize a batch and assemble (input_ids, token_type_ids, attention_mask)
/// tensors of shape (batch, seq).
fn encode_to_tensors<'s, E>(
    tokenizer: &Tokenizer,
    inputs: Vec<E>,
    device: &Device,
) -> Result<(Tensor, Tensor, Tensor)>
where
    E: Into<EncodeInput<'s>> + Send,
{
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(InferError::tokenizer)?;

    let mut ids = Vec::with_capacity(encodings.len());
    let mut type_ids = Vec::with_capacity(encodings.len());
    let mut masks = Vec::with_capacity(encodings.len());
    for encoding in &encodings {
        ids.push(Tensor::new(encoding.get_ids(), device)?);
        type_ids.push(Tensor::new(encoding.get_type_ids(), device)?);
        masks.push(Tensor::new(encoding.get_attention_mask(), device)?);
    }

    Ok((
        Tensor::stack(&ids, 0)?,
        Tensor::stack(&type_ids, 0)?,
        Tensor::stack(&masks, 0)?,
    ))
}

fn normalize_l2(v: &Tensor) -> candle_core::Result<Tensor> {
    v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?)
}

/// Sentence embedder: masked mean pooling over the encoder output, followed
/// by L2 normalization.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let parts = load_parts(model_dir)?;
        let dimension = parts.hidden_size;
        let model = BertModel::load(parts.vb, &parts.config)
            .map_err(|e| InferError::ModelLoad(format!("loading encoder weights: {e}")))?;
        info!(
            "embedding model loaded from {} (dimension {dimension})",
            model_dir.display()
        );
        Ok(Self {
            model,
            tokenizer: parts.tokenizer,
            device: parts.device,
            dimension,
        })
    }
}

#[async_trait::async_trait]
impl TextEmbedder for BertEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, type_ids, attention_mask) =
            encode_to_tensors(&self.tokenizer, texts.to_vec(), &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;

        // Mean over real tokens only; padded positions carry a zero mask.
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let mean = summed.broadcast_div(&counts)?;

        Ok(normalize_l2(&mean)?.to_vec2::<f32>()?)
    }
}

/// Cross-encoder relevance scorer: BERT encoder plus the pooler and
/// single-logit classification head of a sequence-classification checkpoint.
pub struct CrossEncoderScorer {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderScorer {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let parts = load_parts(model_dir)?;
        let hidden = parts.hidden_size;

        let model = BertModel::load(parts.vb.pp("bert"), &parts.config)
            .map_err(|e| InferError::ModelLoad(format!("loading encoder weights: {e}")))?;
        let pooler = candle_nn::linear(hidden, hidden, parts.vb.pp("bert").pp("pooler").pp("dense"))
            .map_err(|e| InferError::ModelLoad(format!("loading pooler weights: {e}")))?;
        let classifier = candle_nn::linear(hidden, 1, parts.vb.pp("classifier"))
            .map_err(|e| InferError::ModelLoad(format!("loading classifier weights: {e}")))?;

        info!("reranker model loaded from {}", model_dir.display());
        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer: parts.tokenizer,
            device: parts.device,
        })
    }
}

#[async_trait::async_trait]
impl PairScorer for CrossEncoderScorer {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, type_ids, attention_mask) =
            encode_to_tensors(&self.tokenizer, pairs.to_vec(), &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;

        // Classify over the pooled [CLS] representation.
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?.squeeze(1)?;

        Ok(logits.to_vec1::<f32>()?)
    }
}
