//! GGUF quantized causal-LM backend for llama-family models.

use std::fs::File;
use std::path::Path;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::info;

use super::{select_device, TextGenerator};
use crate::config::SamplingOptions;
use crate::error::{InferError, Result};

/// Quantized GGUF generator.
///
/// The forward pass mutates the model's KV cache, so all calls serialize on
/// an internal lock; sharing one instance across tasks is safe but never
/// concurrent.
pub struct GgufGenerator {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    ctx_size: usize,
}

impl GgufGenerator {
    /// Load quantized weights and the matching `tokenizer.json`.
    pub fn load(
        weights: &Path,
        tokenizer_path: &Path,
        ctx_size: usize,
        eos_override: Option<u32>,
    ) -> Result<Self> {
        let device = select_device()?;

        let mut file = File::open(weights)
            .map_err(|e| InferError::ModelLoad(format!("opening {}: {e}", weights.display())))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| InferError::ModelLoad(format!("reading gguf metadata: {e}")))?;
        let tensor_count = content.tensor_infos.len();
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| InferError::ModelLoad(format!("loading gguf tensors: {e}")))?;
        info!(
            "generator loaded from {} ({tensor_count} tensors)",
            weights.display()
        );

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| InferError::ModelLoad(format!("loading tokenizer: {e}")))?;
        let eos_token = eos_override
            .or_else(|| tokenizer.token_to_id("<|im_end|>"))
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| tokenizer.token_to_id("</s>"));

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token,
            ctx_size,
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for GgufGenerator {
    async fn generate(&self, prompt: &str, options: &SamplingOptions) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(InferError::tokenizer)?;
        let mut prompt_tokens: Vec<u32> = encoding.get_ids().to_vec();
        if prompt_tokens.is_empty() {
            return Err(InferError::InvalidInput("empty prompt".to_string()));
        }

        // Keep prompt plus generated tokens inside the context window,
        // dropping the oldest prompt tokens when over budget.
        let budget = self.ctx_size.saturating_sub(options.max_tokens).max(1);
        if prompt_tokens.len() > budget {
            let overflow = prompt_tokens.len() - budget;
            prompt_tokens.drain(..overflow);
        }

        let sampling = if options.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            match options.top_k {
                Some(k) => Sampling::TopKThenTopP {
                    k,
                    p: options.top_p,
                    temperature: options.temperature,
                },
                None => Sampling::TopP {
                    p: options.top_p,
                    temperature: options.temperature,
                },
            }
        };
        let mut logits_processor = LogitsProcessor::from_sampling(options.seed, sampling);

        let mut model = self.model.lock();

        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?.squeeze(0)?;
        let mut next_token = logits_processor.sample(&logits)?;
        let mut all_tokens = vec![next_token];

        for index in 0..options.max_tokens.saturating_sub(1) {
            if self.eos_token == Some(next_token) {
                break;
            }
            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input, prompt_tokens.len() + index)?.squeeze(0)?;
            let logits = if options.repetition_penalty <= 1.0 {
                logits
            } else {
                let start = all_tokens.len().saturating_sub(options.repetition_context);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    options.repetition_penalty,
                    &all_tokens[start..],
                )?
            };
            next_token = logits_processor.sample(&logits)?;
            all_tokens.push(next_token);
        }
        drop(model);

        if self.eos_token.is_some() && all_tokens.last().copied() == self.eos_token {
            all_tokens.pop();
        }

        let text = self
            .tokenizer
            .decode(&all_tokens, true)
            .map_err(InferError::tokenizer)?;
        Ok(text.trim().to_string())
    }
}
