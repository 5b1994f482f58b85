// Location: src/config.rs

use serde::{Deserialize, Serialize};

/// Weight quantization applied when loading a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    None,
    #[serde(rename = "8bit")]
    EightBit,
    #[serde(rename = "4bit")]
    FourBit,
}

/// Configuration for one generative model family.
///
/// Records are created once at process start from the static registry and
/// shared read-only for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier: a local weights path for GGUF models
    pub model_id: String,

    /// Maximum number of new tokens to generate
    pub max_new_tokens: usize,

    /// Temperature for sampling
    pub temperature: f64,

    /// Top-p (nucleus) sampling threshold
    pub top_p: f64,

    /// Top-k sampling cutoff
    pub top_k: Option<usize>,

    /// Repetition penalty
    pub repetition_penalty: f32,

    /// Number of trailing tokens the repetition penalty looks at
    pub repetition_context: usize,

    /// Whether the chat template accepts a system role
    pub supports_system_prompt: bool,

    /// Whether prompts must be wrapped in the model's chat template
    pub requires_chat_template: bool,

    /// Whether the model emits `<think>` reasoning blocks before its answer
    pub has_thinking_mode: bool,

    /// End-of-sequence token id override; resolved from the tokenizer when absent
    pub eos_token_id: Option<u32>,

    /// Weight quantization mode
    pub quantization: Quantization,

    /// Human-readable description
    pub description: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            max_new_tokens: 512,
            temperature: 0.3,
            top_p: 0.9,
            top_k: Some(50),
            repetition_penalty: 1.1,
            repetition_context: 64,
            supports_system_prompt: true,
            requires_chat_template: true,
            has_thinking_mode: false,
            eos_token_id: None,
            quantization: Quantization::None,
            description: String::new(),
        }
    }
}

/// Decoding parameters for one generation call.
///
/// Resolved from a [`ModelConfig`]; the CLI overrides `max_tokens` and
/// `temperature` from its flags.
#[derive(Debug, Clone)]
pub struct SamplingOptions {
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: Option<usize>,
    pub repetition_penalty: f32,
    pub repetition_context: usize,
    pub seed: u64,
}

impl SamplingOptions {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            max_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
            repetition_context: config.repetition_context,
            seed: 299792458,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_options_follow_config() {
        let config = ModelConfig {
            max_new_tokens: 1024,
            temperature: 0.7,
            top_p: 0.95,
            top_k: Some(40),
            ..ModelConfig::default()
        };

        let opts = SamplingOptions::from_config(&config);
        assert_eq!(opts.max_tokens, 1024);
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.top_p, 0.95);
        assert_eq!(opts.top_k, Some(40));
    }

    #[test]
    fn test_quantization_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Quantization::EightBit).unwrap(),
            "\"8bit\""
        );
        assert_eq!(serde_json::to_string(&Quantization::None).unwrap(), "\"none\"");
    }
}
