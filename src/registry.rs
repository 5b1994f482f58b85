//! Model registry for local generative models.
//!
//! Each entry carries the generation parameters, chat-template handling, and
//! quantization mode for one model family. The table is built once and read
//! only afterwards; lookups never trigger a model load.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::config::{ModelConfig, Quantization};
use crate::error::{InferError, Result};

lazy_static! {
    static ref MODEL_REGISTRY: BTreeMap<&'static str, ModelConfig> = {
        let mut table = BTreeMap::new();

        table.insert(
            "qwen2.5-1.5b",
            ModelConfig {
                model_id: "models/qwen2.5-1.5b-instruct-q4_k_m.gguf".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                top_p: 0.9,
                description: "Qwen 2.5 1.5B - fast, efficient model for code summarization"
                    .to_string(),
                ..ModelConfig::default()
            },
        );

        table.insert(
            "qwen2.5-3b",
            ModelConfig {
                model_id: "models/qwen2.5-3b-instruct-q4_k_m.gguf".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                top_p: 0.9,
                description: "Qwen 2.5 3B - better quality, still fast".to_string(),
                ..ModelConfig::default()
            },
        );

        table.insert(
            "qwen2.5-7b",
            ModelConfig {
                model_id: "models/qwen2.5-7b-instruct-q8_0.gguf".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                top_p: 0.9,
                quantization: Quantization::EightBit,
                description: "Qwen 2.5 7B - high quality, requires more VRAM".to_string(),
                ..ModelConfig::default()
            },
        );

        table.insert(
            "phi-3-mini",
            ModelConfig {
                model_id: "models/phi-3-mini-4k-instruct-q4.gguf".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                description: "Phi-3 Mini - Microsoft's efficient 3.8B model".to_string(),
                ..ModelConfig::default()
            },
        );

        table.insert(
            "qwen3-4b-thinking",
            ModelConfig {
                model_id: "models/qwen3-4b-thinking-q4_k_m.gguf".to_string(),
                max_new_tokens: 4096,
                temperature: 0.3,
                top_p: 0.9,
                has_thinking_mode: true,
                quantization: Quantization::FourBit,
                description: "Qwen 3 4B with chain-of-thought; used for structured generation"
                    .to_string(),
                ..ModelConfig::default()
            },
        );

        table.insert(
            "deepseek-coder-1.3b",
            ModelConfig {
                model_id: "models/deepseek-coder-1.3b-instruct-q4_k_m.gguf".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                // Uses a special prompt format rather than a chat template.
                supports_system_prompt: false,
                requires_chat_template: false,
                description: "DeepSeek Coder 1.3B - code-specialized model".to_string(),
                ..ModelConfig::default()
            },
        );

        table
    };
}

/// Look up the configuration for a registered model.
///
/// Fails with [`InferError::UnknownModel`] whose message lists every
/// registered name, so a caller can self-correct.
pub fn get_model_config(name: &str) -> Result<ModelConfig> {
    MODEL_REGISTRY
        .get(name)
        .cloned()
        .ok_or_else(|| InferError::UnknownModel {
            name: name.to_string(),
            available: list_models().join(", "),
        })
}

/// All registered model names, in sorted order.
pub fn list_models() -> Vec<&'static str> {
    MODEL_REGISTRY.keys().copied().collect()
}

/// Human-readable information about one registered model.
pub fn model_info(name: &str) -> Result<String> {
    let config = get_model_config(name)?;
    let mut info = vec![
        format!("Model: {name}"),
        format!("Id: {}", config.model_id),
        format!("Description: {}", config.description),
        format!("Max tokens: {}", config.max_new_tokens),
        format!("Temperature: {}", config.temperature),
    ];

    if config.has_thinking_mode {
        info.push("Emits chain-of-thought before answering".to_string());
    }
    match config.quantization {
        Quantization::EightBit => info.push("Loads 8-bit quantized weights".to_string()),
        Quantization::FourBit => info.push("Loads 4-bit quantized weights".to_string()),
        Quantization::None => {}
    }

    Ok(info.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_model() {
        let config = get_model_config("qwen2.5-1.5b").unwrap();
        assert!(config.model_id.ends_with(".gguf"));
        assert!(config.requires_chat_template);
    }

    #[test]
    fn test_unknown_model_lists_every_name() {
        let err = get_model_config("no-such-model").unwrap_err();
        let msg = err.to_string();
        for name in list_models() {
            assert!(msg.contains(name), "error message missing '{name}': {msg}");
        }
    }

    #[test]
    fn test_list_is_sorted_and_stable() {
        let names = list_models();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names, list_models());
    }

    #[test]
    fn test_model_info_mentions_quantization() {
        let info = model_info("qwen2.5-7b").unwrap();
        assert!(info.contains("8-bit"));
        assert!(info.contains("Qwen 2.5 7B"));
    }
}
