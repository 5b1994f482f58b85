//! Structured documentation generation over an aggregate corpus.
//!
//! Unlike embedding and reranking there is no per-item batching here: one
//! request describes one corpus and produces one report. The work is in
//! keeping the prompt bounded regardless of corpus size and in recovering a
//! well-typed document from whatever text the model returns.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::backend::TextGenerator;
use crate::config::{ModelConfig, SamplingOptions};
use crate::error::Result;
use crate::prompts;

const MAX_SAMPLE_FILES: usize = 10;
const MAX_SAMPLE_SYMBOLS: usize = 20;
const MAX_SAMPLE_CHUNKS: usize = 15;
const PREVIEW_CHARS: usize = 200;
const RAW_OUTPUT_CHARS: usize = 1000;

/// Preprocessed corpus handed over by the orchestrator. Unknown fields are
/// ignored; missing fields default to empty.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CorpusInput {
    #[serde(default)]
    pub chunks: Vec<ChunkEntry>,
    #[serde(default)]
    pub symbols: Vec<SymbolEntry>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SymbolEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ChunkEntry {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub chunk_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// Bounded digest of a corpus, embedded into the generation prompt in place
/// of the corpus itself so prompt size is independent of corpus size.
#[derive(Debug, Serialize)]
pub struct CorpusSummary {
    pub file_count: usize,
    pub chunk_count: usize,
    pub symbol_count: usize,
    pub languages: Vec<String>,
    pub sample_files: Vec<String>,
    pub sample_symbols: Vec<SymbolSample>,
    pub sample_chunks: Vec<ChunkSample>,
}

#[derive(Debug, Serialize)]
pub struct SymbolSample {
    pub name: String,
    pub kind: String,
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkSample {
    pub file: String,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub name: String,
    pub content_preview: String,
}

impl CorpusSummary {
    pub fn from_input(input: &CorpusInput) -> Self {
        let languages: BTreeSet<String> = input
            .files
            .iter()
            .map(|file| {
                if file.language.is_empty() {
                    "unknown".to_string()
                } else {
                    file.language.clone()
                }
            })
            .collect();

        Self {
            file_count: input.files.len(),
            chunk_count: input.chunks.len(),
            symbol_count: input.symbols.len(),
            languages: languages.into_iter().collect(),
            sample_files: input
                .files
                .iter()
                .take(MAX_SAMPLE_FILES)
                .map(|file| file.path.clone())
                .collect(),
            sample_symbols: input
                .symbols
                .iter()
                .take(MAX_SAMPLE_SYMBOLS)
                .map(|symbol| SymbolSample {
                    name: symbol.name.clone(),
                    kind: symbol.kind.clone(),
                    file: symbol.file_path.clone(),
                })
                .collect(),
            sample_chunks: input
                .chunks
                .iter()
                .take(MAX_SAMPLE_CHUNKS)
                .map(|chunk| ChunkSample {
                    file: chunk.file_path.clone(),
                    chunk_type: chunk.chunk_type.clone(),
                    name: chunk.name.clone(),
                    content_preview: chunk.content.chars().take(PREVIEW_CHARS).collect(),
                })
                .collect(),
        }
    }
}

/// The structured report returned to the orchestrator.
///
/// The four structured keys are always present: absent keys are backfilled
/// with empty defaults on deserialization, so the output shape is stable no
/// matter how compliant the model was. `error`/`raw_output` are only set
/// when recovery degraded to the empty-defaulted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentationReport {
    #[serde(default)]
    pub subsystems: Vec<Value>,
    #[serde(default)]
    pub enriched_symbols: Vec<Value>,
    #[serde(default)]
    pub architecture_insights: Vec<Value>,
    #[serde(default)]
    pub quickstart: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl DocumentationReport {
    fn degraded(error: impl Into<String>, raw: &str) -> Self {
        Self {
            error: Some(error.into()),
            raw_output: Some(raw.chars().take(RAW_OUTPUT_CHARS).collect()),
            ..Self::default()
        }
    }
}

/// Best-effort extraction of a JSON object from free-form model text: the
/// substring from the first `{` to the last `}`, inclusive. Models routinely
/// wrap valid JSON in prose; this peels the wrapping without attempting to
/// balance braces.
fn extract_json_document(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Remove `<think>...</think>` reasoning blocks emitted by thinking models.
/// An unterminated block swallows the rest of the text.
fn strip_thinking(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Wrap the user message according to the model's capability flags: a
/// ChatML-style template when the model requires one (with the system role
/// only where supported), plain concatenation otherwise.
fn format_prompt(config: &ModelConfig, user: &str, system: &str) -> String {
    if config.requires_chat_template {
        let mut prompt = String::new();
        if !system.is_empty() && config.supports_system_prompt {
            prompt.push_str("<|im_start|>system\n");
            prompt.push_str(system);
            prompt.push_str("<|im_end|>\n");
        }
        prompt.push_str("<|im_start|>user\n");
        prompt.push_str(user);
        prompt.push_str("<|im_end|>\n<|im_start|>assistant\n");
        prompt
    } else if !system.is_empty() {
        format!("{system}\n\n{user}")
    } else {
        user.to_string()
    }
}

/// Generation adapter: corpus documentation and free-text summarization over
/// one generative backend.
pub struct GenerateAdapter {
    generator: Arc<dyn TextGenerator>,
    config: ModelConfig,
}

impl GenerateAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: ModelConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Generate the structured documentation report for a corpus.
    ///
    /// A generation failure is an error. A structurally invalid model
    /// response is not: it degrades to an empty-defaulted report annotated
    /// with `error` and a bounded `raw_output`.
    pub async fn document(
        &self,
        corpus: &CorpusInput,
        options: &SamplingOptions,
    ) -> Result<DocumentationReport> {
        let summary = CorpusSummary::from_input(corpus);
        let summary_json = serde_json::to_string_pretty(&summary)?;
        let user = prompts::build_documentation_prompt(&summary_json);
        let prompt = format_prompt(&self.config, &user, "");

        info!("prompting model with {} characters", prompt.len());
        let raw = self.generator.generate(&prompt, options).await?;
        info!("generated {} characters", raw.len());

        let visible = if self.config.has_thinking_mode {
            strip_thinking(&raw)
        } else {
            raw
        };

        Ok(parse_report(&visible))
    }

    /// Generate a plain-text summary; used by the HTTP summarizer.
    pub async fn summarize(
        &self,
        text: &str,
        instructions: &str,
        system_prompt: &str,
    ) -> Result<String> {
        let user = if instructions.is_empty() {
            format!("Summarize the following code:\n\n{text}")
        } else {
            format!("{instructions}\n\n{text}")
        };
        let prompt = format_prompt(&self.config, &user, system_prompt);

        let options = SamplingOptions::from_config(&self.config);
        let raw = self.generator.generate(&prompt, &options).await?;
        let visible = if self.config.has_thinking_mode {
            strip_thinking(&raw)
        } else {
            raw
        };
        Ok(visible.trim().to_string())
    }
}

fn parse_report(text: &str) -> DocumentationReport {
    let Some(candidate) = extract_json_document(text) else {
        warn!("no JSON object found in model output");
        return DocumentationReport::degraded("no JSON object found in model output", text);
    };

    match serde_json::from_str::<DocumentationReport>(candidate) {
        Ok(report) => report,
        Err(err) => {
            warn!("failed to parse model output as JSON: {err}");
            DocumentationReport::degraded(format!("failed to parse JSON: {err}"), text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferError;
    use pretty_assertions::assert_eq;

    struct ScriptedGenerator {
        response: String,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _options: &SamplingOptions) -> Result<String> {
            if self.fail {
                return Err(InferError::Inference("model crashed".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    fn adapter(response: &str) -> GenerateAdapter {
        GenerateAdapter::new(
            Arc::new(ScriptedGenerator {
                response: response.to_string(),
                fail: false,
            }),
            ModelConfig::default(),
        )
    }

    #[test]
    fn test_extracts_json_wrapped_in_prose() {
        assert_eq!(
            extract_json_document("Sure! {\"a\":1} thanks"),
            Some("{\"a\":1}")
        );
        assert_eq!(extract_json_document("no braces here"), None);
        assert_eq!(extract_json_document("} reversed {"), None);
    }

    #[test]
    fn test_missing_keys_are_backfilled() {
        let report: DocumentationReport =
            serde_json::from_str("{\"subsystems\": [{\"name\": \"core\"}]}").unwrap();
        assert_eq!(report.subsystems.len(), 1);
        assert!(report.enriched_symbols.is_empty());
        assert!(report.architecture_insights.is_empty());
        assert!(report.quickstart.is_empty());
        assert!(report.error.is_none());

        let serialized = serde_json::to_value(&report).unwrap();
        assert_eq!(serialized["architecture_insights"], serde_json::json!([]));
        assert_eq!(serialized["quickstart"], serde_json::json!({}));
        assert!(serialized.get("error").is_none());
    }

    #[test]
    fn test_strip_thinking_removes_blocks() {
        assert_eq!(
            strip_thinking("<think>hmm</think>answer"),
            "answer".to_string()
        );
        assert_eq!(
            strip_thinking("a<think>x</think>b<think>y</think>c"),
            "abc".to_string()
        );
        // Unterminated block drops the tail.
        assert_eq!(strip_thinking("before<think>never closed"), "before");
        assert_eq!(strip_thinking("plain"), "plain");
    }

    #[test]
    fn test_chat_template_formatting() {
        let config = ModelConfig::default();
        let prompt = format_prompt(&config, "hello", "be brief");
        assert!(prompt.starts_with("<|im_start|>system\nbe brief<|im_end|>\n"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));

        let no_system = ModelConfig {
            supports_system_prompt: false,
            ..ModelConfig::default()
        };
        let prompt = format_prompt(&no_system, "hello", "be brief");
        assert!(!prompt.contains("system"));

        let plain = ModelConfig {
            requires_chat_template: false,
            supports_system_prompt: false,
            ..ModelConfig::default()
        };
        assert_eq!(format_prompt(&plain, "hello", ""), "hello");
        assert_eq!(format_prompt(&plain, "hello", "sys"), "sys\n\nhello");
    }

    #[test]
    fn test_corpus_summary_caps_samples() {
        let input = CorpusInput {
            chunks: (0..40)
                .map(|i| ChunkEntry {
                    file_path: format!("src/file{i}.rs"),
                    chunk_type: "function".to_string(),
                    name: format!("chunk{i}"),
                    content: "x".repeat(500),
                })
                .collect(),
            symbols: (0..40)
                .map(|i| SymbolEntry {
                    name: format!("sym{i}"),
                    kind: "fn".to_string(),
                    file_path: "src/lib.rs".to_string(),
                })
                .collect(),
            files: (0..40)
                .map(|i| FileEntry {
                    path: format!("src/file{i}.rs"),
                    language: if i % 2 == 0 { "rust".to_string() } else { String::new() },
                })
                .collect(),
        };

        let summary = CorpusSummary::from_input(&input);
        assert_eq!(summary.file_count, 40);
        assert_eq!(summary.chunk_count, 40);
        assert_eq!(summary.symbol_count, 40);
        assert_eq!(summary.sample_files.len(), 10);
        assert_eq!(summary.sample_symbols.len(), 20);
        assert_eq!(summary.sample_chunks.len(), 15);
        assert!(summary
            .sample_chunks
            .iter()
            .all(|chunk| chunk.content_preview.chars().count() <= 200));
        assert_eq!(
            summary.languages,
            vec!["rust".to_string(), "unknown".to_string()]
        );
    }

    #[tokio::test]
    async fn test_document_parses_wrapped_response() {
        let adapter = adapter(
            "Here you go: {\"subsystems\": [], \"enriched_symbols\": [], \
             \"architecture_insights\": [{\"category\": \"pattern\"}], \"quickstart\": {}} done",
        );
        let options = SamplingOptions::from_config(adapter.config());

        let report = adapter
            .document(&CorpusInput::default(), &options)
            .await
            .unwrap();

        assert_eq!(report.architecture_insights.len(), 1);
        assert!(report.error.is_none());
        assert!(report.raw_output.is_none());
    }

    #[tokio::test]
    async fn test_document_degrades_on_unparseable_output() {
        let long_garbage = format!("{} {{ not json", "y".repeat(2000));
        let adapter = adapter(&long_garbage);
        let options = SamplingOptions::from_config(adapter.config());

        let report = adapter
            .document(&CorpusInput::default(), &options)
            .await
            .unwrap();

        assert!(report.subsystems.is_empty());
        assert!(report.quickstart.is_empty());
        assert!(report.error.is_some());
        let raw = report.raw_output.unwrap();
        assert!(raw.chars().count() <= 1000);
    }

    #[tokio::test]
    async fn test_generation_failure_is_an_error() {
        let adapter = GenerateAdapter::new(
            Arc::new(ScriptedGenerator {
                response: String::new(),
                fail: true,
            }),
            ModelConfig::default(),
        );
        let options = SamplingOptions::from_config(adapter.config());

        let err = adapter
            .document(&CorpusInput::default(), &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model crashed"));
    }
}
