//! Prompt templates for documentation and summarization tasks.
//!
//! These are written for small local models: explicit structure, short
//! instructions, and strict-JSON demands where the output is machine-read.

/// System prompt for summary-style tasks.
pub const SYSTEM_TECHNICAL: &str = "You are a technical documentation expert. Your job is to \
analyze code and write clear, concise summaries that help developers understand the purpose \
and functionality of code. Focus on WHAT the code does and WHY, not HOW (the code itself \
shows how). Be accurate and avoid speculation.";

/// System prompt for architecture-level analysis.
pub const SYSTEM_ARCHITECTURE: &str = "You are a software architect analyzing codebases. Your \
job is to identify high-level patterns, relationships between components, and overall system \
structure. Focus on the big picture and how pieces fit together.";

const CHUNK_SUMMARY: &str = "Analyze this code and write a 2-3 sentence summary.\n\n\
Focus on:\n\
- What is the main purpose of this code?\n\
- What functionality does it provide?\n\
- What are the key types and functions?\n\n\
Be concise and technical. Do not explain implementation details.\n\nCode:\n";

const CHUNK_SUMMARY_WITH_CONTEXT: &str = "Analyze this code from {filepath} and write a 2-3 \
sentence summary.\n\n\
Focus on:\n\
- What is the main purpose of this code?\n\
- What functionality does it provide?\n\
- How does it fit into the larger codebase?\n\n\
Be concise and technical.\n\nCode:\n";

const CLUSTER_SUMMARY: &str = "You are analyzing a group of semantically related code chunks. \
Write a summary that explains:\n\n\
1. What common theme or functionality these chunks share\n\
2. What role this group plays in the overall system\n\
3. Key patterns or important functionality\n\n\
The chunks below are related because they were grouped by semantic similarity.\n\n\
Write 1 paragraph (3-5 sentences) summarizing this cluster.\n\nRelated code chunks:\n";

const PROJECT_OVERVIEW: &str = "Based on the cluster summaries below, write a high-level \
architecture overview of this codebase.\n\n\
Your overview should include:\n\
1. Primary purpose of the project\n\
2. Major components and their responsibilities\n\
3. How components interact with each other\n\
4. Key technologies or patterns used\n\n\
Write 2-3 paragraphs. Be clear and concise.\n\nCluster summaries:\n";

/// Instruction template for structured documentation generation. The corpus
/// summary is substituted for `{input_data}`; the model must answer with one
/// JSON object matching the documented schema.
const DOCUMENTATION: &str = r#"You are a code documentation expert. Analyze the provided code structure and generate comprehensive, structured documentation.

INPUT DATA:
{input_data}

Your task:
1. Identify key subsystems/modules and their relationships
2. Generate clear documentation for important symbols (functions, types, etc.)
3. Provide usage examples where appropriate
4. Identify design patterns and architectural insights
5. Note any potential issues or improvements

OUTPUT FORMAT (strict JSON):
{
  "subsystems": [
    {
      "name": "subsystem_name",
      "description": "brief description",
      "confidence": 0.0-1.0,
      "files": ["file1.rs", "file2.rs"],
      "primary_purpose": "explanation"
    }
  ],
  "enriched_symbols": [
    {
      "symbol_id": "uuid",
      "name": "symbol_name",
      "documentation": "generated documentation",
      "usage_examples": ["example1", "example2"],
      "related_symbols": ["symbol1", "symbol2"],
      "complexity_notes": "analysis of complexity"
    }
  ],
  "architecture_insights": [
    {
      "category": "pattern|design|concern",
      "description": "insight description",
      "affected_components": ["comp1", "comp2"]
    }
  ],
  "quickstart": {
    "entry_points": ["main.rs", "lib.rs"],
    "core_types": ["Type1", "Type2"],
    "getting_started": "brief guide"
  }
}

IMPORTANT: Output ONLY valid JSON. No markdown, no explanations, just the JSON object."#;

/// Build the structured-documentation prompt around a corpus summary.
pub fn build_documentation_prompt(input_data: &str) -> String {
    DOCUMENTATION.replace("{input_data}", input_data)
}

/// Build a chunk-level summary prompt, with file context when available.
pub fn build_chunk_prompt(code: &str, filepath: &str) -> String {
    if filepath.is_empty() {
        format!("{CHUNK_SUMMARY}{code}")
    } else {
        format!(
            "{}{code}",
            CHUNK_SUMMARY_WITH_CONTEXT.replace("{filepath}", filepath)
        )
    }
}

/// Build a cluster-level summary prompt from individual chunk summaries.
pub fn build_cluster_prompt(chunk_summaries: &[String]) -> String {
    let chunks = chunk_summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("Chunk {}:\n{summary}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    format!("{CLUSTER_SUMMARY}\n{chunks}")
}

/// Build a project-overview prompt from cluster summaries.
pub fn build_project_prompt(cluster_summaries: &[String]) -> String {
    let clusters = cluster_summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("Cluster {}:\n{summary}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    format!("{PROJECT_OVERVIEW}\n{clusters}")
}
