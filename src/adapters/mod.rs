//! Task adapters mapping wire-format work items onto model backends.

mod embed;
mod generate;
mod rerank;

pub use embed::{ChunkRecord, EmbedAdapter, EmbeddingRecord};
pub use generate::{
    ChunkEntry, ChunkSample, CorpusInput, CorpusSummary, DocumentationReport, FileEntry,
    GenerateAdapter, SymbolEntry, SymbolSample,
};
pub use rerank::{RerankAdapter, RerankRecord, ScoreRecord};
