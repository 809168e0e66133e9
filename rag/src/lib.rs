mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod extract_document;
mod generate;
mod http;
mod orchestrator;
mod vector_index;

pub use build_prompt::{
    answer_prompt, format_context, key_points_prompt, practice_questions_prompt, summary_prompt,
    KEY_POINTS_SEED, QUESTIONS_SEED, SUMMARY_SEED,
};
pub use chunk_text::{chunk_spans, chunk_text, ChunkOptions, OverlapAnchor};
pub use config::{Config, GenerationBackend};
pub use embed_chunks::{EmbeddingProvider, OllamaEmbedder};
pub use error::{ErrorKind, RagError, Result};
pub use extract_document::{extract_document, ExtractedDocument};
pub use generate::{GeminiClient, GenerationClient, OllamaChat};
pub use orchestrator::{
    DocumentSummary, IndexProgress, Orchestrator, ProgressSender, SessionPhase,
    PRACTICE_QUESTIONS_DEFAULT, PRACTICE_QUESTIONS_MAX, PRACTICE_QUESTIONS_MIN,
};
pub use vector_index::{cosine_similarity, Chunk, ScoredChunk, SimilarityIndex};
