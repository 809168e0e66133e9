use std::env;
use std::str::FromStr;

use crate::chunk_text::{ChunkOptions, OverlapAnchor};
use crate::error::{RagError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationBackend {
    Gemini,
    Ollama,
}

impl FromStr for GenerationBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(GenerationBackend::Gemini),
            "ollama" => Ok(GenerationBackend::Ollama),
            other => Err(RagError::Configuration(format!(
                "unknown generation backend '{}' (expected gemini or ollama)",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub overlap_anchor: OverlapAnchor,
    pub answer_top_k: usize,
    pub questions_top_k: usize,
    pub summary_top_k: usize,
    pub key_points_top_k: usize,
    pub context_limit: usize,
    pub http_timeout_secs: u64,
    pub ollama_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub generation_backend: GenerationBackend,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_url: String,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            overlap_anchor: OverlapAnchor::Window,
            answer_top_k: 3,
            questions_top_k: 5,
            summary_top_k: 10,
            key_points_top_k: 8,
            context_limit: 5,
            http_timeout_secs: 120,
            ollama_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "qwen2.5:7b".to_string(),
            generation_backend: GenerationBackend::Gemini,
            google_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            log_file: "astra.log".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment. A `.env` file in the
    /// working directory is loaded first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let d = Self::default();
        Self {
            chunk_size: parsed("RAG_CHUNK_SIZE").unwrap_or(d.chunk_size),
            chunk_overlap: parsed("RAG_CHUNK_OVERLAP").unwrap_or(d.chunk_overlap),
            overlap_anchor: parsed("RAG_OVERLAP_ANCHOR").unwrap_or(d.overlap_anchor),
            answer_top_k: parsed("RAG_ANSWER_TOP_K").unwrap_or(d.answer_top_k),
            questions_top_k: parsed("RAG_QUESTIONS_TOP_K").unwrap_or(d.questions_top_k),
            summary_top_k: parsed("RAG_SUMMARY_TOP_K").unwrap_or(d.summary_top_k),
            key_points_top_k: parsed("RAG_KEY_POINTS_TOP_K").unwrap_or(d.key_points_top_k),
            context_limit: parsed("RAG_CONTEXT_LIMIT").unwrap_or(d.context_limit),
            http_timeout_secs: parsed("RAG_HTTP_TIMEOUT_SECS").unwrap_or(d.http_timeout_secs),
            ollama_url: env::var("OLLAMA_URL").unwrap_or(d.ollama_url),
            embed_model: env::var("OLLAMA_EMBED_MODEL").unwrap_or(d.embed_model),
            chat_model: env::var("OLLAMA_CHAT_MODEL").unwrap_or(d.chat_model),
            generation_backend: parsed("RAG_GENERATION_BACKEND").unwrap_or(d.generation_backend),
            google_api_key: env::var("GOOGLE_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(d.gemini_model),
            gemini_url: env::var("GEMINI_URL").unwrap_or(d.gemini_url),
            log_file: env::var("ASTRA_LOG_FILE").unwrap_or(d.log_file),
        }
    }

    pub fn chunk_options(&self) -> Result<ChunkOptions> {
        ChunkOptions::new(self.chunk_size, self.chunk_overlap)
            .map(|opts| opts.with_anchor(self.overlap_anchor))
    }

    /// Checks everything `initialize` depends on.
    pub fn validate(&self) -> Result<()> {
        self.validate_pipeline()?;
        if self.generation_backend == GenerationBackend::Gemini && self.google_api_key.is_none() {
            return Err(RagError::Configuration(
                "GOOGLE_API_KEY not found. Add GOOGLE_API_KEY=your_key to .env or set RAG_GENERATION_BACKEND=ollama"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Chunking and retrieval settings only; backend credentials are not
    /// looked at.
    pub fn validate_pipeline(&self) -> Result<()> {
        self.chunk_options()?;
        let top_ks = [
            ("RAG_ANSWER_TOP_K", self.answer_top_k),
            ("RAG_QUESTIONS_TOP_K", self.questions_top_k),
            ("RAG_SUMMARY_TOP_K", self.summary_top_k),
            ("RAG_KEY_POINTS_TOP_K", self.key_points_top_k),
            ("RAG_CONTEXT_LIMIT", self.context_limit),
        ];
        for (name, value) in top_ks {
            if value == 0 {
                return Err(RagError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
