//! Session state machine tying upload → index → query together.
//!
//! Every public operation is cancel-safe: state is only mutated in a short
//! section with no `.await` inside, after all fallible work has finished, so
//! dropping a pending future (task abort, `tokio::time::timeout`) leaves the
//! index and document metadata exactly as they were.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::build_prompt::{
    answer_prompt, format_context, key_points_prompt, practice_questions_prompt, summary_prompt,
    KEY_POINTS_SEED, QUESTIONS_SEED, SUMMARY_SEED,
};
use crate::chunk_text::chunk_text;
use crate::config::{Config, GenerationBackend};
use crate::embed_chunks::{EmbeddingProvider, OllamaEmbedder};
use crate::embed_query::embed_query;
use crate::error::{RagError, Result};
use crate::extract_document::{extract_document, ExtractedDocument};
use crate::generate::{GeminiClient, GenerationClient, OllamaChat};
use crate::vector_index::SimilarityIndex;

pub const PRACTICE_QUESTIONS_MIN: usize = 3;
pub const PRACTICE_QUESTIONS_MAX: usize = 10;
pub const PRACTICE_QUESTIONS_DEFAULT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    ReadyNoDocument,
    DocumentReady,
}

/// Metadata of the indexed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSummary {
    pub name: String,
    pub page_count: usize,
    pub word_count: usize,
    pub chunk_count: usize,
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document processed.")?;
        writeln!(f)?;
        writeln!(f, "File: {}", self.name)?;
        writeln!(f, "Pages: {}", self.page_count)?;
        writeln!(f, "Words: {}", group_thousands(self.word_count))?;
        writeln!(f, "Chunks created: {}", self.chunk_count)?;
        writeln!(f)?;
        write!(
            f,
            "Ready: ask questions, generate practice questions, summaries and key points."
        )
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Steps of an indexing run, sent in this order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexProgress {
    Extracting { name: String },
    Validating,
    Chunking,
    Embedding { chunks: usize },
    Storing,
    Completed(DocumentSummary),
}

impl fmt::Display for IndexProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexProgress::Extracting { name } => write!(f, "Extracting text from {}...", name),
            IndexProgress::Validating => write!(f, "Checking extracted text..."),
            IndexProgress::Chunking => write!(f, "Splitting text into chunks..."),
            IndexProgress::Embedding { chunks } => {
                write!(f, "Generating embeddings for {} chunks...", chunks)
            }
            IndexProgress::Storing => write!(f, "Storing chunks in the index..."),
            IndexProgress::Completed(summary) => {
                write!(f, "Processed {} successfully.", summary.name)
            }
        }
    }
}

pub type ProgressSender = UnboundedSender<IndexProgress>;

/// Progress is advisory: a receiver that went away never fails the pipeline.
fn notify(progress: Option<&ProgressSender>, event: IndexProgress) {
    if let Some(tx) = progress {
        if let Err(err) = tx.send(event) {
            debug!(event = %err.0, "progress receiver closed, dropping event");
        }
    }
}

#[derive(Clone)]
struct Backends {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationClient>,
}

struct Session {
    index: SimilarityIndex,
    document: Option<DocumentSummary>,
}

/// Owns the index and document metadata of one study session.
pub struct Orchestrator {
    config: Config,
    backends: RwLock<Option<Backends>>,
    session: RwLock<Session>,
    indexing: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let index = SimilarityIndex::new();
        Self {
            config,
            backends: RwLock::new(None),
            session: RwLock::new(Session {
                index,
                document: None,
            }),
            indexing: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn phase(&self) -> SessionPhase {
        if self.backends.read().await.is_none() {
            return SessionPhase::Uninitialized;
        }
        if self.session.read().await.document.is_some() {
            SessionPhase::DocumentReady
        } else {
            SessionPhase::ReadyNoDocument
        }
    }

    pub async fn document(&self) -> Option<DocumentSummary> {
        self.session.read().await.document.clone()
    }

    pub async fn chunk_count(&self) -> usize {
        self.session.read().await.index.len()
    }

    /// Wires the configured embedding and generation backends.
    pub async fn initialize(&self) -> Result<String> {
        self.config.validate().inspect_err(|e| error!(error = %e, "initialization failed"))?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::from_config(&self.config)?);
        let generator: Arc<dyn GenerationClient> = match self.config.generation_backend {
            GenerationBackend::Gemini => Arc::new(GeminiClient::from_config(&self.config)?),
            GenerationBackend::Ollama => Arc::new(OllamaChat::from_config(&self.config)?),
        };
        self.initialize_with(embedder, generator).await
    }

    /// Wires caller-supplied backends. Calling it again re-wires and keeps
    /// any indexed document.
    pub async fn initialize_with(
        &self,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationClient>,
    ) -> Result<String> {
        self.config.validate_pipeline()?;
        let status = format!(
            "Astra initialized.\nEmbeddings: {}\nGeneration: {}\nYou can now load a document and start studying.",
            embedder.name(),
            generator.name()
        );
        info!(embedder = %embedder.name(), generator = %generator.name(), "backends wired");
        *self.backends.write().await = Some(Backends {
            embedder,
            generator,
        });
        Ok(status)
    }

    async fn backends(&self) -> Result<Backends> {
        self.backends
            .read()
            .await
            .clone()
            .ok_or(RagError::NotInitialized)
    }

    /// Backends for an operation that needs an indexed document.
    async fn ready_backends(&self) -> Result<Backends> {
        if self.session.read().await.document.is_none() {
            return Err(RagError::NoDocument);
        }
        self.backends().await
    }

    /// Extracts `path` on a blocking thread, then indexes it.
    pub async fn index_file(
        &self,
        path: impl Into<PathBuf>,
        progress: Option<&ProgressSender>,
    ) -> Result<DocumentSummary> {
        self.backends().await?;
        let path = path.into();
        notify(
            progress,
            IndexProgress::Extracting {
                name: path.display().to_string(),
            },
        );
        let doc = tokio::task::spawn_blocking(move || extract_document(&path))
            .await
            .map_err(|e| RagError::Extraction(format!("extraction task failed: {}", e)))?
            .inspect_err(|e| error!(error = %e, "document extraction failed"))?;
        self.index_document(doc, progress).await
    }

    /// Chunks, embeds and stores `doc`, replacing any previous document.
    /// On failure the previous index and metadata remain in place.
    pub async fn index_document(
        &self,
        doc: ExtractedDocument,
        progress: Option<&ProgressSender>,
    ) -> Result<DocumentSummary> {
        let backends = self.backends().await?;
        let _pipeline = self.indexing.lock().await;
        let name = doc.name.clone();
        self.run_index(&backends, doc, progress)
            .await
            .inspect_err(|e| error!(document = %name, error = %e, "indexing failed"))
    }

    async fn run_index(
        &self,
        backends: &Backends,
        doc: ExtractedDocument,
        progress: Option<&ProgressSender>,
    ) -> Result<DocumentSummary> {
        notify(progress, IndexProgress::Validating);
        if doc.text.trim().is_empty() {
            return Err(RagError::EmptyDocument(doc.name));
        }

        notify(progress, IndexProgress::Chunking);
        let opts = self.config.chunk_options()?;
        let chunks = chunk_text(&doc.text, &opts);
        if chunks.is_empty() {
            return Err(RagError::Chunking(format!(
                "no chunks produced from {} characters of text",
                doc.text.chars().count()
            )));
        }

        notify(progress, IndexProgress::Embedding { chunks: chunks.len() });
        let vectors = backends.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::embedding(
                &backends.embedder.name(),
                format!("expected {} vectors, got {}", chunks.len(), vectors.len()),
            ));
        }

        notify(progress, IndexProgress::Storing);
        let summary = DocumentSummary {
            name: doc.name,
            page_count: doc.page_count,
            word_count: doc.text.split_whitespace().count(),
            chunk_count: chunks.len(),
        };
        {
            let mut session = self.session.write().await;
            session.index.replace_all(chunks, vectors)?;
            session.document = Some(summary.clone());
        }

        info!(
            document = %summary.name,
            pages = summary.page_count,
            words = summary.word_count,
            chunk_count = summary.chunk_count,
            "document indexed"
        );
        notify(progress, IndexProgress::Completed(summary.clone()));
        Ok(summary)
    }

    /// Top-`k` chunks for `query`, read from one consistent index snapshot.
    async fn retrieve(&self, backends: &Backends, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = embed_query(backends.embedder.as_ref(), query).await?;
        let session = self.session.read().await;
        if session.document.is_none() {
            return Err(RagError::NoDocument);
        }
        let hits = session.index.query(&vector, k)?;
        info!(k, hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }

    /// Answers `question` from the three most similar chunks.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let backends = self.ready_backends().await?;
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let chunks = self
            .retrieve(&backends, question, self.config.answer_top_k)
            .await?;
        if chunks.is_empty() {
            warn!("no chunks retrieved for question");
            return Err(RagError::NoRelevantContent);
        }
        let prompt = answer_prompt(&format_context(&chunks), question);
        backends
            .generator
            .complete(&prompt)
            .await
            .inspect_err(|e| error!(error = %e, "answer generation failed"))
    }

    /// `count` is clamped to `PRACTICE_QUESTIONS_MIN..=PRACTICE_QUESTIONS_MAX`.
    pub async fn generate_practice_questions(&self, count: usize) -> Result<String> {
        let count = count.clamp(PRACTICE_QUESTIONS_MIN, PRACTICE_QUESTIONS_MAX);
        self.generate_from_seed(QUESTIONS_SEED, self.config.questions_top_k, None, |context| {
            practice_questions_prompt(context, count)
        })
        .await
    }

    pub async fn generate_summary(&self) -> Result<String> {
        self.generate_from_seed(
            SUMMARY_SEED,
            self.config.summary_top_k,
            Some(self.config.context_limit),
            summary_prompt,
        )
        .await
    }

    pub async fn generate_key_points(&self) -> Result<String> {
        self.generate_from_seed(
            KEY_POINTS_SEED,
            self.config.key_points_top_k,
            Some(self.config.context_limit),
            key_points_prompt,
        )
        .await
    }

    async fn generate_from_seed<F>(
        &self,
        seed: &str,
        k: usize,
        context_limit: Option<usize>,
        template: F,
    ) -> Result<String>
    where
        F: FnOnce(&str) -> String + Send,
    {
        let backends = self.ready_backends().await?;
        let mut chunks = self.retrieve(&backends, seed, k).await?;
        if chunks.is_empty() {
            return Err(RagError::NoRelevantContent);
        }
        if let Some(limit) = context_limit {
            chunks.truncate(limit);
        }
        let prompt = template(&format_context(&chunks));
        backends
            .generator
            .complete(&prompt)
            .await
            .inspect_err(|e| error!(seed, error = %e, "generation failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_word_counts() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn summary_lists_metadata() {
        let summary = DocumentSummary {
            name: "biology.pdf".to_string(),
            page_count: 12,
            word_count: 4521,
            chunk_count: 31,
        };
        let text = summary.to_string();
        assert!(text.contains("File: biology.pdf"));
        assert!(text.contains("Pages: 12"));
        assert!(text.contains("Words: 4,521"));
        assert!(text.contains("Chunks created: 31"));
    }
}
