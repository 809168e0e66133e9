use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`RagError`], stable across causes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    NotInitialized,
    EmptyDocument,
    Extraction,
    Chunking,
    Embedding,
    Index,
    NoDocument,
    EmptyQuery,
    NoRelevantContent,
    Generation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::NotInitialized => "not initialized",
            ErrorKind::EmptyDocument => "empty document",
            ErrorKind::Extraction => "extraction error",
            ErrorKind::Chunking => "chunking error",
            ErrorKind::Embedding => "embedding error",
            ErrorKind::Index => "index error",
            ErrorKind::NoDocument => "no document",
            ErrorKind::EmptyQuery => "empty query",
            ErrorKind::NoRelevantContent => "no relevant content",
            ErrorKind::Generation => "generation error",
        };
        f.write_str(name)
    }
}

/// Every failure the pipeline can report. The `Display` form is the
/// user-facing message: kind first, then the underlying cause.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not initialized: call initialize before loading a document")]
    NotInitialized,

    #[error("empty document: no text found in {0} (it may be image-based or corrupted)")]
    EmptyDocument(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("index error: {0}")]
    Index(String),

    #[error("no document: upload and process a document first")]
    NoDocument,

    #[error("empty query: please enter a question")]
    EmptyQuery,

    #[error("no relevant content: nothing in the document matched the request")]
    NoRelevantContent,

    #[error("generation error ({provider}): {message}")]
    Generation { provider: String, message: String },
}

impl RagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::Configuration(_) => ErrorKind::Configuration,
            RagError::NotInitialized => ErrorKind::NotInitialized,
            RagError::EmptyDocument(_) => ErrorKind::EmptyDocument,
            RagError::Extraction(_) => ErrorKind::Extraction,
            RagError::Chunking(_) => ErrorKind::Chunking,
            RagError::Embedding { .. } => ErrorKind::Embedding,
            RagError::Index(_) => ErrorKind::Index,
            RagError::NoDocument => ErrorKind::NoDocument,
            RagError::EmptyQuery => ErrorKind::EmptyQuery,
            RagError::NoRelevantContent => ErrorKind::NoRelevantContent,
            RagError::Generation { .. } => ErrorKind::Generation,
        }
    }

    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        RagError::Embedding {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn generation(provider: &str, message: impl Into<String>) -> Self {
        RagError::Generation {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_leads_with_kind() {
        let err = RagError::generation("gemini", "quota exceeded");
        assert_eq!(err.kind(), ErrorKind::Generation);
        let msg = err.to_string();
        assert!(msg.starts_with(&err.kind().to_string()), "{msg}");
        assert!(msg.contains("quota exceeded"));

        let err = RagError::EmptyQuery;
        assert!(err.to_string().starts_with("empty query"));
    }
}
