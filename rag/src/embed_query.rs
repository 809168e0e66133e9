use crate::embed_chunks::EmbeddingProvider;
use crate::error::{RagError, Result};

pub async fn embed_query(embedder: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let vecs = embedder.embed(&[text.to_string()]).await?;
    vecs.into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RagError::embedding(&embedder.name(), "no vector returned for query"))
}
