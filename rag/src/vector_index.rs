use uuid::Uuid;

use crate::error::{RagError, Result};

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine of the angle between `a` and `b`; 0.0 when either has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// In-memory store of one document's chunks with brute-force top-k search,
/// ranked by cosine similarity.
///
/// Mutation takes `&mut self`, so a replace can never interleave with a
/// query; the orchestrator adds the lock that makes this hold across tasks.
#[derive(Clone, Debug, Default)]
pub struct SimilarityIndex {
    entries: Vec<Chunk>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|c| c.vector.len())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every stored chunk and stores `chunks` paired with `vectors`,
    /// each under a fresh id. On error nothing is changed.
    pub fn replace_all(&mut self, chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Index(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(first) = vectors.first() {
            let dim = first.len();
            if dim == 0 {
                return Err(RagError::Index("vectors must not be empty".to_string()));
            }
            if let Some(pos) = vectors.iter().position(|v| v.len() != dim) {
                return Err(RagError::Index(format!(
                    "vector {} has dimension {}, expected {}",
                    pos,
                    vectors[pos].len(),
                    dim
                )));
            }
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| Chunk {
                id: Uuid::new_v4(),
                text,
                vector,
            })
            .collect();
        self.entries = entries;
        Ok(())
    }

    /// The `k` stored texts most similar to `vector`, best first.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<String>> {
        Ok(self
            .query_scored(vector, k)?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    pub fn query_scored(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(vec![]);
        }
        if let Some(dim) = self.dimension() {
            if vector.len() != dim {
                return Err(RagError::Index(format!(
                    "query vector has dimension {}, index holds dimension {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, chunk)| (pos, cosine_similarity(&chunk.vector, vector)))
            .collect();
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredChunk {
                text: self.entries[pos].text.clone(),
                score,
            })
            .collect())
    }
}
