use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::HttpClient;

/// Maps text to fixed-length vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Short label for status messages and errors.
    fn name(&self) -> String;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Embeddings from a local Ollama server.
pub struct OllamaEmbedder {
    http: HttpClient,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = HttpClient::new(cfg.http_timeout_secs).map_err(RagError::Configuration)?;
        Ok(Self {
            http,
            base_url: cfg.ollama_url.trim_end_matches('/').to_string(),
            model: cfg.embed_model.clone(),
        })
    }

    /// `/api/embeddings` predates batching and takes one prompt per call.
    async fn embed_legacy(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, String> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest {
                model: &self.model,
                prompt: text,
            };
            let res = self.http.post_json::<Value, _>(&url, &req).await?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/api/embed", self.base_url);
        let req = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let vectors = match self.http.post_json::<Value, _>(&url, &req).await {
            Ok(res) => parse_embeddings(res),
            Err(err) if batch_unsupported(&err) => {
                warn!(error = %err, "batch embed endpoint missing, trying legacy endpoint");
                self.embed_legacy(texts)
                    .await
                    .map_err(|legacy| both_failed(&err, &legacy))
            }
            Err(err) => Err(err),
        }
        .map_err(|message| RagError::embedding("ollama", message))?;

        if vectors.len() != texts.len() {
            return Err(RagError::embedding(
                "ollama",
                format!("expected {} vectors, got {}", texts.len(), vectors.len()),
            ));
        }
        debug!(count = vectors.len(), model = %self.model, "embedded texts");
        Ok(vectors)
    }

    fn name(&self) -> String {
        format!("ollama ({})", self.model)
    }
}

/// Older Ollama servers answer `/api/embed` with a 404. Anything else
/// (refused connection, timeout, 5xx) would fail the legacy endpoint too.
fn batch_unsupported(err: &str) -> bool {
    err.contains(" 404 ") || err.to_ascii_lowercase().contains("not found")
}

fn both_failed(batch: &str, legacy: &str) -> String {
    format!("{} (legacy endpoint: {})", batch, legacy)
}

fn parse_embeddings(value: Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err("No embeddings in response".to_string())
}

fn parse_embeddings_value(value: &Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    let arr = value.as_array().ok_or("Invalid embeddings format")?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

fn parse_vec(value: &Value) -> std::result::Result<Vec<f32>, String> {
    let arr = value.as_array().ok_or("Embedding is not an array")?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| "Embedding value is not a number".to_string())
        })
        .collect()
}
