use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::HttpClient;

/// Sends a finished prompt to a hosted completion model.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Returns the model's text exactly as received.
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> String;
}

#[derive(Clone, Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message<'a>],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Completions from a local Ollama chat model.
pub struct OllamaChat {
    http: HttpClient,
    base_url: String,
    model: String,
}

impl OllamaChat {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = HttpClient::new(cfg.http_timeout_secs).map_err(RagError::Configuration)?;
        Ok(Self {
            http,
            base_url: cfg.ollama_url.trim_end_matches('/').to_string(),
            model: cfg.chat_model.clone(),
        })
    }
}

#[async_trait]
impl GenerationClient for OllamaChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let messages = [Message {
            role: "user",
            content: prompt,
        }];
        let req = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
        };
        let res = self
            .http
            .post_json::<ChatResponse, _>(&url, &req)
            .await
            .map_err(|message| RagError::generation("ollama", message))?;
        res.message
            .and_then(|m| m.content)
            .ok_or_else(|| RagError::generation("ollama", "response carried no message"))
    }

    fn name(&self) -> String {
        format!("ollama ({})", self.model)
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Completions from Google's Generative Language API.
pub struct GeminiClient {
    http: HttpClient,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg
            .google_api_key
            .clone()
            .ok_or_else(|| RagError::Configuration("GOOGLE_API_KEY not found".to_string()))?;
        let http = HttpClient::new(cfg.http_timeout_secs).map_err(RagError::Configuration)?;
        Ok(Self {
            http,
            base_url: cfg.gemini_url.trim_end_matches('/').to_string(),
            model: cfg.gemini_model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let req = GeminiRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiPart { text: prompt }],
            }],
        };
        let res = self
            .http
            .post_json::<GeminiResponse, _>(&url, &req)
            .await
            .map_err(|message| RagError::generation("gemini", message))?;
        let text = gemini_text(res).map_err(|message| RagError::generation("gemini", message))?;
        debug!(model = %self.model, chars = text.len(), "gemini completion received");
        Ok(text)
    }

    fn name(&self) -> String {
        format!("gemini ({})", self.model)
    }
}

fn gemini_text(res: GeminiResponse) -> std::result::Result<String, String> {
    if let Some(reason) = res.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(format!("prompt blocked: {}", reason));
    }
    let candidate = res
        .candidates
        .into_iter()
        .next()
        .ok_or("response contained no candidates")?;
    let parts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if parts.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(format!("candidate carried no text (finish reason: {})", reason));
    }
    Ok(parts.concat())
}
