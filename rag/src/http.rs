use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

/// Shared JSON-over-HTTP client for the model backends. Errors are plain
/// strings; each backend wraps them in its own error kind.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { client })
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, String> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| format!("POST {} failed: {}", redact(url), e.without_url()))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(format!("POST {} failed: {} {}", redact(url), status, text));
        }
        from_str::<T>(&text)
            .map_err(|e| format!("POST {} decode failed: {} | {}", redact(url), e, text))
    }
}

/// Strips the query string so API keys never reach logs or the UI.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
