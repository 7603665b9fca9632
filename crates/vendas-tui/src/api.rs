use anyhow::{anyhow, Result};
use reqwest::Client;

use vendas_core::state::{AnalyzeRequest, AnalyzeResponse, FileInfo, ReloadResponse};

/// HTTP client for the analytics server.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one question; the reply is the full generated answer.
    pub async fn analyze(&self, prompt: &str) -> Result<AnalyzeResponse> {
        let response = self
            .http
            .post(format!("{}/api/analyze", self.base_url))
            .json(&AnalyzeRequest { prompt: prompt.to_string() })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(error_message(
                response.status().as_u16(),
                &response.text().await.unwrap_or_default(),
            )));
        }

        Ok(response.json().await?)
    }

    pub async fn list_files(&self) -> Result<Vec<FileInfo>> {
        let response = self
            .http
            .get(format!("{}/api/drive/files", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(error_message(
                response.status().as_u16(),
                &response.text().await.unwrap_or_default(),
            )));
        }

        Ok(response.json().await?)
    }

    pub async fn reload(&self) -> Result<ReloadResponse> {
        let response = self
            .http
            .post(format!("{}/api/drive/reload", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(error_message(
                response.status().as_u16(),
                &response.text().await.unwrap_or_default(),
            )));
        }

        Ok(response.json().await?)
    }
}

/// Prefer the server's `error` field; fall back to the bare status code.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP error {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3001/");
        assert_eq!(client.base_url(), "http://localhost:3001");
    }

    #[test]
    fn error_message_prefers_server_error_field() {
        let message = error_message(429, r#"{"error": "Rate limit exceeded."}"#);
        assert_eq!(message, "Rate limit exceeded.");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        assert_eq!(error_message(502, "not json"), "HTTP error 502");
        assert_eq!(error_message(500, r#"{"details": "x"}"#), "HTTP error 500");
    }
}
