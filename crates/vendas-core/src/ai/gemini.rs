use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ByteStream, GatewayError, LlmClient};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

impl GeminiRequest {
    fn for_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart { text: prompt.to_string() }],
            }],
            // Fixed configuration; generation parameters are not
            // user-controlled
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 2048,
            },
        }
    }
}

/// Client for the hosted generative-text API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: GEMINI_API_BASE.to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str, query: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{method}?{query}key={}",
            self.base_url, self.model, self.api_key
        )
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status: status.as_u16(), details });
        }
        Ok(response)
    }
}

impl LlmClient for GeminiClient {
    /// One blocking generation call; waits for the full response body.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(self.endpoint("generateContent", ""))
            .timeout(self.timeout)
            .json(&GeminiRequest::for_prompt(prompt))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: GeminiResponse = response.json().await?;
        extract_text(body)
    }

    /// Streaming generation: the provider's server-sent-event bytes are
    /// forwarded as they arrive, without buffering the whole response.
    async fn generate_stream(&self, prompt: &str) -> Result<ByteStream, GatewayError> {
        let response = self
            .http
            .post(self.endpoint("streamGenerateContent", "alt=sse&"))
            .timeout(self.timeout)
            .json(&GeminiRequest::for_prompt(prompt))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let stream = response.bytes_stream().map(|chunk| chunk.map_err(GatewayError::from));
        Ok(Box::pin(stream))
    }
}

fn extract_text(body: GeminiResponse) -> Result<String, GatewayError> {
    body.candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or(GatewayError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_the_wire_shape() {
        let request = GeminiRequest::for_prompt("total sales?");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "total sales?");
        let config = &value["generationConfig"];
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 2048);
    }

    #[test]
    fn response_text_is_the_first_candidate_part() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "42 widgets"}], "role": "model"}}]}"#,
        )
        .unwrap();

        assert_eq!(extract_text(body).unwrap(), "42 widgets");
    }

    #[test]
    fn empty_candidates_are_an_error() {
        let body: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(extract_text(body), Err(GatewayError::Empty)));
    }

    #[test]
    fn candidate_without_parts_is_an_error() {
        let body: GeminiResponse = serde_json::from_str(r#"{"candidates": [{}]}"#).unwrap();
        assert!(matches!(extract_text(body), Err(GatewayError::Empty)));
    }

    #[test]
    fn endpoint_embeds_model_and_key() {
        let client = GeminiClient::new("secret", "gemini-2.5-flash", Duration::from_secs(5))
            .with_base_url("http://localhost:9999/");

        assert_eq!(
            client.endpoint("generateContent", ""),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
        assert_eq!(
            client.endpoint("streamGenerateContent", "alt=sse&"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse&key=secret"
        );
    }
}
