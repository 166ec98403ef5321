use async_trait::async_trait;
use serde_json::json;

use crate::gigachat::{extract_error_message, parse_chat_response};
use crate::{CompletionProvider, CompletionRequest, CompletionResponse};
use scriba_types::ScribaError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// OpenAiCompatAdapter
// ---------------------------------------------------------------------------

/// Adapter for any endpoint speaking the OpenAI chat-completions dialect.
/// Point `OPENAI_BASE_URL` at a local or hosted compatible server to swap the
/// completion backend without touching pipeline code.
pub struct OpenAiCompatAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    default_model: String,
}

impl OpenAiCompatAdapter {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ScribaError> {
        let key = std::env::var("OPENAI_API_KEY").map_err(|_| ScribaError::AuthError {
            provider: "openai".into(),
        })?;
        let mut adapter = Self::new(key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            adapter.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            adapter.default_model = model;
        }
        Ok(adapter)
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn build_request_body(request: &CompletionRequest) -> serde_json::Value {
    let mut body = json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": request.user },
        ],
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

fn transport_error(e: reqwest::Error) -> ScribaError {
    if e.is_timeout() {
        return ScribaError::RequestTimeout {
            provider: "openai".into(),
            timeout_ms: 120_000,
        };
    }
    ScribaError::ProviderError {
        provider: "openai".into(),
        status: 0,
        message: e.to_string(),
        retryable: true,
    }
}

fn map_error(status: u16, body: &str, retry_after: Option<u64>) -> ScribaError {
    match status {
        401 | 403 => ScribaError::AuthError {
            provider: "openai".into(),
        },
        429 => ScribaError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: retry_after.map(|s| s * 1000).unwrap_or(1000),
        },
        500..=599 => ScribaError::ProviderError {
            provider: "openai".into(),
            status,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => ScribaError::ProviderError {
            provider: "openai".into(),
            status,
            message: extract_error_message(body),
            retryable: false,
        },
    }
}

// ---------------------------------------------------------------------------
// CompletionProvider implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl CompletionProvider for OpenAiCompatAdapter {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ScribaError> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let response_body = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(map_error(status.as_u16(), &response_body, retry_after));
        }

        let json: serde_json::Value = serde_json::from_str(&response_body)?;
        parse_chat_response("openai", &json)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
