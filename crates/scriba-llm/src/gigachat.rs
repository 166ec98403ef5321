use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};

use crate::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
use scriba_types::ScribaError;

const DEFAULT_BASE_URL: &str = "https://gigachat.devices.sberbank.ru";
const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

// Refresh the cached access token this long before its stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// GigaChatAdapter
// ---------------------------------------------------------------------------

/// Adapter for the GigaChat completions API.
///
/// GigaChat authenticates in two steps: the long-lived authorization key is
/// exchanged for a short-lived access token, which is then used as a Bearer
/// credential on chat completions. The token is cached and refreshed lazily.
pub struct GigaChatAdapter {
    auth_key: String,
    client: reqwest::Client,
    base_url: String,
    auth_url: String,
    scope: String,
    default_model: String,
    token: tokio::sync::RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    refresh_after: Instant,
}

impl GigaChatAdapter {
    pub fn new(auth_key: String) -> Self {
        // The upstream service presents a certificate from the Russian trust
        // chain that is not in standard root stores.
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            auth_key,
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            default_model: "GigaChat".to_string(),
            token: tokio::sync::RwLock::new(None),
        }
    }

    pub fn from_env() -> Result<Self, ScribaError> {
        let key = std::env::var("GIGACHAT_AUTH_KEY").map_err(|_| ScribaError::AuthError {
            provider: "gigachat".into(),
        })?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_auth_url(mut self, url: String) -> Self {
        self.auth_url = url;
        self
    }

    /// Return a valid access token, exchanging the authorization key when the
    /// cache is empty or about to expire.
    async fn ensure_token(&self) -> Result<String, ScribaError> {
        if let Some(cached) = self.token.read().await.clone() {
            if Instant::now() < cached.refresh_after {
                return Ok(cached.access_token);
            }
        }

        let resp = self
            .client
            .post(&self.auth_url)
            .header("Authorization", format!("Basic {}", self.auth_key))
            .header("RqUID", uuid::Uuid::new_v4().to_string())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("scope={}", self.scope))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(transport_error)?;

        if !status.is_success() {
            // A rejected authorization key is not recoverable by retrying.
            return Err(ScribaError::AuthError {
                provider: "gigachat".into(),
            });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)?;
        let access_token = parsed["access_token"]
            .as_str()
            .ok_or_else(|| ScribaError::AuthError {
                provider: "gigachat".into(),
            })?
            .to_string();

        // expires_at is a millisecond epoch; convert to a local deadline.
        let ttl = parsed["expires_at"]
            .as_u64()
            .and_then(|expires_at_ms| {
                let now_ms = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .ok()?
                    .as_millis() as u64;
                Some(Duration::from_millis(expires_at_ms.saturating_sub(now_ms)))
            })
            .unwrap_or(Duration::from_secs(25 * 60));

        let cached = CachedToken {
            access_token: access_token.clone(),
            refresh_after: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN),
        };
        *self.token.write().await = Some(cached);

        tracing::debug!(ttl_secs = ttl.as_secs(), "GigaChat access token refreshed");
        Ok(access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }
}

fn transport_error(e: reqwest::Error) -> ScribaError {
    if e.is_timeout() {
        return ScribaError::RequestTimeout {
            provider: "gigachat".into(),
            timeout_ms: 120_000,
        };
    }
    ScribaError::ProviderError {
        provider: "gigachat".into(),
        status: 0,
        message: e.to_string(),
        retryable: true,
    }
}

// ---------------------------------------------------------------------------
// Request/response translation
// ---------------------------------------------------------------------------

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

pub(crate) fn parse_chat_response(
    provider: &str,
    body: &serde_json::Value,
) -> Result<CompletionResponse, ScribaError> {
    let text = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ScribaError::ProviderError {
            provider: provider.into(),
            status: 0,
            message: "response has no message content".into(),
            retryable: false,
        })?
        .to_string();

    let model = body["model"].as_str().unwrap_or("").to_string();

    let usage_obj = &body["usage"];
    let input_tokens = usage_obj["prompt_tokens"].as_u64().unwrap_or(0);
    let output_tokens = usage_obj["completion_tokens"].as_u64().unwrap_or(0);
    let total_tokens = usage_obj["total_tokens"]
        .as_u64()
        .unwrap_or(input_tokens + output_tokens);

    Ok(CompletionResponse {
        text,
        model,
        usage: Usage {
            input_tokens,
            output_tokens,
            total_tokens,
        },
    })
}

fn map_error(status: u16, body: &str) -> ScribaError {
    match status {
        429 => ScribaError::RateLimited {
            provider: "gigachat".into(),
            retry_after_ms: 1000,
        },
        500..=599 => ScribaError::ProviderError {
            provider: "gigachat".into(),
            status,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => ScribaError::ProviderError {
            provider: "gigachat".into(),
            status,
            message: extract_error_message(body),
            retryable: false,
        },
    }
}

pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["message"]
                .as_str()
                .or_else(|| v["error"]["message"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// CompletionProvider implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl CompletionProvider for GigaChatAdapter {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ScribaError> {
        let token = self.ensure_token().await?;
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/api/v1/chat/completions", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let response_body = resp
            .text()
            .await
            .map_err(transport_error)?;

        if status.as_u16() == 401 {
            // The cached token expired early; drop it so the next attempt
            // re-authenticates rather than failing terminally.
            self.invalidate_token().await;
            return Err(ScribaError::ProviderError {
                provider: "gigachat".into(),
                status: 401,
                message: "access token rejected, will re-authenticate".into(),
                retryable: true,
            });
        }

        if !status.is_success() {
            return Err(map_error(status.as_u16(), &response_body));
        }

        let json: serde_json::Value = serde_json::from_str(&response_body)?;
        parse_chat_response("gigachat", &json)
    }

    fn name(&self) -> &str {
        "gigachat"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
