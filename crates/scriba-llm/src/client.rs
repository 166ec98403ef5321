use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scriba_types::ScribaError;

use crate::{CompletionProvider, CompletionRequest, CompletionResponse, DynProvider};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut CompletionRequest) {}
    fn after(&self, _request: &CompletionRequest, _response: &mut CompletionResponse) {}
}

// ---------------------------------------------------------------------------
// Built-in middleware: LoggingMiddleware
// ---------------------------------------------------------------------------

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut CompletionRequest) {
        tracing::info!(
            model = %request.model,
            system_len = request.system.len(),
            user_len = request.user.len(),
            "completion request"
        );
    }

    fn after(&self, _request: &CompletionRequest, response: &mut CompletionResponse) {
        tracing::info!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion response"
        );
    }
}

// ---------------------------------------------------------------------------
// Built-in middleware: UsageTrackingMiddleware
// ---------------------------------------------------------------------------

/// Accumulates token usage across all completions routed through the client.
/// Cloning yields another handle to the same counters, so callers can keep a
/// handle and read totals after the client has taken ownership.
#[derive(Clone)]
pub struct UsageTrackingMiddleware {
    total_input: Arc<AtomicU64>,
    total_output: Arc<AtomicU64>,
}

impl UsageTrackingMiddleware {
    pub fn new() -> Self {
        Self {
            total_input: Arc::new(AtomicU64::new(0)),
            total_output: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input.load(Ordering::Relaxed)
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens() + self.total_output_tokens()
    }
}

impl Default for UsageTrackingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for UsageTrackingMiddleware {
    fn after(&self, _request: &CompletionRequest, response: &mut CompletionResponse) {
        self.total_input
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.total_output
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// CompletionClient
// ---------------------------------------------------------------------------

pub struct CompletionClient {
    providers: HashMap<String, DynProvider>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl CompletionClient {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            middleware: Vec::new(),
        }
    }

    pub fn register_provider(&mut self, provider: impl CompletionProvider + 'static) {
        let name = provider.name().to_string();
        self.providers.insert(name, DynProvider::new(provider));
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Default model of the provider the given request would resolve to.
    pub fn default_model(&self) -> Option<&str> {
        self.providers.values().next().map(|p| p.default_model())
    }

    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ScribaError> {
        let provider = self.resolve_provider(request)?;
        let mut req = request.clone();

        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp = provider.complete(&req).await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }

        Ok(resp)
    }

    fn resolve_provider(&self, request: &CompletionRequest) -> Result<&DynProvider, ScribaError> {
        // 1. Explicit provider field
        if let Some(ref provider_name) = request.provider {
            return self.providers.get(provider_name).ok_or_else(|| {
                ScribaError::Other(format!("Provider '{}' not registered", provider_name))
            });
        }

        // 2. Single or first registered provider
        if let Some(provider) = self.providers.values().next() {
            return Ok(provider);
        }

        Err(ScribaError::Other("No providers registered".to_string()))
    }

    /// Create from environment variables (detect available credentials).
    pub fn from_env() -> Result<Self, ScribaError> {
        let mut client = Self::new();
        let mut found_any = false;

        if let Ok(adapter) = crate::GigaChatAdapter::from_env() {
            client.register_provider(adapter);
            found_any = true;
        }

        if let Ok(adapter) = crate::OpenAiCompatAdapter::from_env() {
            client.register_provider(adapter);
            found_any = true;
        }

        if !found_any {
            return Err(ScribaError::Other(
                "No completion-service credentials found in environment".to_string(),
            ));
        }

        Ok(client)
    }
}

impl Default for CompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
