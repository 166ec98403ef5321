use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CompletionRequest
// ---------------------------------------------------------------------------

/// One completion call: a system instruction plus the user text it applies to.
///
/// The pipeline never needs multi-turn conversations, tools, or streaming, so
/// the request shape stays deliberately flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    /// The fixed task instruction (with any appended corrective note).
    pub system: String,
    /// The article text the instruction operates on.
    pub user: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Explicit provider name; when absent the client resolves one itself.
    pub provider: Option<String>,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
            max_tokens: None,
            temperature: None,
            provider: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionResponse / Usage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The completion text, taken verbatim as the stage artifact.
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}
