//! Completion-service abstraction for the Scriba pipeline.
//!
//! Stages and critics talk to an external text-completion capability through
//! the [`CompletionProvider`] trait. Two adapters are provided: GigaChat
//! (OAuth token exchange + chat completions) and a generic OpenAI-compatible
//! endpoint. The [`CompletionClient`] adds middleware for request logging and
//! token-usage accounting.

pub mod client;
pub mod gigachat;
pub mod openai;
pub mod provider;
pub mod types;

pub use client::{CompletionClient, LoggingMiddleware, Middleware, UsageTrackingMiddleware};
pub use gigachat::GigaChatAdapter;
pub use openai::OpenAiCompatAdapter;
pub use provider::{CompletionProvider, DynProvider};
pub use types::{CompletionRequest, CompletionResponse, Usage};
