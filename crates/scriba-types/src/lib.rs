//! Shared types for the Scriba article-processing pipeline.
//!
//! This crate provides the foundational types used across all other Scriba crates:
//! - `ScribaError` — unified error taxonomy
//! - `Stage` / `StatusTag` / `Verdict` — pipeline vocabulary
//! - `PipelineState` — the mutable record threaded through one run
//! - `IndexedRecord` — the immutable aggregated output of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ScribaError
// ---------------------------------------------------------------------------

/// Unified error type for all Scriba subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ScribaError {
    // === Completion provider errors ===
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthError { provider: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    RequestTimeout { provider: String, timeout_ms: u64 },

    // === Pipeline errors ===
    #[error("Article text is empty; nothing to process")]
    EmptyInput,

    #[error("Stage '{stage}' exhausted its retry budget after {attempts} attempts")]
    AttemptsExhausted { stage: Stage, attempts: usize },

    // === Extraction errors ===
    #[error("Text extraction failed for '{path}': {message}")]
    ExtractionFailed { path: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ScribaError {
    /// Returns `true` if the error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScribaError::RateLimited { .. }
                | ScribaError::RequestTimeout { .. }
                | ScribaError::ProviderError {
                    retryable: true,
                    ..
                }
        )
    }

    /// Returns `true` if the error is permanent and retrying will not help.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScribaError::AuthError { .. }
                | ScribaError::EmptyInput
                | ScribaError::ExtractionFailed { .. }
        )
    }

    /// Maps the error to an HTTP status code for server mode.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ScribaError::RateLimited { .. } => Some(429),
            ScribaError::AuthError { .. } => Some(401),
            ScribaError::ProviderError { status, .. } => Some(*status),
            ScribaError::RequestTimeout { .. } => Some(504),
            ScribaError::EmptyInput | ScribaError::ExtractionFailed { .. } => Some(400),
            ScribaError::AttemptsExhausted { .. } => Some(502),
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, ScribaError>`.
pub type Result<T> = std::result::Result<T, ScribaError>;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One of the four independent text-transformation tasks applied to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Rubric / subject-classification assignment.
    Rubric,
    /// Keyword extraction.
    Keyword,
    /// Text normalization.
    Normal,
    /// Summarization.
    Summary,
}

impl Stage {
    /// All stages, in a fixed order. The pipeline has no cross-stage
    /// dependency; this order only matters for deterministic iteration.
    pub const ALL: [Stage; 4] = [Stage::Rubric, Stage::Keyword, Stage::Normal, Stage::Summary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rubric => "rubric",
            Stage::Keyword => "keyword",
            Stage::Normal => "normal",
            Stage::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StatusTag — append-only lifecycle trace entries
// ---------------------------------------------------------------------------

/// A lifecycle event recorded in the pipeline's status trace.
///
/// The trace is append-only: concurrent branches produce local fragments that
/// are merged additively at the fan-in barrier, so entries accumulate as a
/// union regardless of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    Started,
    TextExtracted,
    Completed,
    CriticApproved,
    CriticRejected,
    ErrorNoText,
    Indexed,
}

impl StatusTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTag::Started => "started",
            StatusTag::TextExtracted => "text_extracted",
            StatusTag::Completed => "completed",
            StatusTag::CriticApproved => "critic_approved",
            StatusTag::CriticRejected => "critic_rejected",
            StatusTag::ErrorNoText => "error_no_text",
            StatusTag::Indexed => "indexed",
        }
    }
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Binary outcome of a critic review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
}

// ---------------------------------------------------------------------------
// StageSlot / PipelineState
// ---------------------------------------------------------------------------

/// Per-stage working data inside a [`PipelineState`].
///
/// `critique` is non-empty only immediately after a rejection, and is cleared
/// when the next attempt consumes it. `revision_count` counts attempts and
/// only ever increases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSlot {
    pub artifact: String,
    pub critique: String,
    pub revision_count: u32,
}

/// The single mutable record threaded through one pipeline run.
///
/// Created per incoming article, lives for the duration of the run, and is
/// discarded once the [`IndexedRecord`] has been produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Immutable input, set once at start.
    pub article_text: String,
    pub rubric: StageSlot,
    pub keyword: StageSlot,
    pub normal: StageSlot,
    pub summary: StageSlot,
    /// Append-only trace of lifecycle events.
    pub status: Vec<StatusTag>,
}

impl PipelineState {
    pub fn new(article_text: impl Into<String>) -> Self {
        Self {
            article_text: article_text.into(),
            rubric: StageSlot::default(),
            keyword: StageSlot::default(),
            normal: StageSlot::default(),
            summary: StageSlot::default(),
            status: Vec::new(),
        }
    }

    pub fn slot(&self, stage: Stage) -> &StageSlot {
        match stage {
            Stage::Rubric => &self.rubric,
            Stage::Keyword => &self.keyword,
            Stage::Normal => &self.normal,
            Stage::Summary => &self.summary,
        }
    }

    pub fn slot_mut(&mut self, stage: Stage) -> &mut StageSlot {
        match stage {
            Stage::Rubric => &mut self.rubric,
            Stage::Keyword => &mut self.keyword,
            Stage::Normal => &mut self.normal,
            Stage::Summary => &mut self.summary,
        }
    }

    /// Append one event to the status trace.
    pub fn push_status(&mut self, tag: StatusTag) {
        self.status.push(tag);
    }

    /// Merge a branch-local trace fragment into the shared trace.
    /// The merge is purely additive, so concurrent writers never conflict.
    pub fn merge_status(&mut self, tags: impl IntoIterator<Item = StatusTag>) {
        self.status.extend(tags);
    }

    /// Number of occurrences of `tag` in the trace.
    pub fn count_status(&self, tag: StatusTag) -> usize {
        self.status.iter().filter(|t| **t == tag).count()
    }
}

// ---------------------------------------------------------------------------
// IndexedRecord
// ---------------------------------------------------------------------------

/// Final aggregated output of one pipeline run. Immutable once created;
/// assembled by the indexer only after every stage/critic pair has reached a
/// terminal decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub article_text: String,
    pub rubric: String,
    pub keywords: String,
    pub summary: String,
    pub normalized: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_provider_error() {
        let err = ScribaError::ProviderError {
            provider: "gigachat".into(),
            status: 500,
            message: "internal server error".into(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "Provider gigachat returned HTTP 500: internal server error"
        );
    }

    #[test]
    fn error_display_attempts_exhausted() {
        let err = ScribaError::AttemptsExhausted {
            stage: Stage::Keyword,
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Stage 'keyword' exhausted its retry budget after 5 attempts"
        );
    }

    #[test]
    fn error_display_extraction_failed() {
        let err = ScribaError::ExtractionFailed {
            path: "paper.pdf".into(),
            message: "not a PDF".into(),
        };
        assert_eq!(
            err.to_string(),
            "Text extraction failed for 'paper.pdf': not a PDF"
        );
    }

    // --- is_retryable / is_terminal ---

    #[test]
    fn retryable_rate_limited_and_timeout() {
        assert!(ScribaError::RateLimited {
            provider: "x".into(),
            retry_after_ms: 1000,
        }
        .is_retryable());
        assert!(ScribaError::RequestTimeout {
            provider: "x".into(),
            timeout_ms: 5000,
        }
        .is_retryable());
    }

    #[test]
    fn provider_error_retryable_only_when_flagged() {
        let transient = ScribaError::ProviderError {
            provider: "x".into(),
            status: 503,
            message: "unavailable".into(),
            retryable: true,
        };
        let permanent = ScribaError::ProviderError {
            provider: "x".into(),
            status: 400,
            message: "bad request".into(),
            retryable: false,
        };
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn terminal_errors() {
        assert!(ScribaError::AuthError {
            provider: "x".into()
        }
        .is_terminal());
        assert!(ScribaError::EmptyInput.is_terminal());
        assert!(ScribaError::ExtractionFailed {
            path: "a".into(),
            message: "b".into()
        }
        .is_terminal());
        assert!(!ScribaError::RateLimited {
            provider: "x".into(),
            retry_after_ms: 0,
        }
        .is_terminal());
    }

    // --- http_status ---

    #[test]
    fn http_status_mapping() {
        assert_eq!(
            ScribaError::RateLimited {
                provider: "x".into(),
                retry_after_ms: 0,
            }
            .http_status(),
            Some(429)
        );
        assert_eq!(
            ScribaError::AuthError {
                provider: "x".into()
            }
            .http_status(),
            Some(401)
        );
        assert_eq!(ScribaError::EmptyInput.http_status(), Some(400));
        assert_eq!(
            ScribaError::AttemptsExhausted {
                stage: Stage::Rubric,
                attempts: 3,
            }
            .http_status(),
            Some(502)
        );
        assert_eq!(ScribaError::Other("x".into()).http_status(), None);
    }

    #[test]
    fn provider_error_status_passes_through() {
        let err = ScribaError::ProviderError {
            provider: "x".into(),
            status: 502,
            message: "bad gateway".into(),
            retryable: true,
        };
        assert_eq!(err.http_status(), Some(502));
    }

    // --- Stage / StatusTag ---

    #[test]
    fn stage_serializes_to_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::Rubric).unwrap(), "\"rubric\"");
        assert_eq!(
            serde_json::to_string(&Stage::Summary).unwrap(),
            "\"summary\""
        );
    }

    #[test]
    fn stage_all_covers_every_variant() {
        assert_eq!(Stage::ALL.len(), 4);
        let strs: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(strs, vec!["rubric", "keyword", "normal", "summary"]);
    }

    #[test]
    fn status_tag_round_trip() {
        let tag: StatusTag = serde_json::from_str("\"critic_rejected\"").unwrap();
        assert_eq!(tag, StatusTag::CriticRejected);
        assert_eq!(tag.to_string(), "critic_rejected");
        assert_eq!(
            serde_json::to_string(&StatusTag::ErrorNoText).unwrap(),
            "\"error_no_text\""
        );
    }

    // --- PipelineState ---

    #[test]
    fn state_slot_accessors_are_distinct() {
        let mut state = PipelineState::new("text");
        state.slot_mut(Stage::Keyword).artifact = "kw".into();
        state.slot_mut(Stage::Summary).revision_count = 2;

        assert_eq!(state.slot(Stage::Keyword).artifact, "kw");
        assert_eq!(state.slot(Stage::Summary).revision_count, 2);
        assert!(state.slot(Stage::Rubric).artifact.is_empty());
        assert_eq!(state.slot(Stage::Normal).revision_count, 0);
    }

    #[test]
    fn state_status_merge_is_additive() {
        let mut state = PipelineState::new("text");
        state.push_status(StatusTag::Started);
        state.merge_status(vec![StatusTag::Completed, StatusTag::CriticApproved]);
        state.merge_status(vec![StatusTag::Completed]);

        assert_eq!(state.status.len(), 4);
        assert_eq!(state.count_status(StatusTag::Completed), 2);
        assert_eq!(state.count_status(StatusTag::CriticApproved), 1);
        assert_eq!(state.count_status(StatusTag::CriticRejected), 0);
    }

    #[test]
    fn indexed_record_serializes() {
        let record = IndexedRecord {
            article_text: "text".into(),
            rubric: "r".into(),
            keywords: "k".into(),
            summary: "s".into(),
            normalized: "n".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["rubric"], "r");
        assert!(json["timestamp"].is_string());
    }
}
