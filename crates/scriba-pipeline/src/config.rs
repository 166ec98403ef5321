//! Pipeline configuration.

use crate::runner::RetryPolicy;

/// Knobs for one orchestrator instance. Shared by every stage branch of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How many revision rounds a stage may consume after its first attempt.
    pub max_revisions: u32,
    /// Model name passed to the completion service.
    pub model: String,
    /// Retry budget for each individual completion call.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_revisions: 1,
            model: "GigaChat".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Read overrides from the environment, falling back to defaults.
    ///
    /// `SCRIBA_MAX_REVISIONS` and `SCRIBA_MODEL` are recognized; malformed
    /// values are ignored rather than fatal.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("SCRIBA_MAX_REVISIONS") {
            if let Ok(n) = raw.parse::<u32>() {
                config.max_revisions = n;
            } else {
                tracing::warn!(value = %raw, "Ignoring malformed SCRIBA_MAX_REVISIONS");
            }
        }

        if let Ok(model) = std::env::var("SCRIBA_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }

        config
    }

    pub fn with_max_revisions(mut self, max_revisions: u32) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
