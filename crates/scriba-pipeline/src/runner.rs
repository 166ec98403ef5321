//! Bounded retry around every completion call a stage or critic makes.

use std::time::Duration;

use scriba_types::{Result, ScribaError, Stage};

// ---------------------------------------------------------------------------
// BackoffPolicy
// ---------------------------------------------------------------------------

/// Backoff policy controlling the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let millis = base.as_millis() as u64 * 2u64.saturating_pow(attempt as u32);
                Duration::from_millis(millis).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many times a stage may call the completion service, and how it paces
/// those calls.
///
/// `pacing` is a flat pause before every attempt, including the first; the
/// upstream service throttles aggressively, and a small constant gap between
/// calls avoids tripping its rate limiter in the common case. `backoff`
/// applies only between failed attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub pacing: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            pacing: Duration::from_secs(1),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeps, for tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            pacing: Duration::ZERO,
            backoff: BackoffPolicy::None,
        }
    }
}

// ---------------------------------------------------------------------------
// StageRunner
// ---------------------------------------------------------------------------

/// Executes a stage's completion call under a [`RetryPolicy`].
///
/// Retryable failures (rate limits, timeouts, transient provider errors) are
/// retried with backoff up to the attempt ceiling; terminal failures are
/// returned immediately. When the budget runs out the runner surfaces
/// [`ScribaError::AttemptsExhausted`] naming the stage, never the last raw
/// provider error.
#[derive(Debug, Clone)]
pub struct StageRunner {
    policy: RetryPolicy,
}

impl StageRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn run<F, Fut, T>(&self, stage: Stage, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if !self.policy.pacing.is_zero() {
                tokio::time::sleep(self.policy.pacing).await;
            }

            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.policy.backoff.delay_for_attempt(attempt);
                    tracing::warn!(
                        stage = %stage,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retryable stage error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    tracing::error!(stage = %stage, attempts = max_attempts, error = %e, "Retry budget exhausted");
                    return Err(ScribaError::AttemptsExhausted {
                        stage,
                        attempts: max_attempts,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop always returns within max_attempts iterations")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
