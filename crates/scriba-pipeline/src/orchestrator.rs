//! Orchestrator: fans one article out across the four stage branches, drives
//! each agent/critic revision loop, and folds the results into a record.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use scriba_llm::CompletionClient;
use scriba_types::{
    IndexedRecord, PipelineState, Result, ScribaError, Stage, StageSlot, StatusTag, Verdict,
};

use crate::controller::{decide, Decision};
use crate::critic::CriticAgent;
use crate::indexer::Indexer;
use crate::runner::StageRunner;
use crate::stage::StageAgent;
use crate::PipelineConfig;

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Everything one run produced: the final state, the indexed record, and the
/// terminal decision each branch ended on.
#[derive(Debug)]
pub struct PipelineRun {
    pub state: PipelineState,
    /// `None` only when the input was empty and no stage ran.
    pub record: Option<IndexedRecord>,
    pub decisions: HashMap<Stage, Decision>,
}

/// One branch's contribution, produced off-thread and merged at the join.
struct BranchOutcome {
    stage: Stage,
    slot: StageSlot,
    trace: Vec<StatusTag>,
    decision: Decision,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    client: Arc<CompletionClient>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(client: Arc<CompletionClient>, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Build from environment credentials and environment config overrides.
    pub fn from_env() -> Result<Self> {
        let client = CompletionClient::from_env()?;
        Ok(Self::new(Arc::new(client), PipelineConfig::from_env()))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the registered completion providers.
    pub fn provider_names(&self) -> Vec<String> {
        self.client.provider_names()
    }

    /// Process one article end to end.
    ///
    /// The four stage branches run concurrently; each drives its own
    /// agent/critic loop until the controller settles it. Branch traces are
    /// merged additively into the shared state at the join, so the combined
    /// trace order between branches is unspecified but per-branch order holds.
    pub async fn run(&self, article_text: &str) -> Result<PipelineRun> {
        let mut state = PipelineState::new(article_text);
        state.push_status(StatusTag::Started);

        if article_text.trim().is_empty() {
            tracing::warn!("Empty article text, skipping all stages");
            state.push_status(StatusTag::ErrorNoText);
            return Ok(PipelineRun {
                state,
                record: None,
                decisions: HashMap::new(),
            });
        }

        state.push_status(StatusTag::TextExtracted);
        tracing::info!(text_len = article_text.len(), "Article accepted, fanning out");

        let mut join_set = JoinSet::new();
        for stage in Stage::ALL {
            let client = Arc::clone(&self.client);
            let config = self.config.clone();
            let text = state.article_text.clone();
            join_set.spawn(async move { run_branch(stage, &text, client, &config).await });
        }

        let mut decisions = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let outcome = joined
                .map_err(|e| ScribaError::Other(format!("Stage task panicked: {e}")))??;
            *state.slot_mut(outcome.stage) = outcome.slot;
            state.merge_status(outcome.trace);
            decisions.insert(outcome.stage, outcome.decision);
        }

        let record = Indexer::collect(&mut state);
        tracing::info!("Article indexed");

        Ok(PipelineRun {
            state,
            record: Some(record),
            decisions,
        })
    }
}

/// Drive one stage's agent/critic loop to a terminal decision.
async fn run_branch(
    stage: Stage,
    article_text: &str,
    client: Arc<CompletionClient>,
    config: &PipelineConfig,
) -> Result<BranchOutcome> {
    let agent = StageAgent::new(stage, &config.model, Arc::clone(&client));
    let critic = CriticAgent::new(stage, &config.model, client);
    let runner = StageRunner::new(config.retry.clone());

    let mut slot = StageSlot::default();
    let mut trace = Vec::new();

    loop {
        let critique = if slot.critique.is_empty() {
            None
        } else {
            Some(slot.critique.clone())
        };

        let artifact = runner
            .run(stage, || agent.attempt(article_text, critique.as_deref()))
            .await?;
        slot.artifact = artifact;
        slot.critique.clear();
        slot.revision_count += 1;
        trace.push(StatusTag::Completed);

        let review = runner
            .run(stage, || critic.review(article_text, &slot.artifact))
            .await?;
        match review.verdict {
            Verdict::Approved => trace.push(StatusTag::CriticApproved),
            Verdict::Rejected => {
                trace.push(StatusTag::CriticRejected);
                slot.critique = review.critique;
            }
        }

        match decide(
            stage,
            slot.revision_count,
            Some(review.verdict),
            config.max_revisions,
        ) {
            Decision::Revise => continue,
            decision => {
                return Ok(BranchOutcome {
                    stage,
                    slot,
                    trace,
                    decision,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriba_llm::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::runner::RetryPolicy;

    /// A critic request carries the reviewer instruction; everything else is
    /// a producing-stage request.
    fn is_critic_request(request: &CompletionRequest) -> bool {
        request.system.contains("рецензент")
    }

    /// Scripted provider: stage requests echo an artifact, critic requests
    /// reply from a per-critic script (falling back to the last entry).
    struct ScriptedProvider {
        critic_script: Vec<&'static str>,
        critic_calls: Mutex<HashMap<String, usize>>,
        total_calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(critic_script: Vec<&'static str>) -> Self {
            Self {
                critic_script,
                critic_calls: Mutex::new(HashMap::new()),
                total_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ScribaError> {
            self.total_calls.fetch_add(1, Ordering::SeqCst);

            let text = if is_critic_request(request) {
                let mut calls = self.critic_calls.lock().unwrap();
                let n = calls.entry(request.system.clone()).or_insert(0);
                let reply = self
                    .critic_script
                    .get(*n)
                    .or(self.critic_script.last())
                    .copied()
                    .unwrap_or("APPROVED");
                *n += 1;
                reply.to_string()
            } else {
                format!("artifact: {}", request.system.chars().take(20).collect::<String>())
            };

            Ok(CompletionResponse {
                text,
                model: request.model.clone(),
                usage: Usage::default(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }
    }

    fn orchestrator_with(
        provider: ScriptedProvider,
        max_revisions: u32,
    ) -> (Orchestrator, Arc<AtomicUsize>) {
        let calls = provider.total_calls.clone();
        let mut client = CompletionClient::new();
        client.register_provider(provider);
        let config = PipelineConfig::default()
            .with_model("mock-model")
            .with_max_revisions(max_revisions)
            .with_retry(RetryPolicy::immediate(3));
        (Orchestrator::new(Arc::new(client), config), calls)
    }

    // 1. Every critic approves on the first round
    #[tokio::test]
    async fn all_approved_single_round() {
        let (orch, calls) = orchestrator_with(ScriptedProvider::new(vec!["APPROVED"]), 1);
        let run = orch.run("текст научной статьи").await.unwrap();

        let record = run.record.expect("record should be produced");
        assert!(record.rubric.starts_with("artifact:"));
        assert!(record.keywords.starts_with("artifact:"));
        assert!(record.normalized.starts_with("artifact:"));
        assert!(record.summary.starts_with("artifact:"));

        for stage in Stage::ALL {
            assert_eq!(run.state.slot(stage).revision_count, 1);
            assert_eq!(run.decisions[&stage], Decision::Continue);
        }

        assert_eq!(run.state.count_status(StatusTag::Started), 1);
        assert_eq!(run.state.count_status(StatusTag::TextExtracted), 1);
        assert_eq!(run.state.count_status(StatusTag::Completed), 4);
        assert_eq!(run.state.count_status(StatusTag::CriticApproved), 4);
        assert_eq!(run.state.count_status(StatusTag::Indexed), 1);

        // 4 stage calls + 4 critic calls
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    // 2. Reject then approve: one revision round, then the ceiling settles it
    #[tokio::test]
    async fn reject_then_approve_hits_ceiling() {
        let (orch, _calls) =
            orchestrator_with(ScriptedProvider::new(vec!["REJECTED: неточно", "APPROVED"]), 1);
        let run = orch.run("текст").await.unwrap();

        for stage in Stage::ALL {
            // First attempt rejected, second attempt ran; budget of one
            // revision is then spent, so the branch ends on the ceiling.
            assert_eq!(run.state.slot(stage).revision_count, 2);
            assert_eq!(run.decisions[&stage], Decision::MaxRetries);
        }

        assert_eq!(run.state.count_status(StatusTag::CriticRejected), 4);
        assert_eq!(run.state.count_status(StatusTag::CriticApproved), 4);
        assert_eq!(run.state.count_status(StatusTag::Completed), 8);

        // The revised artifact is still indexed.
        assert!(run.record.is_some());
    }

    // 3. Persistent rejection terminates at the ceiling, record kept
    #[tokio::test]
    async fn persistent_rejection_terminates() {
        let (orch, _calls) =
            orchestrator_with(ScriptedProvider::new(vec!["REJECTED: всегда плохо"]), 1);
        let run = orch.run("текст").await.unwrap();

        for stage in Stage::ALL {
            assert_eq!(run.state.slot(stage).revision_count, 2);
            assert_eq!(run.decisions[&stage], Decision::MaxRetries);
        }
        assert_eq!(run.state.count_status(StatusTag::CriticRejected), 8);
        assert!(run.record.is_some());
    }

    // 4. Empty input short-circuits before any provider call
    #[tokio::test]
    async fn empty_input_skips_stages() {
        let (orch, calls) = orchestrator_with(ScriptedProvider::new(vec!["APPROVED"]), 1);
        let run = orch.run("   ").await.unwrap();

        assert!(run.record.is_none());
        assert!(run.decisions.is_empty());
        assert_eq!(run.state.count_status(StatusTag::Started), 1);
        assert_eq!(run.state.count_status(StatusTag::ErrorNoText), 1);
        assert_eq!(run.state.count_status(StatusTag::Indexed), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // 5. Larger budget lets a branch revise until approval
    #[tokio::test]
    async fn larger_budget_revises_until_approved() {
        let (orch, _calls) = orchestrator_with(
            ScriptedProvider::new(vec!["REJECTED: раз", "REJECTED: два", "APPROVED"]),
            10,
        );
        let run = orch.run("текст").await.unwrap();

        for stage in Stage::ALL {
            assert_eq!(run.state.slot(stage).revision_count, 3);
            assert_eq!(run.decisions[&stage], Decision::Continue);
        }
    }

    // 6. A terminal provider error fails the whole run
    #[tokio::test]
    async fn terminal_error_fails_run() {
        struct FailingProvider;

        #[async_trait]
        impl CompletionProvider for FailingProvider {
            async fn complete(
                &self,
                _request: &CompletionRequest,
            ) -> std::result::Result<CompletionResponse, ScribaError> {
                Err(ScribaError::AuthError {
                    provider: "failing".into(),
                })
            }

            fn name(&self) -> &str {
                "failing"
            }

            fn default_model(&self) -> &str {
                "mock-model"
            }
        }

        let mut client = CompletionClient::new();
        client.register_provider(FailingProvider);
        let orch = Orchestrator::new(
            Arc::new(client),
            PipelineConfig::default()
                .with_model("mock-model")
                .with_retry(RetryPolicy::immediate(2)),
        );

        let result = orch.run("текст").await;
        assert!(matches!(result, Err(ScribaError::AuthError { .. })));
    }
}
