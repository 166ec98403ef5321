//! Producing agents: one per stage, all driven by the same completion client.

use std::sync::Arc;

use scriba_llm::{CompletionClient, CompletionRequest};
use scriba_types::{Result, Stage};

use crate::prompts;

/// A stage's producing agent. Stateless between attempts; revision context is
/// passed in as the critique from the previous round.
pub struct StageAgent {
    stage: Stage,
    model: String,
    client: Arc<CompletionClient>,
}

impl StageAgent {
    pub fn new(stage: Stage, model: impl Into<String>, client: Arc<CompletionClient>) -> Self {
        Self {
            stage,
            model: model.into(),
            client,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Produce one candidate artifact for the article.
    ///
    /// On a first attempt `critique` is `None` and the plain instruction is
    /// used; on a revision the rejected round's critique is appended as a
    /// corrective note.
    pub async fn attempt(&self, article_text: &str, critique: Option<&str>) -> Result<String> {
        let instruction = match critique {
            Some(c) if !c.is_empty() => prompts::with_critique(prompts::instruction_for(self.stage), c),
            _ => prompts::instruction_for(self.stage).to_string(),
        };

        let request = CompletionRequest::new(&self.model, instruction, article_text);
        let response = self.client.complete(&request).await?;

        tracing::debug!(
            stage = %self.stage,
            revision = critique.is_some(),
            artifact_len = response.text.len(),
            "Stage artifact produced"
        );
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriba_llm::{CompletionProvider, CompletionResponse, Usage};
    use scriba_types::ScribaError;
    use std::sync::Mutex;

    /// Records the system instruction of every request it serves.
    struct RecordingProvider {
        seen_systems: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ScribaError> {
            self.seen_systems.lock().unwrap().push(request.system.clone());
            Ok(CompletionResponse {
                text: "artifact".into(),
                model: request.model.clone(),
                usage: Usage::default(),
            })
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }
    }

    fn agent_with_recorder(stage: Stage) -> (StageAgent, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut client = CompletionClient::new();
        client.register_provider(RecordingProvider {
            seen_systems: seen.clone(),
        });
        (StageAgent::new(stage, "mock-model", Arc::new(client)), seen)
    }

    #[tokio::test]
    async fn first_attempt_uses_plain_instruction() {
        let (agent, seen) = agent_with_recorder(Stage::Rubric);
        let artifact = agent.attempt("статья", None).await.unwrap();
        assert_eq!(artifact, "artifact");

        let systems = seen.lock().unwrap();
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0], prompts::instruction_for(Stage::Rubric));
    }

    #[tokio::test]
    async fn revision_attempt_appends_critique() {
        let (agent, seen) = agent_with_recorder(Stage::Summary);
        agent
            .attempt("статья", Some("саммари слишком длинное"))
            .await
            .unwrap();

        let systems = seen.lock().unwrap();
        assert!(systems[0].starts_with(prompts::instruction_for(Stage::Summary)));
        assert!(systems[0].contains("саммари слишком длинное"));
    }

    #[tokio::test]
    async fn empty_critique_treated_as_first_attempt() {
        let (agent, seen) = agent_with_recorder(Stage::Normal);
        agent.attempt("статья", Some("")).await.unwrap();

        let systems = seen.lock().unwrap();
        assert_eq!(systems[0], prompts::instruction_for(Stage::Normal));
    }
}
