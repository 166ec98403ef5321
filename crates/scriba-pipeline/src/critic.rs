//! Critic agents: one per stage, reviewing the paired agent's artifact.

use std::sync::Arc;

use scriba_llm::{CompletionClient, CompletionRequest};
use scriba_types::{Result, Stage, Verdict};

use crate::prompts;

/// A critic's parsed reply: the verdict plus any critique text.
#[derive(Debug, Clone)]
pub struct CriticReview {
    pub verdict: Verdict,
    /// Empty on approval; the critic's remarks on rejection.
    pub critique: String,
}

pub struct CriticAgent {
    stage: Stage,
    model: String,
    client: Arc<CompletionClient>,
}

impl CriticAgent {
    pub fn new(stage: Stage, model: impl Into<String>, client: Arc<CompletionClient>) -> Self {
        Self {
            stage,
            model: model.into(),
            client,
        }
    }

    /// Review one candidate artifact against the source article.
    pub async fn review(&self, article_text: &str, artifact: &str) -> Result<CriticReview> {
        let request = CompletionRequest::new(
            &self.model,
            prompts::critic_instruction_for(self.stage),
            prompts::critic_user_message(article_text, artifact),
        );
        let response = self.client.complete(&request).await?;

        let review = parse_review(&response.text);
        tracing::debug!(
            stage = %self.stage,
            verdict = ?review.verdict,
            "Critic verdict"
        );
        Ok(review)
    }
}

/// Parse a critic's free-text reply into a verdict.
///
/// Anything containing REJECTED counts as a rejection; everything else,
/// including replies with no recognizable marker at all, is treated as
/// approval. An unparseable critic must not be able to stall the pipeline,
/// so the ambiguous case deliberately falls through to approve.
pub fn parse_review(text: &str) -> CriticReview {
    let trimmed = text.trim_start();
    let upper = trimmed.to_uppercase();
    if upper.contains("REJECTED") {
        // Strip the leading marker when present so only the remarks survive.
        let critique = if upper.starts_with("REJECTED") {
            trimmed["REJECTED".len()..]
                .trim_start_matches([':', '.', ',', '!'])
                .trim()
                .to_string()
        } else {
            trimmed.trim_end().to_string()
        };
        CriticReview {
            verdict: Verdict::Rejected,
            critique,
        }
    } else {
        CriticReview {
            verdict: Verdict::Approved,
            critique: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriba_llm::{CompletionProvider, CompletionResponse, Usage};
    use scriba_types::ScribaError;

    struct FixedReplyProvider {
        reply: String,
    }

    #[async_trait]
    impl CompletionProvider for FixedReplyProvider {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ScribaError> {
            Ok(CompletionResponse {
                text: self.reply.clone(),
                model: request.model.clone(),
                usage: Usage::default(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }
    }

    fn critic_with_reply(reply: &str) -> CriticAgent {
        let mut client = CompletionClient::new();
        client.register_provider(FixedReplyProvider {
            reply: reply.to_string(),
        });
        CriticAgent::new(Stage::Rubric, "mock-model", Arc::new(client))
    }

    #[test]
    fn parse_approved() {
        let review = parse_review("APPROVED");
        assert_eq!(review.verdict, Verdict::Approved);
        assert!(review.critique.is_empty());
    }

    #[test]
    fn parse_rejected_with_critique() {
        let review = parse_review("REJECTED: рубрика указана неверно");
        assert_eq!(review.verdict, Verdict::Rejected);
        assert_eq!(review.critique, "рубрика указана неверно");
    }

    #[test]
    fn parse_rejected_multiline() {
        let review = parse_review("REJECTED\nслишком мало ключевых слов\nнет терминов");
        assert_eq!(review.verdict, Verdict::Rejected);
        assert!(review.critique.starts_with("слишком мало"));
    }

    #[test]
    fn parse_rejected_case_insensitive() {
        let review = parse_review("rejected: плохо");
        assert_eq!(review.verdict, Verdict::Rejected);
        assert_eq!(review.critique, "плохо");
    }

    #[test]
    fn unrecognizable_reply_defaults_to_approved() {
        let review = parse_review("Хорошая работа, замечаний нет.");
        assert_eq!(review.verdict, Verdict::Approved);
    }

    #[tokio::test]
    async fn review_round_trip() {
        let critic = critic_with_reply("REJECTED: неполное саммари");
        let review = critic.review("статья", "саммари").await.unwrap();
        assert_eq!(review.verdict, Verdict::Rejected);
        assert_eq!(review.critique, "неполное саммари");
    }
}
