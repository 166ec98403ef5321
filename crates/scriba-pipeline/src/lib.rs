//! Multi-agent processing pipeline for scientific articles.
//!
//! One run fans the article text out across four independent stage branches
//! (rubric classification, keyword extraction, text normalization,
//! summarization). Each branch pairs a producing agent with a critic; a
//! revision controller loops the pair until the artifact is approved or the
//! revision ceiling is reached. The indexer then folds the four artifacts
//! into a single [`scriba_types::IndexedRecord`].

pub mod config;
pub mod controller;
pub mod critic;
pub mod indexer;
pub mod orchestrator;
pub mod prompts;
pub mod runner;
pub mod stage;

pub use config::PipelineConfig;
pub use controller::{decide, Decision};
pub use critic::{parse_review, CriticAgent, CriticReview};
pub use indexer::Indexer;
pub use orchestrator::{Orchestrator, PipelineRun};
pub use runner::{BackoffPolicy, RetryPolicy, StageRunner};
pub use stage::StageAgent;
