//! Indexer: folds the four stage artifacts into one immutable record.

use chrono::Utc;
use scriba_types::{IndexedRecord, PipelineState, Stage, StatusTag};

/// Assembles the final [`IndexedRecord`] after every branch has settled.
pub struct Indexer;

impl Indexer {
    /// Collect the stage artifacts and stamp the record. Also appends the
    /// `indexed` event to the run trace.
    pub fn collect(state: &mut PipelineState) -> IndexedRecord {
        let record = IndexedRecord {
            article_text: state.article_text.clone(),
            rubric: state.slot(Stage::Rubric).artifact.clone(),
            keywords: state.slot(Stage::Keyword).artifact.clone(),
            normalized: state.slot(Stage::Normal).artifact.clone(),
            summary: state.slot(Stage::Summary).artifact.clone(),
            timestamp: Utc::now(),
        };
        state.push_status(StatusTag::Indexed);
        record
    }
}
