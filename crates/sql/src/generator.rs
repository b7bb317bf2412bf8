//! SQL generator trait.

use crate::table::TabularResult;
use askdb_core::AppResult;
use askdb_knowledge::TrainingKind;
use serde::{Deserialize, Serialize};

/// Outcome of asking a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated SQL, or the model's explanation when it produced none
    pub sql: Option<String>,

    /// Result rows; `None` when nothing was executed or execution failed
    pub table: Option<TabularResult>,
}

/// Natural-language to SQL engine backed by ingested training items.
#[async_trait::async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Whether an item of `kind` with exactly `content` is already ingested.
    async fn has_training_data(&self, kind: TrainingKind, content: &str) -> AppResult<bool>;

    /// Ingest one training item.
    async fn ingest(&self, kind: TrainingKind, content: &str) -> AppResult<()>;

    /// Generate SQL for `question`, run it and return the result.
    ///
    /// `allow_llm_to_see_data` permits running intermediate queries whose
    /// rows are shown to the model.
    async fn ask(&self, question: &str, allow_llm_to_see_data: bool) -> AppResult<AskResponse>;
}
