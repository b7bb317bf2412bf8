//! Question answering orchestrator.

use crate::extractor::extract_answer;
use crate::rephraser::SentenceRephraser;
use askdb_core::{AppError, AppResult};
use askdb_sql::SqlGenerator;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Reply sent whenever a question cannot be answered.
pub const FALLBACK_MESSAGE: &str = "Unable to find related answer. Please try again later.";

/// Anything that turns a question into a reply without failing.
#[async_trait::async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> String;
}

/// Generator → extractor → rephraser.
pub struct QuestionAnswerer {
    generator: Arc<dyn SqlGenerator>,
    rephraser: SentenceRephraser,
}

impl QuestionAnswerer {
    pub fn new(generator: Arc<dyn SqlGenerator>, rephraser: SentenceRephraser) -> Self {
        Self {
            generator,
            rephraser,
        }
    }

    /// Answer `question`, surfacing the first error.
    ///
    /// The question reaches the generator and the rephraser exactly as
    /// received; whitespace only matters for the emptiness check.
    #[instrument(skip(self))]
    pub async fn try_answer(&self, question: &str) -> AppResult<String> {
        if question.trim().is_empty() {
            return Err(AppError::EmptyQuestion);
        }

        let response = self.generator.ask(question, true).await?;
        let literal = extract_answer(&response)?;
        info!(answer = %literal, "Answer");

        let sentence = self.rephraser.rephrase(question, &literal).await?;
        info!(sentence = %sentence, "Full answer");
        Ok(sentence)
    }
}

#[async_trait::async_trait]
impl Answerer for QuestionAnswerer {
    /// Like [`QuestionAnswerer::try_answer`], but any error becomes
    /// [`FALLBACK_MESSAGE`].
    async fn answer(&self, question: &str) -> String {
        match self.try_answer(question).await {
            Ok(sentence) => sentence,
            Err(e) => {
                error!(error = %e, "Failed to answer question");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}
