//! Turning a literal answer into a sentence.

use askdb_core::AppResult;
use askdb_llm::{LlmClient, LlmRequest};
use askdb_prompt::{build_prompt, builtin, load_prompt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Asks a chat model to restate `(question, answer)` declaratively.
#[derive(Clone)]
pub struct SentenceRephraser {
    llm: Arc<dyn LlmClient>,
    model: String,
    workspace: PathBuf,
}

impl SentenceRephraser {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            workspace: PathBuf::from("."),
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// One completion, returned verbatim. Errors propagate unchanged.
    pub async fn rephrase(&self, question: &str, answer: &str) -> AppResult<String> {
        let definition = load_prompt(&self.workspace, builtin::ANSWER_REPHRASE)?;
        let variables: HashMap<String, String> = [
            ("question".to_string(), question.to_string()),
            ("answer".to_string(), answer.to_string()),
        ]
        .into_iter()
        .collect();
        let built = build_prompt(&definition, variables)?;

        let mut request = LlmRequest::new(&self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        let request = request.with_user(built.user);

        let response = self.llm.complete(&request).await?;
        tracing::debug!(sentence = %response.content, "Rephrased answer");
        Ok(response.content)
    }
}
