//! End-to-end scenarios over hand-written fakes.


use askdb_core::{AppError, AppResult};
use askdb_knowledge::TrainingKind;
use askdb_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use askdb_sql::{AskResponse, SqlGenerator, SqlRunner, TabularResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Generator with a fixed `ask` outcome and an in-memory training set.
pub struct FakeGenerator {
    outcome: Mutex<Option<AppResult<AskResponse>>>,
    pub trained: Mutex<HashSet<(TrainingKind, String)>>,
    pub ask_calls: AtomicUsize,
    pub ingest_calls: AtomicUsize,
    fail_ingest_of: Option<TrainingKind>,
}

impl FakeGenerator {
    pub fn answering(outcome: AppResult<AskResponse>) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            trained: Mutex::new(HashSet::new()),
            ask_calls: AtomicUsize::new(0),
            ingest_calls: AtomicUsize::new(0),
            fail_ingest_of: None,
        }
    }

    pub fn empty() -> Self {
        Self::answering(Ok(AskResponse::default()))
    }

    pub fn failing_ingest_of(mut self, kind: TrainingKind) -> Self {
        self.fail_ingest_of = Some(kind);
        self
    }

    pub fn asks(&self) -> usize {
        self.ask_calls.load(Ordering::SeqCst)
    }

    pub fn ingests(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }

    pub fn holds(&self, kind: TrainingKind, content: &str) -> bool {
        self.trained
            .lock()
            .unwrap()
            .contains(&(kind, content.to_string()))
    }
}

#[async_trait::async_trait]
impl SqlGenerator for FakeGenerator {
    async fn has_training_data(&self, kind: TrainingKind, content: &str) -> AppResult<bool> {
        Ok(self.holds(kind, content))
    }

    async fn ingest(&self, kind: TrainingKind, content: &str) -> AppResult<()> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ingest_of == Some(kind) {
            return Err(AppError::Knowledge("embedding service down".to_string()));
        }
        self.trained
            .lock()
            .unwrap()
            .insert((kind, content.to_string()));
        Ok(())
    }

    async fn ask(&self, _question: &str, _allow_llm_to_see_data: bool) -> AppResult<AskResponse> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AppError::Other("asked twice".to_string())))
    }
}

/// Chat model that echoes a canned reply, or fails, and records prompts.
pub struct RecordingLlm {
    reply: Option<String>,
    pub prompts: Mutex<Vec<LlmRequest>>,
}

impl RecordingLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.last_user_content().map(str::to_string))
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.clone());
        match &self.reply {
            Some(reply) => Ok(LlmResponse {
                content: reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            None => Err(AppError::Llm("service unavailable".to_string())),
        }
    }
}

/// Runner that returns the same table for every query.
pub struct FixedRunner(pub TabularResult);

#[async_trait::async_trait]
impl SqlRunner for FixedRunner {
    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, _sql: &str) -> AppResult<TabularResult> {
        Ok(self.0.clone())
    }
}
