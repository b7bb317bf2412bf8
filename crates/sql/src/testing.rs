//! Fakes shared by this crate's tests.

use crate::runner::SqlRunner;
use crate::table::TabularResult;
use askdb_core::{AppError, AppResult};
use askdb_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies with queued answers in order and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let llm = Self::default();
        llm.replies
            .lock()
            .unwrap()
            .push_back(Err(AppError::Llm(message.to_string())));
        llm
    }

    pub fn request(&self, index: usize) -> LlmRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Llm("no scripted reply left".to_string())))?;
        Ok(LlmResponse {
            content: reply,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// Returns canned tables keyed by a substring of the SQL.
#[derive(Default)]
pub struct StaticRunner {
    tables: Vec<(String, AppResult<TabularResult>)>,
    pub executed: Mutex<Vec<String>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, sql_fragment: &str, table: TabularResult) -> Self {
        self.tables.push((sql_fragment.to_string(), Ok(table)));
        self
    }

    pub fn failing_on(mut self, sql_fragment: &str, message: &str) -> Self {
        self.tables.push((
            sql_fragment.to_string(),
            Err(AppError::Database(message.to_string())),
        ));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SqlRunner for StaticRunner {
    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, sql: &str) -> AppResult<TabularResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        for (fragment, result) in &self.tables {
            if sql.contains(fragment.as_str()) {
                return match result {
                    Ok(table) => Ok(table.clone()),
                    Err(e) => Err(AppError::Database(e.to_string())),
                };
            }
        }
        Err(AppError::Database(format!("relation does not exist: {}", sql)))
    }
}
