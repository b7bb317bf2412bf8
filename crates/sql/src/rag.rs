//! Retrieval-augmented SQL generator.

use crate::extract::{extract_sql, is_sql_valid, wants_intermediate_sql};
use crate::generator::{AskResponse, SqlGenerator};
use crate::runner::SqlRunner;
use askdb_core::config::GeneratorSettings;
use askdb_core::{AppError, AppResult};
use askdb_knowledge::{TrainingKind, TrainingRecord, TrainingStore};
use askdb_llm::{LlmClient, LlmRequest};
use askdb_prompt::{build_prompt, builtin, load_prompt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Context retrieved for one question.
struct RetrievedContext {
    ddl: Vec<TrainingRecord>,
    documentation: Vec<String>,
    examples: Vec<TrainingRecord>,
}

/// Text-to-SQL over a [`TrainingStore`], a chat model and an optional runner.
///
/// Without a runner, `ask` only generates SQL and never returns a table.
pub struct RagSqlGenerator {
    store: Arc<TrainingStore>,
    llm: Arc<dyn LlmClient>,
    model: String,
    runner: Option<Arc<dyn SqlRunner>>,
    settings: GeneratorSettings,
    workspace: PathBuf,
}

impl RagSqlGenerator {
    pub fn new(
        store: Arc<TrainingStore>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            store,
            llm,
            model: model.into(),
            runner: None,
            settings,
            workspace: PathBuf::from("."),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn SqlRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Workspace whose `.askdb/prompts/` may override built-in prompts.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn store(&self) -> &Arc<TrainingStore> {
        &self.store
    }

    fn dialect(&self) -> &str {
        self.runner
            .as_deref()
            .map(|r| r.dialect())
            .unwrap_or(&self.settings.dialect)
    }

    /// Request carrying the configured sampling settings.
    fn new_request(&self) -> LlmRequest {
        let request = LlmRequest::new(&self.model).with_temperature(self.settings.temperature);
        match self.settings.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }

    /// Ask the model which business question `sql` answers.
    #[instrument(skip(self, sql))]
    pub async fn generate_question(&self, sql: &str) -> AppResult<String> {
        let definition = load_prompt(&self.workspace, builtin::SQL_QUESTION)?;
        let built = build_prompt(&definition, vars(&[("sql", sql)]))?;

        let mut request = self.new_request();
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        let request = request.with_user(built.user);

        let response = self.llm.complete(&request).await?;
        let question = response.content.trim().to_string();
        if question.is_empty() {
            return Err(AppError::Llm(
                "Model returned an empty question for example SQL".to_string(),
            ));
        }
        debug!(question = %question, "Generated question for example SQL");
        Ok(question)
    }

    /// Produce SQL (or the model's refusal text) for `question`.
    #[instrument(skip(self))]
    pub async fn generate_sql(
        &self,
        question: &str,
        allow_llm_to_see_data: bool,
    ) -> AppResult<String> {
        let mut context = self.retrieve(question).await?;
        let reply = self.submit(question, &context).await?;

        if !wants_intermediate_sql(&reply) {
            return Ok(extract_sql(&reply));
        }

        if !allow_llm_to_see_data {
            return Err(AppError::Sql(
                "The question needs database introspection, but the model is not allowed to see data"
                    .to_string(),
            ));
        }
        let runner = self.runner.as_ref().ok_or_else(|| {
            AppError::Sql("Intermediate SQL requested but no database is connected".to_string())
        })?;

        let intermediate = extract_sql(&reply);
        if !is_sql_valid(&intermediate) {
            return Err(AppError::Sql(format!(
                "Intermediate SQL is not a read-only query: {}",
                intermediate
            )));
        }
        info!(sql = %intermediate, "Running intermediate SQL");
        let table = runner.run_sql(&intermediate).await?;
        context.documentation.push(format!(
            "The following is a table with the results of the intermediate SQL query {}:\n\n{}",
            intermediate,
            table.to_markdown()
        ));

        let reply = self.submit(question, &context).await?;
        Ok(extract_sql(&reply))
    }

    async fn retrieve(&self, question: &str) -> AppResult<RetrievedContext> {
        let n = self.settings.n_results;
        let ddl = self.store.related(TrainingKind::Ddl, question, n).await?;
        let documentation = self
            .store
            .related(TrainingKind::Documentation, question, n)
            .await?
            .into_iter()
            .map(|r| r.content)
            .collect();
        let examples = self.store.related(TrainingKind::Sql, question, n).await?;

        debug!(
            ddl = ddl.len(),
            examples = examples.len(),
            "Retrieved training context"
        );
        Ok(RetrievedContext {
            ddl,
            documentation,
            examples,
        })
    }

    async fn submit(&self, question: &str, context: &RetrievedContext) -> AppResult<String> {
        let request = self.build_request(question, context)?;
        let response = self.llm.complete(&request).await?;
        debug!(reply = %response.content, "Model reply");
        Ok(response.content)
    }

    fn build_request(&self, question: &str, context: &RetrievedContext) -> AppResult<LlmRequest> {
        let mut budget = self.settings.max_context_chars.saturating_sub(question.len());
        let tables = take_within_budget(context.ddl.iter().map(|r| r.content.as_str()), &mut budget);
        let documentation =
            take_within_budget(context.documentation.iter().map(String::as_str), &mut budget);
        let tables = tables.join("\n\n");
        let documentation = documentation.join("\n\n");

        let definition = load_prompt(&self.workspace, builtin::SQL_GENERATE)?;
        let built = build_prompt(
            &definition,
            vars(&[
                ("dialect", self.dialect()),
                ("tables", tables.as_str()),
                ("documentation", documentation.as_str()),
                ("question", question),
            ]),
        )?;

        let mut request = self.new_request();
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        for example in &context.examples {
            if let Some(example_question) = &example.question {
                request = request
                    .with_user(example_question.as_str())
                    .with_assistant(example.content.as_str());
            }
        }
        Ok(request.with_user(built.user))
    }
}

#[async_trait::async_trait]
impl SqlGenerator for RagSqlGenerator {
    async fn has_training_data(&self, kind: TrainingKind, content: &str) -> AppResult<bool> {
        self.store.has_training_data(kind, content)
    }

    async fn ingest(&self, kind: TrainingKind, content: &str) -> AppResult<()> {
        let id = match kind {
            TrainingKind::Ddl => self.store.add_ddl(content).await?,
            TrainingKind::Documentation => self.store.add_documentation(content).await?,
            TrainingKind::Sql => {
                let question = self.generate_question(content).await?;
                self.store.add_question_sql(&question, content).await?
            }
        };
        info!(id = %id, kind = %kind, "Ingested training item");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ask(&self, question: &str, allow_llm_to_see_data: bool) -> AppResult<AskResponse> {
        let sql = self.generate_sql(question, allow_llm_to_see_data).await?;

        if !is_sql_valid(&sql) {
            warn!(reply = %sql, "Model did not produce runnable SQL");
            return Ok(AskResponse {
                sql: Some(sql),
                table: None,
            });
        }

        let Some(runner) = &self.runner else {
            return Ok(AskResponse {
                sql: Some(sql),
                table: None,
            });
        };

        match runner.run_sql(&sql).await {
            Ok(table) => {
                if self.settings.auto_train && !table.is_empty() {
                    if let Err(e) = self.store.add_question_sql(question, &sql).await {
                        warn!(error = %e, "Failed to store question/SQL pair");
                    }
                }
                Ok(AskResponse {
                    sql: Some(sql),
                    table: Some(table),
                })
            }
            Err(e) => {
                error!(error = %e, sql = %sql, "SQL execution failed");
                Ok(AskResponse {
                    sql: Some(sql),
                    table: None,
                })
            }
        }
    }
}

/// Keep items, in order, that still fit the remaining character budget.
fn take_within_budget<'a>(items: impl Iterator<Item = &'a str>, budget: &mut usize) -> Vec<&'a str> {
    let mut kept = Vec::new();
    for item in items {
        if item.len() < *budget {
            *budget -= item.len();
            kept.push(item);
        } else {
            debug!(chars = item.len(), "Dropping context item over budget");
        }
    }
    kept
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TabularResult;
    use crate::testing::{ScriptedLlm, StaticRunner};
    use askdb_knowledge::embeddings::providers::TrigramProvider;
    use askdb_llm::Role;
    use serde_json::json;

    fn store() -> Arc<TrainingStore> {
        Arc::new(TrainingStore::in_memory(Arc::new(TrigramProvider::new(128))).unwrap())
    }

    fn generator(store: Arc<TrainingStore>, llm: Arc<ScriptedLlm>) -> RagSqlGenerator {
        RagSqlGenerator::new(store, llm, "test-model", GeneratorSettings::default())
    }

    fn count_table(n: i64) -> TabularResult {
        TabularResult::new(vec!["count".to_string()], vec![vec![json!(n)]])
    }

    #[test]
    fn test_take_within_budget() {
        let mut budget = 10;
        let kept = take_within_budget(["12345", "1234567", "123"].into_iter(), &mut budget);
        assert_eq!(kept, vec!["12345", "123"]);
        assert_eq!(budget, 2);
    }

    #[tokio::test]
    async fn test_ingest_sql_generates_question() {
        let store = store();
        let llm = Arc::new(ScriptedLlm::new(vec!["  How many films are there?\n"]));
        let generator = generator(store.clone(), llm.clone());

        generator
            .ingest(TrainingKind::Sql, "SELECT COUNT(*) FROM film")
            .await
            .unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question.as_deref(), Some("How many films are there?"));

        let request = llm.request(0);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.last_user_content(), Some("SELECT COUNT(*) FROM film"));
    }

    #[tokio::test]
    async fn test_ingest_ddl_skips_model() {
        let store = store();
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let generator = generator(store.clone(), llm.clone());

        generator
            .ingest(TrainingKind::Ddl, "CREATE TABLE film (film_id SERIAL);")
            .await
            .unwrap();

        assert!(generator
            .has_training_data(TrainingKind::Ddl, "CREATE TABLE film (film_id SERIAL);")
            .await
            .unwrap());
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_includes_context_and_few_shot() {
        let store = store();
        store.add_ddl("CREATE TABLE customer (customer_id SERIAL);").await.unwrap();
        store.add_documentation("Active Customer: activebool = TRUE").await.unwrap();
        store
            .add_question_sql("List active customers", "SELECT * FROM customer WHERE activebool")
            .await
            .unwrap();

        let llm = Arc::new(ScriptedLlm::new(vec!["```sql\nSELECT COUNT(*) FROM customer\n```"]));
        let generator = generator(store, llm.clone());

        let sql = generator
            .generate_sql("How many active customers are there?", true)
            .await
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM customer");

        let request = llm.request(0);
        let system = &request.messages[0].content;
        assert!(system.contains("CREATE TABLE customer"));
        assert!(system.contains("Active Customer: activebool = TRUE"));

        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(request.messages[1].content, "List active customers");
        assert_eq!(
            request.last_user_content(),
            Some("How many active customers are there?")
        );
    }

    #[tokio::test]
    async fn test_ask_runs_sql_and_auto_trains() {
        let store = store();
        let llm = Arc::new(ScriptedLlm::new(vec![
            "SELECT COUNT(*) FROM customer WHERE activebool = TRUE;",
        ]));
        let runner = Arc::new(StaticRunner::new().on("FROM customer", count_table(584)));
        let generator = generator(store.clone(), llm).with_runner(runner.clone());

        let response = generator
            .ask("How many active customers are there?", true)
            .await
            .unwrap();

        assert_eq!(response.table, Some(count_table(584)));
        assert_eq!(runner.executed().len(), 1);
        assert!(store
            .has_training_data(
                TrainingKind::Sql,
                "SELECT COUNT(*) FROM customer WHERE activebool = TRUE;"
            )
            .unwrap());
    }

    #[tokio::test]
    async fn test_ask_empty_result_not_trained() {
        let store = store();
        let llm = Arc::new(ScriptedLlm::new(vec!["SELECT title FROM film WHERE false"]));
        let runner = Arc::new(
            StaticRunner::new().on("FROM film", TabularResult::new(vec!["title".into()], vec![])),
        );
        let generator = generator(store.clone(), llm).with_runner(runner);

        let response = generator.ask("Any films?", true).await.unwrap();
        assert!(response.table.unwrap().is_empty());
        assert_eq!(store.stats().unwrap().sql, 0);
    }

    #[tokio::test]
    async fn test_ask_execution_error_leaves_no_table() {
        let llm = Arc::new(ScriptedLlm::new(vec!["SELECT * FROM loyalty"]));
        let runner = Arc::new(StaticRunner::new().failing_on("loyalty", "relation does not exist"));
        let generator = generator(store(), llm).with_runner(runner);

        let response = generator.ask("Who is loyal?", true).await.unwrap();
        assert_eq!(response.sql.as_deref(), Some("SELECT * FROM loyalty"));
        assert!(response.table.is_none());
    }

    #[tokio::test]
    async fn test_ask_explanation_is_not_executed() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "The provided context does not describe employee salaries.",
        ]));
        let runner = Arc::new(StaticRunner::new());
        let generator = generator(store(), llm).with_runner(runner.clone());

        let response = generator.ask("What do staff earn?", true).await.unwrap();
        assert!(response.table.is_none());
        assert!(runner.executed().is_empty());
    }

    #[tokio::test]
    async fn test_ask_without_runner_returns_sql_only() {
        let llm = Arc::new(ScriptedLlm::new(vec!["SELECT 1"]));
        let generator = generator(store(), llm);

        let response = generator.ask("One?", true).await.unwrap();
        assert_eq!(response.sql.as_deref(), Some("SELECT 1"));
        assert!(response.table.is_none());
    }

    #[tokio::test]
    async fn test_intermediate_sql_feeds_back_results() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "-- intermediate_sql\nSELECT DISTINCT name FROM category;",
            "SELECT COUNT(*) FROM film_category fc JOIN category c USING (category_id) WHERE c.name = 'Horror';",
        ]));
        let categories = TabularResult::new(
            vec!["name".to_string()],
            vec![vec![json!("Horror")], vec![json!("Comedy")]],
        );
        let runner = Arc::new(
            StaticRunner::new()
                .on("DISTINCT name FROM category", categories)
                .on("film_category", count_table(56)),
        );
        let generator = generator(store(), llm.clone()).with_runner(runner.clone());

        let response = generator.ask("How many horror films?", true).await.unwrap();
        assert_eq!(response.table, Some(count_table(56)));
        assert_eq!(runner.executed().len(), 2);

        let second = llm.request(1);
        assert!(second.messages[0]
            .content
            .contains("results of the intermediate SQL query"));
        assert!(second.messages[0].content.contains("| Horror |"));
    }

    #[tokio::test]
    async fn test_intermediate_sql_refused_without_permission() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "-- intermediate_sql\nSELECT DISTINCT name FROM category;",
        ]));
        let runner = Arc::new(StaticRunner::new());
        let generator = generator(store(), llm).with_runner(runner.clone());

        let result = generator.ask("How many horror films?", false).await;
        assert!(matches!(result, Err(AppError::Sql(_))));
        assert!(runner.executed().is_empty());
    }

    #[tokio::test]
    async fn test_intermediate_write_is_never_executed() {
        let llm = Arc::new(ScriptedLlm::new(vec!["-- intermediate_sql\nDELETE FROM rental;"]));
        let runner = Arc::new(StaticRunner::new());
        let generator = generator(store(), llm.clone()).with_runner(runner.clone());

        let result = generator.ask("Which rentals are overdue?", true).await;
        assert!(matches!(result, Err(AppError::Sql(_))));
        assert!(runner.executed().is_empty());
        assert_eq!(llm.request_count(), 1);
    }

    #[tokio::test]
    async fn test_requests_carry_sampling_settings() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "Which films exist?",
            "SELECT title FROM film",
        ]));
        let settings = GeneratorSettings {
            max_tokens: Some(300),
            ..GeneratorSettings::default()
        };
        let generator = RagSqlGenerator::new(store(), llm.clone(), "test-model", settings);

        generator
            .ingest(TrainingKind::Sql, "SELECT title FROM film")
            .await
            .unwrap();
        generator.generate_sql("List films", true).await.unwrap();

        for index in 0..2 {
            let request = llm.request(index);
            assert_eq!(request.temperature, Some(0.0));
            assert_eq!(request.max_tokens, Some(300));
        }
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let llm = Arc::new(ScriptedLlm::failing("rate limited"));
        let generator = generator(store(), llm);

        let result = generator.ask("How many films?", true).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
