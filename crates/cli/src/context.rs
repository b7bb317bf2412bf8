//! Long-lived resources shared by the commands.

use askdb_core::{config::AppConfig, AppError, AppResult};
use askdb_knowledge::{create_provider, TrainingStore};
use askdb_llm::create_client;
use askdb_pipeline::{QuestionAnswerer, SentenceRephraser};
use askdb_sql::{PostgresRunner, RagSqlGenerator, SqlRunner};
use std::sync::Arc;

/// Open the on-disk training store under `.askdb/`.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<TrainingStore>> {
    config.ensure_state_dir()?;
    let embedder = create_provider(&config.embedding, config.api_key.as_deref())?;
    let store = TrainingStore::open(&config.store_path(), embedder)?;
    Ok(Arc::new(store))
}

/// Everything a request needs, built once at startup.
pub struct AppContext {
    pub generator: Arc<RagSqlGenerator>,
    pub answerer: Arc<QuestionAnswerer>,
    runner: Option<Arc<PostgresRunner>>,
}

impl AppContext {
    /// Build the store, the chat client and, when `with_database`, the
    /// PostgreSQL pool. Missing settings fail here with `AppError::Config`.
    pub async fn connect(config: &AppConfig, with_database: bool) -> AppResult<Self> {
        config.validate()?;

        let store = open_store(config)?;
        let llm = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            config.api_key.as_deref(),
        )
        .map_err(AppError::Config)?;

        let runner = if with_database {
            let target = config.database.target()?;
            Some(Arc::new(
                PostgresRunner::connect(&target, config.database.max_connections).await?,
            ))
        } else {
            None
        };

        let mut generator = RagSqlGenerator::new(
            store,
            Arc::clone(&llm),
            &config.model,
            config.generator.clone(),
        )
        .with_workspace(&config.workspace);
        if let Some(runner) = &runner {
            generator = generator.with_runner(Arc::clone(runner) as Arc<dyn SqlRunner>);
        }
        let generator = Arc::new(generator);

        let rephraser =
            SentenceRephraser::new(llm, &config.model).with_workspace(&config.workspace);
        let answerer = Arc::new(QuestionAnswerer::new(generator.clone(), rephraser));

        tracing::debug!(
            provider = %config.provider,
            model = %config.model,
            database = with_database,
            "Context ready"
        );

        Ok(Self {
            generator,
            answerer,
            runner,
        })
    }

    /// Release pooled database connections.
    pub async fn shutdown(&self) {
        if let Some(runner) = &self.runner {
            runner.close().await;
            tracing::debug!("Database pool closed");
        }
    }
}
