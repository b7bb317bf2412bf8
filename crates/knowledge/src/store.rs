//! Persistent training store: records plus their embeddings.

use crate::embeddings::EmbeddingProvider;
use crate::index;
use crate::types::{StoreStats, TrainingKind, TrainingRecord};
use askdb_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Vector store of DDL, documentation and question/SQL pairs.
///
/// The SQLite connection sits behind a mutex; embedding happens before the
/// lock is taken so no await point holds it.
#[derive(Debug)]
pub struct TrainingStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl TrainingStore {
    /// Open (or create) the store at `path`.
    ///
    /// Fails with `AppError::Config` if the file was built with a different
    /// embedder, since its vectors would not be comparable.
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = index::init_index(path)?;
        index::ensure_embedder(&conn, &embedder_fingerprint(embedder.as_ref()))
            .map_err(|e| match e {
                AppError::Config(msg) => AppError::Config(format!(
                    "{}; delete {} and run `askdb train` again",
                    msg,
                    path.display()
                )),
                other => other,
            })?;
        tracing::info!(
            path = %path.display(),
            embedder = embedder.provider_name(),
            "Opened training store"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// A store that lives only as long as the process.
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = index::init_memory_index()?;
        index::ensure_embedder(&conn, &embedder_fingerprint(embedder.as_ref()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Training store lock poisoned".to_string()))
    }

    /// Whether a record of `kind` with exactly `content` was already ingested.
    ///
    /// For `Sql` records `content` is the query text, regardless of question.
    pub fn has_training_data(&self, kind: TrainingKind, content: &str) -> AppResult<bool> {
        let conn = self.conn()?;
        index::contains(&conn, kind, content)
    }

    pub async fn add_ddl(&self, ddl: &str) -> AppResult<String> {
        self.add(TrainingRecord::new(TrainingKind::Ddl, None, ddl)).await
    }

    pub async fn add_documentation(&self, documentation: &str) -> AppResult<String> {
        self.add(TrainingRecord::new(TrainingKind::Documentation, None, documentation))
            .await
    }

    pub async fn add_question_sql(&self, question: &str, sql: &str) -> AppResult<String> {
        self.add(TrainingRecord::new(
            TrainingKind::Sql,
            Some(question.to_string()),
            sql,
        ))
        .await
    }

    async fn add(&self, record: TrainingRecord) -> AppResult<String> {
        if record.content.trim().is_empty() {
            return Err(AppError::Knowledge(format!(
                "Refusing to store empty {} record",
                record.kind
            )));
        }

        let embedding = self.embedder.embed(&embedding_text(&record)).await?;
        let conn = self.conn()?;
        let inserted = index::insert_record(&conn, &record, &embedding)?;

        if inserted {
            tracing::debug!(id = %record.id, kind = %record.kind, "Stored training record");
        } else {
            tracing::debug!(id = %record.id, "Training record already present");
        }
        Ok(record.id)
    }

    /// Up to `n` records of `kind` ranked by similarity to `query`.
    pub async fn related(
        &self,
        kind: TrainingKind,
        query: &str,
        n: usize,
    ) -> AppResult<Vec<TrainingRecord>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        let conn = self.conn()?;
        let results = index::query_related(&conn, kind, &embedding, n)?;
        Ok(results.into_iter().map(|(record, _)| record).collect())
    }

    pub fn list(&self) -> AppResult<Vec<TrainingRecord>> {
        let conn = self.conn()?;
        index::list_records(&conn)
    }

    pub fn get(&self, id: &str) -> AppResult<Option<TrainingRecord>> {
        let conn = self.conn()?;
        index::get_record(&conn, id)
    }

    /// Delete a record by id. Returns `false` if no such record existed.
    pub fn remove(&self, id: &str) -> AppResult<bool> {
        let conn = self.conn()?;
        let removed = index::delete_record(&conn, id)?;
        if removed {
            tracing::info!(id, "Removed training record");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> AppResult<StoreStats> {
        let conn = self.conn()?;
        index::get_stats(&conn)
    }
}

/// Identifies the vector space an embedder writes into.
fn embedder_fingerprint(embedder: &dyn EmbeddingProvider) -> String {
    format!(
        "{}/{}/{}",
        embedder.provider_name(),
        embedder.model_name(),
        embedder.dimensions()
    )
}

/// Question/SQL pairs are embedded as both so either side can match.
fn embedding_text(record: &TrainingRecord) -> String {
    match &record.question {
        Some(question) => format!("{}\n{}", question, record.content),
        None => record.content.clone(),
    }
}
