//! SQLite-backed vector index for training records.

use crate::types::{StoreStats, TrainingKind, TrainingRecord};
use askdb_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS training_data (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    question TEXT,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_training_kind ON training_data(kind);

CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
    create_schema(&conn)?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open a throwaway in-memory index.
pub fn init_memory_index() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Knowledge(format!("Failed to open in-memory index: {}", e)))?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))
}

/// Record `fingerprint` as the index's embedder, or check it against the
/// one already recorded.
pub fn ensure_embedder(conn: &Connection, fingerprint: &str) -> AppResult<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'embedder'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to read store metadata: {}", e)))?;

    match stored {
        Some(existing) if existing == fingerprint => Ok(()),
        Some(existing) => Err(AppError::Config(format!(
            "Training store was embedded with {} but the configured embedder is {}",
            existing, fingerprint
        ))),
        None => {
            conn.execute(
                "INSERT INTO store_meta (key, value) VALUES ('embedder', ?1)",
                params![fingerprint],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to write store metadata: {}", e)))?;
            Ok(())
        }
    }
}

/// Insert a record unless its id already exists.
///
/// Returns `true` when a row was written.
pub fn insert_record(
    conn: &Connection,
    record: &TrainingRecord,
    embedding: &[f32],
) -> AppResult<bool> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO training_data (id, kind, question, content, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.kind.as_str(),
                record.question,
                record.content,
                embedding_to_bytes(embedding),
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to insert record: {}", e)))?;

    Ok(changed > 0)
}

/// Whether a record of `kind` with exactly this content exists.
pub fn contains(conn: &Connection, kind: TrainingKind, content: &str) -> AppResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM training_data WHERE kind = ?1 AND content = ?2)",
        params![kind.as_str(), content],
        |row| row.get::<_, bool>(0),
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to look up record: {}", e)))
}

/// Query the index for the top-k records of `kind` most similar to the query.
pub fn query_related(
    conn: &Connection,
    kind: TrainingKind,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(TrainingRecord, f32)>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, question, content, created_at, embedding
             FROM training_data WHERE kind = ?1",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params![kind.as_str()], |row| {
            let record = record_from_row(row)?;
            let embedding_bytes: Vec<u8> = row.get(5)?;
            Ok((record, embedding_bytes))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query records: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (record, bytes) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read record: {}", e)))?;
        let embedding = bytes_to_embedding(&bytes)?;
        let score = cosine_similarity(query_embedding, &embedding);
        results.push((record, score));
    }

    // Ties break on id
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    results.truncate(top_k);

    tracing::debug!(
        kind = %kind,
        "Retrieved {} records (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Every record, oldest first.
pub fn list_records(conn: &Connection) -> AppResult<Vec<TrainingRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, question, content, created_at
             FROM training_data ORDER BY created_at, id",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], record_from_row)
        .map_err(|e| AppError::Knowledge(format!("Failed to list records: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read record: {}", e)))
}

/// Fetch one record by id.
pub fn get_record(conn: &Connection, id: &str) -> AppResult<Option<TrainingRecord>> {
    conn.query_row(
        "SELECT id, kind, question, content, created_at FROM training_data WHERE id = ?1",
        params![id],
        record_from_row,
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to fetch record: {}", e)))
}

/// Delete a record. Returns `true` if it existed.
pub fn delete_record(conn: &Connection, id: &str) -> AppResult<bool> {
    let changed = conn
        .execute("DELETE FROM training_data WHERE id = ?1", params![id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete record: {}", e)))?;
    Ok(changed > 0)
}

/// Get statistics for the index.
pub fn get_stats(conn: &Connection) -> AppResult<StoreStats> {
    let mut stmt = conn
        .prepare("SELECT kind, COUNT(*) FROM training_data GROUP BY kind")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare stats query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u32))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count records: {}", e)))?;

    let mut stats = StoreStats::default();
    for row in rows {
        let (kind, count) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to count records: {}", e)))?;
        match TrainingKind::parse(&kind) {
            Some(TrainingKind::Ddl) => stats.ddl = count,
            Some(TrainingKind::Documentation) => stats.documentation = count,
            Some(TrainingKind::Sql) => stats.sql = count,
            None => tracing::warn!("Ignoring records of unknown kind '{}'", kind),
        }
    }

    Ok(stats)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TrainingRecord> {
    let kind: String = row.get(1)?;
    let kind = TrainingKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown training kind '{}'", kind).into(),
        )
    })?;

    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(TrainingRecord {
        id: row.get(0)?,
        kind,
        question: row.get(2)?,
        content: row.get(3)?,
        created_at,
    })
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(kind: TrainingKind, question: Option<&str>, content: &str) -> TrainingRecord {
        TrainingRecord::new(kind, question.map(str::to_string), content)
    }

    #[test]
    fn test_ensure_embedder() {
        let conn = init_memory_index().unwrap();
        ensure_embedder(&conn, "trigram/trigram-v1/384").unwrap();
        ensure_embedder(&conn, "trigram/trigram-v1/384").unwrap();

        let err = ensure_embedder(&conn, "openai/text-embedding-3-small/1536").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("trigram/trigram-v1/384"));
    }

    #[test]
    fn test_init_index_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("training.sqlite");
        let conn = init_index(&path).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='training_data'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let conn = init_memory_index().unwrap();
        let r = record(TrainingKind::Ddl, None, "CREATE TABLE actor ();");

        assert!(insert_record(&conn, &r, &[1.0, 0.0]).unwrap());
        assert!(!insert_record(&conn, &r, &[1.0, 0.0]).unwrap());
        assert_eq!(get_stats(&conn).unwrap().ddl, 1);
    }

    #[test]
    fn test_contains_matches_kind_and_content() {
        let conn = init_memory_index().unwrap();
        insert_record(&conn, &record(TrainingKind::Documentation, None, "glossary"), &[1.0]).unwrap();

        assert!(contains(&conn, TrainingKind::Documentation, "glossary").unwrap());
        assert!(!contains(&conn, TrainingKind::Ddl, "glossary").unwrap());
        assert!(!contains(&conn, TrainingKind::Documentation, "glossary ").unwrap());
    }

    #[test]
    fn test_query_related_filters_kind_and_ranks() {
        let conn = init_memory_index().unwrap();
        let near = record(TrainingKind::Sql, Some("q1"), "SELECT 1");
        let far = record(TrainingKind::Sql, Some("q2"), "SELECT 2");
        let other = record(TrainingKind::Ddl, None, "CREATE TABLE t ();");

        insert_record(&conn, &near, &[1.0, 0.0, 0.0]).unwrap();
        insert_record(&conn, &far, &[0.0, 1.0, 0.0]).unwrap();
        insert_record(&conn, &other, &[1.0, 0.0, 0.0]).unwrap();

        let results = query_related(&conn, TrainingKind::Sql, &[0.9, 0.1, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, near.id);
        assert_eq!(results[0].0.question.as_deref(), Some("q1"));
        assert!(results[0].1 > results[1].1);

        let top1 = query_related(&conn, TrainingKind::Sql, &[0.9, 0.1, 0.0], 1).unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn test_list_get_delete() {
        let conn = init_memory_index().unwrap();
        let r = record(TrainingKind::Documentation, None, "Rental Rate");
        insert_record(&conn, &r, &[0.5]).unwrap();

        let listed = list_records(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, r.id);
        assert_eq!(listed[0].created_at.timestamp(), r.created_at.timestamp());

        assert!(get_record(&conn, &r.id).unwrap().is_some());
        assert!(delete_record(&conn, &r.id).unwrap());
        assert!(!delete_record(&conn, &r.id).unwrap());
        assert!(get_record(&conn, &r.id).unwrap().is_none());
    }

    #[test]
    fn test_stats_per_kind() {
        let conn = init_memory_index().unwrap();
        insert_record(&conn, &record(TrainingKind::Ddl, None, "a"), &[1.0]).unwrap();
        insert_record(&conn, &record(TrainingKind::Sql, Some("q"), "b"), &[1.0]).unwrap();
        insert_record(&conn, &record(TrainingKind::Sql, Some("q"), "c"), &[1.0]).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.ddl, 1);
        assert_eq!(stats.documentation, 0);
        assert_eq!(stats.sql, 2);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let values = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&values);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), values);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![1.0, 0.0, 0.0];
        let d = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&c, &d) - 0.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
