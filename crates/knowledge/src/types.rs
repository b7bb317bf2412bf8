//! Training store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of a training item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingKind {
    /// Schema DDL
    Ddl,
    /// Free-form business documentation
    Documentation,
    /// Question/SQL example pair
    Sql,
}

impl TrainingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddl => "ddl",
            Self::Documentation => "documentation",
            Self::Sql => "sql",
        }
    }

    /// Suffix appended to record ids of this kind.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            Self::Ddl => "ddl",
            Self::Documentation => "doc",
            Self::Sql => "sql",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ddl" => Some(Self::Ddl),
            "documentation" | "doc" => Some(Self::Documentation),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Ddl, Self::Documentation, Self::Sql]
    }
}

impl fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic record id: 32 hex chars of SHA-256 plus a kind suffix.
///
/// Question/SQL pairs hash `question + "\n" + sql`, so the same query stored
/// under two different questions yields two records.
pub fn record_id(kind: TrainingKind, question: Option<&str>, content: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(question) = question {
        hasher.update(question.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}-{}", &digest[..32], kind.id_suffix())
}

/// One ingested training item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub id: String,
    pub kind: TrainingKind,

    /// Natural-language question, only for `Sql` records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TrainingRecord {
    pub fn new(kind: TrainingKind, question: Option<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: record_id(kind, question.as_deref(), &content),
            kind,
            question,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Record counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub ddl: u32,
    pub documentation: u32,
    pub sql: u32,
}

impl StoreStats {
    pub fn total(&self) -> u32 {
        self.ddl + self.documentation + self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(TrainingKind::parse("DDL"), Some(TrainingKind::Ddl));
        assert_eq!(TrainingKind::parse("doc"), Some(TrainingKind::Documentation));
        assert_eq!(TrainingKind::parse("sql"), Some(TrainingKind::Sql));
        assert_eq!(TrainingKind::parse("table"), None);
    }

    #[test]
    fn test_record_id_shape() {
        let id = record_id(TrainingKind::Documentation, None, "Rental Rate");
        assert_eq!(id.len(), 32 + "-doc".len());
        assert!(id.ends_with("-doc"));
        assert!(id[..32].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_record_id_deterministic() {
        let a = record_id(TrainingKind::Ddl, None, "CREATE TABLE actor ();");
        let b = record_id(TrainingKind::Ddl, None, "CREATE TABLE actor ();");
        assert_eq!(a, b);
    }

    #[test]
    fn test_record_id_includes_question() {
        let sql = "SELECT COUNT(*) FROM film";
        let a = record_id(TrainingKind::Sql, Some("How many films?"), sql);
        let b = record_id(TrainingKind::Sql, Some("Number of movies?"), sql);
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_serializes_lowercase_kind() {
        let record = TrainingRecord::new(TrainingKind::Ddl, None, "CREATE TABLE x ();");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "ddl");
        assert!(json.get("question").is_none());
    }
}
