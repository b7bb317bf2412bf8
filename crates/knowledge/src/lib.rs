//! Training knowledge for askdb.
//!
//! Stores DDL, documentation and question/SQL examples in a local SQLite
//! vector index and retrieves the ones most related to a question.

pub mod dvdrental;
pub mod embeddings;
pub mod index;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use store::TrainingStore;
pub use types::{record_id, StoreStats, TrainingKind, TrainingRecord};
