//! Retrieval-augmented text-to-SQL for askdb.
//!
//! [`RagSqlGenerator`] retrieves related training items, asks the language
//! model for a query, and runs it through a [`SqlRunner`].

pub mod extract;
pub mod generator;
pub mod rag;
pub mod runner;
pub mod table;

#[cfg(test)]
mod testing;

// Re-export main types
pub use extract::{extract_sql, is_sql_valid};
pub use generator::{AskResponse, SqlGenerator};
pub use rag::RagSqlGenerator;
pub use runner::{PostgresRunner, SqlRunner};
pub use table::TabularResult;
