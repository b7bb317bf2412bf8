//! Embedding providers for the training store.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
