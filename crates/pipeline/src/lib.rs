//! Question answering pipeline for askdb.
//!
//! Training ingests the DVD rental material once; answering runs
//! generator → extractor → rephraser and always yields a sentence.

pub mod extractor;
pub mod orchestrator;
pub mod rephraser;
pub mod training;

#[cfg(test)]
mod tests;

// Re-export main types
pub use extractor::{extract_answer, NO_ANSWER_SENTINEL};
pub use orchestrator::{Answerer, QuestionAnswerer, FALLBACK_MESSAGE};
pub use rephraser::SentenceRephraser;
pub use training::{dvdrental_items, train, TrainingItem, TrainingReport};
