pub mod openai;
pub mod trigram;

pub use openai::OpenAiEmbeddingProvider;
pub use trigram::TrigramProvider;
