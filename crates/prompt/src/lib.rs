//! Prompt system for askdb.
//!
//! - YAML prompt definitions, built in or overridden per workspace
//! - Handlebars rendering into system/user messages

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
