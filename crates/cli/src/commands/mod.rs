//! Command handlers for the askdb CLI.

pub mod ask;
pub mod bot;
pub mod train;
pub mod training;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use bot::BotCommand;
pub use train::TrainCommand;
pub use training::TrainingCommand;
