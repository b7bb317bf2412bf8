//! Telegram front-end for askdb.
//!
//! Long-polls the Bot API, answers `/start` with a greeting and every other
//! text message with the pipeline's sentence.

pub mod api;
pub mod handler;
pub mod poller;

// Re-export main types
pub use api::{ChatTransport, TelegramApi, UpdateSource};
pub use handler::{route, Bot, Route, GREETING};
pub use poller::Poller;
