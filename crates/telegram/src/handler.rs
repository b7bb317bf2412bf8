//! Update routing and replies.

use crate::api::{ChatTransport, Update};
use askdb_pipeline::{Answerer, FALLBACK_MESSAGE};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Reply to `/start`.
pub const GREETING: &str = "Hello! I'm your bot. How can I assist you?";

/// What to do with an inbound message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    Question(String),
    Ignore,
}

/// Classify a message text.
///
/// `/start`, `/start@SomeBot` and `/start <payload>` greet. Other commands
/// are ignored, as are missing texts. Everything else is a question.
pub fn route(text: Option<&str>) -> Route {
    let Some(text) = text else {
        return Route::Ignore;
    };

    if let Some(command) = text.strip_prefix('/') {
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        return if name == "start" {
            Route::Start
        } else {
            Route::Ignore
        };
    }

    Route::Question(text.to_string())
}

/// Handles one update at a time; shared between poller tasks.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<dyn ChatTransport>,
    answerer: Arc<dyn Answerer>,
}

impl Bot {
    pub fn new(transport: Arc<dyn ChatTransport>, answerer: Arc<dyn Answerer>) -> Self {
        Self {
            transport,
            answerer,
        }
    }

    /// Reply to `update` if it warrants a reply. Never fails; send errors
    /// are logged.
    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!("Update without message");
            return;
        };
        let chat_id = message.chat.id;

        let reply = match route(message.text.as_deref()) {
            Route::Ignore => {
                debug!(chat_id, "Ignoring message");
                return;
            }
            Route::Start => GREETING.to_string(),
            Route::Question(question) => {
                info!(chat_id, question = %question, "Question received");
                self.answer_isolated(question).await
            }
        };

        if let Err(e) = self.transport.send_message(chat_id, &reply).await {
            warn!(chat_id, error = %e, "Failed to send reply");
        }
    }

    /// Run the answerer in its own task so a panic still produces a reply.
    async fn answer_isolated(&self, question: String) -> String {
        let answerer = Arc::clone(&self.answerer);
        match tokio::spawn(async move { answerer.answer(&question).await }).await {
            Ok(sentence) => sentence,
            Err(e) => {
                error!(error = %e, "Answer task aborted");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}
