//! Ask command handler.
//!
//! Answers a single question from the terminal, the same way the bot does.

use crate::commands::train::run_training;
use crate::context::AppContext;
use askdb_core::{config::AppConfig, AppResult};
use askdb_pipeline::Answerer;
use clap::Args;

/// Answer a question about the DVD rental database
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to answer
    pub question: String,

    /// Skip the training step
    #[arg(long)]
    pub skip_train: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let context = AppContext::connect(config, true).await?;
        if !self.skip_train {
            run_training(&context).await;
        }

        let answer = context.answerer.answer(&self.question).await;
        context.shutdown().await;

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "answer": answer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer);
        }

        Ok(())
    }
}
