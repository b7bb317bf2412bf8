//! Bot command handler.
//!
//! Runs the Telegram front-end until Ctrl-C or SIGTERM.

use crate::commands::train::run_training;
use crate::context::AppContext;
use askdb_core::{config::AppConfig, AppResult};
use askdb_telegram::{Bot, Poller, TelegramApi};
use clap::Args;
use std::sync::Arc;
use tracing::info;

/// Serve questions over Telegram
#[derive(Args, Debug)]
pub struct BotCommand {
    /// Skip the training step
    #[arg(long)]
    pub skip_train: bool,
}

impl BotCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        info!("Executing bot command");

        // Fail on a missing token before touching the database
        let api = Arc::new(TelegramApi::from_config(&config.telegram)?);
        let context = AppContext::connect(config, true).await?;
        if !self.skip_train {
            run_training(&context).await;
        }

        let bot = Bot::new(api.clone(), context.answerer.clone());
        Poller::new(api, bot, config.telegram.poll_timeout_secs)
            .run(shutdown_signal())
            .await;

        context.shutdown().await;
        info!("Bot stopped");
        Ok(())
    }
}

/// Resolves on the first SIGINT, SIGTERM or Ctrl-C.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = ctrl_c() => info!("Received Ctrl-C"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
    info!("Received Ctrl-C");
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
