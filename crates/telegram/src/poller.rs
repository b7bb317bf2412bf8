//! Long-polling loop.

use crate::api::UpdateSource;
use crate::handler::Bot;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fetches updates and hands each one to the [`Bot`] on its own task.
pub struct Poller {
    source: Arc<dyn UpdateSource>,
    bot: Bot,
    poll_timeout_secs: u64,
    retry_delay: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn UpdateSource>, bot: Bot, poll_timeout_secs: u64) -> Self {
        Self {
            source,
            bot,
            poll_timeout_secs,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Pause after a failed poll.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Poll until `shutdown` resolves, then wait for in-flight replies.
    ///
    /// Each batch advances the offset past its highest `update_id`, so an
    /// update is handed out once. Poll errors are logged and retried.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut offset: Option<i64> = None;
        let mut in_flight: JoinSet<()> = JoinSet::new();

        info!(timeout_secs = self.poll_timeout_secs, "Polling for updates");

        loop {
            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    error!(error = %e, "Update task failed");
                }
            }

            let batch = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poller");
                    break;
                }
                batch = self.source.get_updates(offset, self.poll_timeout_secs) => batch,
            };

            match batch {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(count = updates.len(), "Received updates");
                    }
                    for update in updates {
                        let next = update.update_id + 1;
                        offset = Some(offset.map_or(next, |current| current.max(next)));

                        let bot = self.bot.clone();
                        in_flight.spawn(async move { bot.handle_update(update).await });
                    }
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?self.retry_delay, "Polling failed");
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("Shutdown requested, stopping poller");
                            break;
                        }
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            info!(pending = in_flight.len(), "Waiting for in-flight replies");
        }
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Update task failed");
            }
        }
        info!("Poller stopped");
    }
}
