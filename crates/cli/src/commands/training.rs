//! Training data management.

use crate::context::open_store;
use askdb_core::{config::AppConfig, AppError, AppResult};
use askdb_knowledge::TrainingRecord;
use clap::{Args, Subcommand};

/// Inspect or edit stored training data
#[derive(Args, Debug)]
pub struct TrainingCommand {
    #[command(subcommand)]
    pub action: TrainingAction,
}

#[derive(Subcommand, Debug)]
pub enum TrainingAction {
    /// List stored items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item by id
    Remove {
        /// Item id as shown by `training list`
        id: String,
    },
}

impl TrainingCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;

        match &self.action {
            TrainingAction::List { json } => {
                tracing::info!("Listing training data");
                let records = store.list()?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                } else if records.is_empty() {
                    println!("No training data. Run `askdb train` first.");
                } else {
                    for record in &records {
                        println!("{}", summarize(record));
                    }
                    let stats = store.stats()?;
                    println!(
                        "\n{} items ({} ddl, {} documentation, {} sql)",
                        stats.total(),
                        stats.ddl,
                        stats.documentation,
                        stats.sql
                    );
                }
            }
            TrainingAction::Remove { id } => {
                tracing::info!(id = %id, "Removing training data");
                if !store.remove(id)? {
                    return Err(AppError::Knowledge(format!(
                        "No training data with id {}",
                        id
                    )));
                }
                println!("Removed {}", id);
            }
        }

        Ok(())
    }
}

/// One line per record: id, kind, and the first line of its text.
fn summarize(record: &TrainingRecord) -> String {
    let text = record.question.as_deref().unwrap_or(&record.content);
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let preview: String = first_line.chars().take(60).collect();
    let ellipsis = if first_line.chars().count() > 60 { "..." } else { "" };
    format!("{}  {:<13}  {}{}", record.id, record.kind.as_str(), preview, ellipsis)
}
