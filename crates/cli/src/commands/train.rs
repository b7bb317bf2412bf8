//! Train command handler.
//!
//! Ingests the DVD rental schema, glossary and example queries.

use crate::context::AppContext;
use askdb_core::{config::AppConfig, AppResult};
use askdb_pipeline::{dvdrental_items, train, TrainingReport};
use clap::Args;

/// Load the DVD rental training material into the store
#[derive(Args, Debug)]
pub struct TrainCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TrainCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing train command");

        let context = AppContext::connect(config, false).await?;
        let report = run_training(&context).await;
        context.shutdown().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

/// Ingest everything not already stored.
pub async fn run_training(context: &AppContext) -> TrainingReport {
    train(context.generator.as_ref(), &dvdrental_items()).await
}

fn print_report(report: &TrainingReport) {
    println!(
        "Ingested {} items ({} already present, {} failed)",
        report.ingested, report.skipped, report.failed
    );
}
