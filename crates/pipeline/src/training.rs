//! Idempotent ingestion of training material.

use askdb_knowledge::{dvdrental, TrainingKind};
use askdb_sql::SqlGenerator;
use serde::Serialize;
use tracing::{error, info, instrument};

/// One item to ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingItem {
    pub kind: TrainingKind,
    pub content: String,
}

impl TrainingItem {
    pub fn new(kind: TrainingKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Counts from one training run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainingReport {
    pub ingested: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Schema, glossary, then every example query.
pub fn dvdrental_items() -> Vec<TrainingItem> {
    let mut items = vec![
        TrainingItem::new(TrainingKind::Ddl, dvdrental::SCHEMA_DDL),
        TrainingItem::new(TrainingKind::Documentation, dvdrental::GLOSSARY),
    ];
    items.extend(
        dvdrental::example_queries()
            .into_iter()
            .map(|q| TrainingItem::new(TrainingKind::Sql, q)),
    );
    items
}

/// Ingest every item the generator does not already hold.
///
/// A failing item is logged and counted; the rest still run.
#[instrument(skip_all, fields(items = items.len()))]
pub async fn train(generator: &dyn SqlGenerator, items: &[TrainingItem]) -> TrainingReport {
    let mut report = TrainingReport::default();

    for item in items {
        match generator.has_training_data(item.kind, &item.content).await {
            Ok(true) => {
                info!(kind = %item.kind, "Training item already exists. Skipping...");
                report.skipped += 1;
            }
            Ok(false) => match generator.ingest(item.kind, &item.content).await {
                Ok(()) => report.ingested += 1,
                Err(e) => {
                    error!(kind = %item.kind, error = %e, "Error during training");
                    report.failed += 1;
                }
            },
            Err(e) => {
                error!(kind = %item.kind, error = %e, "Error checking training data");
                report.failed += 1;
            }
        }
    }

    info!(
        ingested = report.ingested,
        skipped = report.skipped,
        failed = report.failed,
        "Training finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvdrental_items_order() {
        let items = dvdrental_items();
        assert_eq!(items.len(), 12);
        assert_eq!(items[0].kind, TrainingKind::Ddl);
        assert_eq!(items[1].kind, TrainingKind::Documentation);
        assert!(items[2..].iter().all(|i| i.kind == TrainingKind::Sql));
    }
}
