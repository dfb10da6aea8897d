//! Confirmed-fill import command implementation

use anyhow::{Context, Result};
use grid_trading::service::{GridService, ImportRecord};
use std::path::Path;
use tracing::info;

/// Import a JSON array of confirmed fill records produced by the matching
/// pipeline and apply them in one transaction.
pub fn run(service: &GridService, strategy_id: i64, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records: Vec<ImportRecord> =
        serde_json::from_str(&contents).context("Failed to parse import records")?;

    info!(count = records.len(), "importing confirmed fills");
    let outcome = service.import_fills(strategy_id, records)?;

    println!(
        "Imported {} of {} records ({} skipped).",
        outcome.imported, outcome.total, outcome.skipped
    );
    Ok(())
}
