//! Row-by-row loading of one data file into its destination table.

use std::path::PathBuf;

use log::{info, warn};

use crate::{
    ingest::IngestFile,
    reconcile::{ReconciliationResult, reconcile},
    store::{Destination, StoreError, isolated},
};

const ROW_SAVEPOINT: &str = "load_row";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    pub file: PathBuf,
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<RowFailure>,
    pub reconciliation: ReconciliationResult,
    /// Set when no row of the file could be attempted at all.
    pub skipped: Option<String>,
}

impl LoadSummary {
    fn new(file: &IngestFile, reconciliation: ReconciliationResult) -> Self {
        Self {
            table: file.table_name.clone(),
            file: file.path.clone(),
            successful: 0,
            failed: 0,
            failures: Vec::new(),
            reconciliation,
            skipped: None,
        }
    }

    fn record_failure(&mut self, line: u64, reason: String) {
        self.failed += 1;
        warn!(
            "Failed to insert line {line} into {} ({} failure(s) so far): {reason}",
            self.table, self.failed
        );
        self.failures.push(RowFailure { line, reason });
    }
}

/// Reconciles `file` against the live columns of its table and inserts
/// every row using only the shared columns.
///
/// Row failures are counted and logged; the rows that did insert are
/// committed together once the file is exhausted. A file sharing no column
/// with its table (including a table that does not exist) is skipped and
/// all of its rows count as failed.
pub fn load_file<D>(dest: &mut D, file: &IngestFile) -> Result<LoadSummary, StoreError>
where
    D: Destination + ?Sized,
{
    let table_columns = dest.table_columns(&file.table_name)?;
    let reconciliation = reconcile(&table_columns, &file.columns);
    if !reconciliation.is_exact() {
        warn!(
            "Column mismatch between {:?} and table {}: {}",
            file.path,
            file.table_name,
            reconciliation.describe_mismatches()
        );
    }

    let positions = match file.positions(&reconciliation.file_column_names()) {
        Some(positions) if !positions.is_empty() => positions,
        _ => {
            let reason = if table_columns.is_empty() {
                format!("table {} does not exist", file.table_name)
            } else {
                format!("no column of the file matches table {}", file.table_name)
            };
            warn!("Skipping {:?}: {reason}", file.path);
            let mut summary = LoadSummary::new(file, reconciliation);
            summary.failed = file.rows.len();
            summary.skipped = Some(reason);
            return Ok(summary);
        }
    };

    let mut summary = LoadSummary::new(file, reconciliation);
    dest.begin()?;
    for row in &file.rows {
        let values = match row.project(&positions, file.columns.len()) {
            Ok(values) => values,
            Err(reason) => {
                summary.record_failure(row.line, reason);
                continue;
            }
        };
        let inserted = isolated(dest, ROW_SAVEPOINT, |d| {
            d.insert_row(
                &file.table_name,
                &summary.reconciliation.insert_columns,
                &values,
            )
        });
        match inserted {
            Ok(()) => summary.successful += 1,
            Err(err) => summary.record_failure(row.line, err.to_string()),
        }
    }
    dest.commit()?;

    info!(
        "Loaded {:?} into {}: {} row(s) succeeded, {} failed",
        file.path, file.table_name, summary.successful, summary.failed
    );
    Ok(summary)
}
