//! Matching data file columns against a destination table.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::store::DestinationColumn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Table columns also present in the file, in table order.
    pub insert_columns: Vec<DestinationColumn>,
    pub missing_in_file: BTreeSet<String>,
    pub extra_in_file: BTreeSet<String>,
}

impl ReconciliationResult {
    pub fn insert_column_names(&self) -> Vec<String> {
        self.insert_columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Insert columns as they are spelled in a lowercased file header.
    pub fn file_column_names(&self) -> Vec<String> {
        self.insert_columns
            .iter()
            .map(|c| c.name.to_lowercase())
            .collect()
    }

    pub fn is_exact(&self) -> bool {
        self.missing_in_file.is_empty() && self.extra_in_file.is_empty()
    }

    pub fn describe_mismatches(&self) -> String {
        format!(
            "missing in file: [{}]; extra in file: [{}]",
            self.missing_in_file.iter().join(", "),
            self.extra_in_file.iter().join(", ")
        )
    }
}

/// Intersects `file_columns` with the live `table_columns`.
///
/// Names are compared case-insensitively and the destination spelling is
/// kept for the insert. Table order wins, so the insert column list is
/// stable no matter how the file orders its header.
pub fn reconcile(table_columns: &[DestinationColumn], file_columns: &[String]) -> ReconciliationResult {
    let file_set: BTreeSet<String> = file_columns.iter().map(|c| c.to_lowercase()).collect();
    let table_set: BTreeSet<String> = table_columns.iter().map(|c| c.name.to_lowercase()).collect();

    let insert_columns = table_columns
        .iter()
        .filter(|c| file_set.contains(&c.name.to_lowercase()))
        .unique_by(|c| c.name.to_lowercase())
        .cloned()
        .collect();

    ReconciliationResult {
        insert_columns,
        missing_in_file: table_set.difference(&file_set).cloned().collect(),
        extra_in_file: file_set.difference(&table_set).cloned().collect(),
    }
}
