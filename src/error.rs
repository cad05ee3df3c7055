//! Fatal error taxonomy.
//!
//! Only failures that compromise the whole run live here. Failures scoped to
//! a single table, row, or analysis query are contained where they happen and
//! surface as [`crate::outcome::Outcome::Skipped`] instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "Malformed schema row at line {line}: expected {expected} field(s) after repair but found {found}: {fields:?}"
    )]
    MalformedSchemaRow {
        line: u64,
        expected: usize,
        found: usize,
        fields: Vec<String>,
    },
    #[error("Schema header is missing required field '{field}'")]
    MissingSchemaField { field: &'static str },
    #[error("Schema source does not contain a header row")]
    EmptySchema,
    #[error("Section '{section}' is not found in the {path:?} file")]
    MissingConfigSection { section: String, path: PathBuf },
    #[error("Unable to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: StoreError,
    },
    #[error("No destination selected; pass --sqlite <path> or --config <file>")]
    NoDestination,
}
