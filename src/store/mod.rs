//! Destination stores.
//!
//! The loader only needs a small capability set from a relational store:
//! conditional DDL, column-catalog introspection, placeholder-bound inserts,
//! transaction control and plain aggregate queries. [`Destination`] captures
//! exactly that so the schema, loading and reporting code never touches a
//! driver directly.
//!
//! Two backends ship with the crate:
//!
//! - [`SqliteDestination`] backed by `rusqlite` (file or in-memory)
//! - [`PostgresDestination`] backed by the synchronous `postgres` client

mod pg;
mod sqlite;

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use thiserror::Error;

pub use self::pg::PostgresDestination;
pub use self::sqlite::SqliteDestination;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Postgres(#[from] postgres::Error),
    #[error("Destination connection is already closed")]
    Closed,
    #[error("Cannot read {value:?} in column '{column}' as a number")]
    Decode { column: String, value: String },
}

/// A column as the destination catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationColumn {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
        }
    }

    /// Numeric view of the value; `None` for SQL NULL.
    pub fn to_decimal(&self, column: &str) -> Result<Option<Decimal>, StoreError> {
        let decode_error = || StoreError::Decode {
            column: column.to_string(),
            value: self.as_display(),
        };
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(Decimal::from(*i))),
            SqlValue::Real(f) => Decimal::from_f64(*f).map(Some).ok_or_else(decode_error),
            SqlValue::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<Decimal>()
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map(Some)
                    .map_err(|_| decode_error())
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

pub trait Destination {
    /// Human-readable target used in log lines, e.g. `sqlite:bank.db`.
    fn describe(&self) -> String;

    fn execute_batch(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Runs exactly one statement; SQL carrying a second statement is
    /// rejected without running anything.
    fn execute(&mut self, sql: &str) -> Result<u64, StoreError>;

    /// Columns of `table` in catalog order; empty when the table does not exist.
    fn table_columns(&mut self, table: &str) -> Result<Vec<DestinationColumn>, StoreError>;

    fn insert_row(
        &mut self,
        table: &str,
        columns: &[DestinationColumn],
        values: &[Option<String>],
    ) -> Result<(), StoreError>;

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError>;

    /// Releases the underlying connection. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), StoreError>;

    fn begin(&mut self) -> Result<(), StoreError> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.execute_batch("ROLLBACK")
    }

    fn savepoint(&mut self, name: &str) -> Result<(), StoreError> {
        self.execute_batch(&format!("SAVEPOINT {}", quote_identifier(name)))
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), StoreError> {
        self.execute_batch(&format!("ROLLBACK TO SAVEPOINT {}", quote_identifier(name)))
    }

    fn release_savepoint(&mut self, name: &str) -> Result<(), StoreError> {
        self.execute_batch(&format!("RELEASE SAVEPOINT {}", quote_identifier(name)))
    }
}

/// Runs `op` inside a savepoint of the current transaction.
///
/// When `op` fails the savepoint is rolled back and released, leaving the
/// enclosing transaction usable for the next unit of work. The error of
/// `op` is returned unchanged.
pub fn isolated<D, T, F>(dest: &mut D, name: &str, op: F) -> Result<T, StoreError>
where
    D: Destination + ?Sized,
    F: FnOnce(&mut D) -> Result<T, StoreError>,
{
    dest.savepoint(name)?;
    match op(dest) {
        Ok(value) => {
            dest.release_savepoint(name)?;
            Ok(value)
        }
        Err(err) => {
            dest.rollback_to_savepoint(name)?;
            dest.release_savepoint(name)?;
            Err(err)
        }
    }
}

/// Renders `INSERT INTO "table" ("a", "b") VALUES (...)` with one placeholder
/// per column produced by `placeholder(position, column)` (1-based).
pub(crate) fn insert_statement<F>(table: &str, columns: &[DestinationColumn], placeholder: F) -> String
where
    F: Fn(usize, &DestinationColumn) -> String,
{
    let names = columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    let values = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| placeholder(idx + 1, column))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({names}) VALUES ({values})",
        quote_identifier(table)
    )
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
