//! Schema source parsing.
//!
//! A schema source is an `INFORMATION_SCHEMA`-style CSV export with one row
//! per column and at least the header fields `TABLE_NAME`, `COLUMN_NAME`
//! and `DATA_TYPE`. Parsing yields a [`SchemaCatalog`]: tables in first-seen
//! order, each holding its columns in first-seen order.
//!
//! Exports of this kind are frequently produced without quoting, so a type
//! expression such as `numeric(10,2)` arrives split over two fields. Rows
//! that come out longer than the header are repaired by gluing every field
//! from [`TYPE_FIELD_POSITION`] onwards back together with the delimiter.
//! A row that still disagrees with the header after that is fatal for the
//! whole parse.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    error::LoadError,
    io_utils::{self, trim_quotes},
};

/// File name reserved for the schema source inside a data directory.
pub const SCHEMA_FILE_NAME: &str = "INFORMATION_SCHEMA.csv";

pub const TABLE_NAME_FIELD: &str = "TABLE_NAME";
pub const COLUMN_NAME_FIELD: &str = "COLUMN_NAME";
pub const DATA_TYPE_FIELD: &str = "DATA_TYPE";

/// Zero-based field position from which an over-long row is recombined.
pub const TYPE_FIELD_POSITION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    tables: IndexMap<String, TableDefinition>,
}

impl SchemaCatalog {
    pub fn from_path(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let catalog = Self::from_csv(reader, delimiter, encoding)
            .with_context(|| format!("Parsing schema source {path:?}"))?;
        info!(
            "Parsed {} column(s) across {} table(s) from {:?}",
            catalog.column_count(),
            catalog.len(),
            path
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        Self::from_csv(io_utils::open_csv_reader(reader, delimiter), delimiter, encoding)
    }

    fn from_csv<R: Read>(
        mut reader: csv::Reader<R>,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut records = reader.byte_records();
        let header_record = match records.next() {
            Some(record) => record.context("Reading schema header")?,
            None => return Err(LoadError::EmptySchema.into()),
        };
        let headers = parse_header(&io_utils::decode_record(&header_record, encoding)?, delimiter);
        let table_idx = field_index(&headers, TABLE_NAME_FIELD)?;
        let column_idx = field_index(&headers, COLUMN_NAME_FIELD)?;
        let type_idx = field_index(&headers, DATA_TYPE_FIELD)?;
        debug!("Schema header fields: {:?}", headers);

        let mut catalog = SchemaCatalog::default();
        for record in records {
            let record = record.context("Reading schema row")?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let raw = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding schema row at line {line}"))?;
            let fields = repair_row(raw, headers.len(), delimiter);
            if fields.len() != headers.len() {
                return Err(LoadError::MalformedSchemaRow {
                    line,
                    expected: headers.len(),
                    found: fields.len(),
                    fields,
                }
                .into());
            }
            catalog.push_column(
                &fields[table_idx],
                ColumnDefinition {
                    name: fields[column_idx].trim().to_lowercase(),
                    declared_type: trim_quotes(&fields[type_idx]).to_string(),
                },
            );
        }
        Ok(catalog)
    }

    /// Appends `column` to `table`, registering the table on first sight.
    pub fn push_column(&mut self, table: &str, column: ColumnDefinition) {
        let name = table.trim().to_lowercase();
        self.tables
            .entry(name.clone())
            .or_insert_with(|| TableDefinition::new(name))
            .columns
            .push(column);
    }

    pub fn get(&self, table: &str) -> Option<&TableDefinition> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }
}

/// Normalizes the header row. A header exported as one quoted field
/// (`"TABLE_NAME,COLUMN_NAME,..."`) is split again on the delimiter.
pub fn parse_header(raw: &[String], delimiter: u8) -> Vec<String> {
    let tokens: Vec<&str> = match raw {
        [single] => single.split(delimiter as char).collect(),
        _ => raw.iter().map(String::as_str).collect(),
    };
    tokens
        .into_iter()
        .map(|token| trim_quotes(token).to_string())
        .collect()
}

/// Trims every field and, when the row is longer than the header, folds the
/// overflow back into a single trailing type field.
pub fn repair_row(fields: Vec<String>, header_len: usize, delimiter: u8) -> Vec<String> {
    let mut fields = fields
        .into_iter()
        .map(|field| field.trim().to_string())
        .collect::<Vec<_>>();
    if fields.len() > header_len && fields.len() > TYPE_FIELD_POSITION {
        let overflow = fields.split_off(TYPE_FIELD_POSITION);
        let joined = overflow.join(&(delimiter as char).to_string());
        fields.push(joined.trim().to_string());
    }
    fields
}

fn field_index(headers: &[String], field: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == field)
        .ok_or_else(|| LoadError::MissingSchemaField { field }.into())
}
