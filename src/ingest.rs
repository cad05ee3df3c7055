//! Data file discovery and reading.
//!
//! Every `*.csv` file in the data directory except the schema source maps to
//! one destination table named after the file stem (lowercased). Header
//! names are lowercased as well so that they line up with the catalog
//! regardless of how the export capitalised them.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::debug;

use crate::{io_utils, schema::SCHEMA_FILE_NAME};

/// Cell values treated as SQL NULL in addition to blank cells.
pub const NULL_TOKENS: &[&str] = &[
    "#N/A", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRow {
    /// 1-based line in the source file.
    pub line: u64,
    pub values: Vec<String>,
}

impl IngestRow {
    /// Picks the cells at `positions`, normalizing blanks and placeholder
    /// tokens to `None`. A row whose field count differs from the header
    /// cannot be aligned and is rejected.
    pub fn project(
        &self,
        positions: &[usize],
        expected_fields: usize,
    ) -> std::result::Result<Vec<Option<String>>, String> {
        if self.values.len() != expected_fields {
            return Err(format!(
                "row has {} field(s) but the header declares {}",
                self.values.len(),
                expected_fields
            ));
        }
        Ok(positions
            .iter()
            .map(|&idx| self.values.get(idx).and_then(|v| normalize_value(v)))
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct IngestFile {
    pub path: PathBuf,
    pub table_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<IngestRow>,
}

impl IngestFile {
    pub fn read(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Self> {
        let table_name =
            table_name_for(path).ok_or_else(|| anyhow!("Cannot derive a table name from {path:?}"))?;
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let mut file = Self::from_csv(table_name, reader, encoding)
            .with_context(|| format!("Reading data file {path:?}"))?;
        file.path = path.to_path_buf();
        Ok(file)
    }

    pub fn from_reader<R: Read>(
        table_name: &str,
        reader: R,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        Self::from_csv(
            table_name.to_lowercase(),
            io_utils::open_csv_reader(reader, delimiter),
            encoding,
        )
    }

    fn from_csv<R: Read>(
        table_name: String,
        mut reader: csv::Reader<R>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut records = reader.byte_records();
        let columns = match records.next() {
            Some(header) => {
                let header = header.context("Reading header row")?;
                io_utils::decode_record(&header, encoding)?
                    .iter()
                    .map(|name| io_utils::trim_quotes(name).to_lowercase())
                    .collect()
            }
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for (idx, record) in records.enumerate() {
            let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(idx as u64 + 2);
            let values = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row at line {line}"))?;
            rows.push(IngestRow { line, values });
        }
        debug!(
            "Read {} row(s) with {} column(s) for table {}",
            rows.len(),
            columns.len(),
            table_name
        );
        Ok(Self {
            path: PathBuf::new(),
            table_name,
            columns,
            rows,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// File positions of `columns`, or `None` if any name is not a file column.
    pub fn positions(&self, columns: &[String]) -> Option<Vec<usize>> {
        columns.iter().map(|name| self.column_index(name)).collect()
    }
}

pub fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || NULL_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn table_name_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_lowercase)
        .filter(|name| !name.is_empty())
}

/// Data files in `dir`, sorted by file name. The schema source is skipped.
pub fn discover_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing data directory {dir:?}"))? {
        let entry = entry.with_context(|| format!("Listing data directory {dir:?}"))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == SCHEMA_FILE_NAME || !name.ends_with(".csv") || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}
