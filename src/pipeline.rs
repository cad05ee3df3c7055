//! End-to-end run: schema → tables → data files → analysis.
//!
//! The run is strictly sequential. The schema source is parsed before any
//! connection is opened, so a malformed schema never touches the
//! destination. Once connected, the connection is closed exactly once on
//! every exit path.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;

use crate::{
    ddl,
    ingest::{self, IngestFile},
    io_utils,
    loader::{self, LoadSummary},
    outcome::{Outcome, UnitReport},
    report::{self, AnalysisReport, ReportLayout},
    schema::SchemaCatalog,
    store::Destination,
    table::{self, Align},
};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub schema_path: PathBuf,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub layout: ReportLayout,
    pub run_report: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tables: Vec<UnitReport>,
    pub files: Vec<LoadSummary>,
    pub analysis: Option<AnalysisReport>,
}

impl RunSummary {
    pub fn skipped_tables(&self) -> Vec<&UnitReport> {
        self.tables
            .iter()
            .filter(|report| !report.outcome.is_done())
            .collect()
    }
}

/// Parses the schema, then connects with `connect` and runs every phase.
pub fn run<D, F>(options: &RunOptions, connect: F) -> Result<RunSummary>
where
    D: Destination + ?Sized,
    F: FnOnce() -> Result<Box<D>>,
{
    let delimiter = io_utils::resolve_input_delimiter(&options.schema_path, options.delimiter);
    let catalog = SchemaCatalog::from_path(&options.schema_path, delimiter, options.encoding)?;

    let mut dest = connect()?;
    info!("Connected to {}", dest.describe());
    let result = run_phases(dest.as_mut(), &catalog, options);
    let closed = dest.close();
    let summary = result?;
    closed.context("Closing destination connection")?;
    Ok(summary)
}

pub fn run_phases<D>(dest: &mut D, catalog: &SchemaCatalog, options: &RunOptions) -> Result<RunSummary>
where
    D: Destination + ?Sized,
{
    info!("Creating {} table(s) on {}", catalog.len(), dest.describe());
    let tables = ddl::create_tables(dest, catalog).context("Creating tables")?;

    let mut files = Vec::new();
    for path in ingest::discover_data_files(&options.data_dir)? {
        let file = IngestFile::read(&path, options.delimiter, options.encoding)?;
        info!(
            "Inserting data from {:?} into {}...",
            path.file_name().unwrap_or_default(),
            file.table_name
        );
        let summary =
            loader::load_file(dest, &file).with_context(|| format!("Loading {path:?}"))?;
        files.push(summary);
    }

    let analysis = options
        .run_report
        .then(|| report::run_analysis(dest, &options.layout));

    Ok(RunSummary {
        tables,
        files,
        analysis,
    })
}

/// Runs the analysis queries, writes the report to `out`, then closes the
/// connection. A close failure is returned after the report is written.
pub fn run_report<D, W>(mut dest: Box<D>, layout: &ReportLayout, out: &mut W) -> Result<AnalysisReport>
where
    D: Destination + ?Sized,
    W: Write,
{
    info!("Connected to {}", dest.describe());
    let analysis = report::run_analysis(dest.as_mut(), layout);
    let written = report::write_report(out, &analysis).context("Writing report");
    dest.close().context("Closing destination connection")?;
    written?;
    Ok(analysis)
}

pub fn print_summary<W: Write>(out: &mut W, summary: &RunSummary) -> Result<()> {
    for skipped in summary.skipped_tables() {
        if let Outcome::Skipped(reason) = &skipped.outcome {
            writeln!(out, "Table {} was not created: {reason}", skipped.unit)?;
        }
    }

    if !summary.files.is_empty() {
        let headers = ["table", "successful", "failed", "note"].map(String::from);
        let rows = summary
            .files
            .iter()
            .map(|file| {
                vec![
                    file.table.clone(),
                    file.successful.to_string(),
                    file.failed.to_string(),
                    file.skipped.clone().unwrap_or_default(),
                ]
            })
            .collect::<Vec<_>>();
        let rendered = table::render_table(&headers, &rows, &[Align::Left, Align::Right, Align::Right]);
        writeln!(out, "{rendered}")?;
    }

    if let Some(analysis) = &summary.analysis {
        report::write_report(out, analysis)?;
    }
    Ok(())
}
