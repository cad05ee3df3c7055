use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_SECTION;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load an INFORMATION_SCHEMA export and its CSV data into a relational store",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create tables from the schema source, load every data file, and report balances
    Load(LoadArgs),
    /// Print the CREATE TABLE statements derived from a schema source
    Ddl(DdlArgs),
    /// Run the balance reports against an already loaded destination
    Report(ReportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DestinationArgs {
    /// SQLite database file to load into instead of PostgreSQL
    #[arg(long)]
    pub sqlite: Option<PathBuf>,
    /// YAML configuration file (connection sections and report layout; defaults to ./database.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Configuration section holding the PostgreSQL connection parameters
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory holding INFORMATION_SCHEMA.csv and one CSV file per table
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// Schema source (defaults to <data-dir>/INFORMATION_SCHEMA.csv)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Stop after loading; do not run the balance reports
    #[arg(long = "skip-report")]
    pub skip_report: bool,
    #[command(flatten)]
    pub destination: DestinationArgs,
}

#[derive(Debug, Args)]
pub struct DdlArgs {
    /// Schema source to translate
    #[arg(short, long)]
    pub schema: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the schema source (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub destination: DestinationArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
