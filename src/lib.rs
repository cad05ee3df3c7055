pub mod cli;
pub mod config;
pub mod ddl;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod loader;
pub mod outcome;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod store;
pub mod table;

use std::{env, io, path::Path, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, DestinationArgs},
    config::{ConfigFile, DEFAULT_CONFIG_FILE},
    error::LoadError,
    report::ReportLayout,
    schema::{SCHEMA_FILE_NAME, SchemaCatalog},
    store::{Destination, PostgresDestination, SqliteDestination},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bank_csv_loader", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Ddl(args) => handle_ddl(&args),
        Commands::Report(args) => handle_report(&args),
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let config = config_file(&args.destination)?;
    let schema_path = args
        .schema
        .clone()
        .unwrap_or_else(|| args.data_dir.join(SCHEMA_FILE_NAME));
    let options = pipeline::RunOptions {
        data_dir: args.data_dir.clone(),
        schema_path,
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        layout: report_layout(config.as_ref())?,
        run_report: !args.skip_report,
    };
    info!(
        "Loading {:?} using schema {:?}",
        options.data_dir, options.schema_path
    );
    let summary = pipeline::run(&options, || connect(&args.destination, config.as_ref()))?;
    pipeline::print_summary(&mut io::stdout().lock(), &summary)
}

fn handle_ddl(args: &cli::DdlArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.schema, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let catalog = SchemaCatalog::from_path(&args.schema, delimiter, encoding)?;
    for statement in ddl::create_statements(&catalog) {
        println!("{statement};");
    }
    Ok(())
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let config = config_file(&args.destination)?;
    let layout = report_layout(config.as_ref())?;
    let dest = connect(&args.destination, config.as_ref())?;
    pipeline::run_report(dest, &layout, &mut io::stdout().lock())?;
    Ok(())
}

fn config_file(args: &DestinationArgs) -> Result<Option<ConfigFile>> {
    match &args.config {
        Some(path) => ConfigFile::load(path).map(Some),
        None if args.sqlite.is_none() && Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            ConfigFile::load(Path::new(DEFAULT_CONFIG_FILE)).map(Some)
        }
        None => Ok(None),
    }
}

fn report_layout(config: Option<&ConfigFile>) -> Result<ReportLayout> {
    match config {
        Some(config) => config.report_layout(),
        None => Ok(ReportLayout::default()),
    }
}

fn connect(args: &DestinationArgs, config: Option<&ConfigFile>) -> Result<Box<dyn Destination>> {
    if let Some(path) = &args.sqlite {
        let dest = SqliteDestination::open(path).map_err(|source| LoadError::Connection {
            target: format!("sqlite:{}", path.display()),
            source,
        })?;
        return Ok(Box::new(dest));
    }
    let config = config.ok_or(LoadError::NoDestination)?;
    let params = config.connection(&args.section)?;
    let dest = PostgresDestination::connect(&params).map_err(|source| LoadError::Connection {
        target: params.describe(),
        source,
    })?;
    Ok(Box::new(dest))
}
