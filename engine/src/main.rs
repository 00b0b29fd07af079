// Engine main entry point
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use engine::config::settings::EngineSettings;
use engine::data::date_converter::convert_and_validate_grn_date;
use engine::data::grn_import::{GrnImportProcessor, GrnImportReport};
use engine::services::error_handler::RetryPolicy;
use engine::services::ErrorHandler;
use serde_json::{json, Map};
use shared::models::CellValue;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "erp-engine", version, about = "Normalizes ERP spreadsheet imports")]
struct Cli {
    /// JSON settings file; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a GRN export and report every rejected row
    Import {
        file: PathBuf,
        /// Overrides import.delimiter from the settings
        #[arg(long)]
        delimiter: Option<char>,
        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Normalize a single GRN date value (serial number or text)
    Date { value: String },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::default(),
    };
    init_tracing(&settings.log_level);
    info!("Starting ERP engine");

    let handler = ErrorHandler::with_tracing();

    match cli.command {
        Command::Import { file, delimiter, json } => {
            let delimiter = delimiter.unwrap_or(settings.import.delimiter);
            if !delimiter.is_ascii() {
                bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
            }
            let report = run_import(&handler, &settings, &file, delimiter as u8).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                summarize(&report);
            }
        }
        Command::Date { value } => {
            let result = convert_and_validate_grn_date(&CellValue::from_field(&value));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

async fn run_import(
    handler: &ErrorHandler,
    settings: &EngineSettings,
    file: &Path,
    delimiter: u8,
) -> Result<GrnImportReport> {
    let processor = GrnImportProcessor::new(delimiter);
    let policy = RetryPolicy::from(&settings.retry);

    match processor.load_with_retry(file, handler, &policy).await {
        Ok(report) => Ok(report),
        Err(e) => {
            let err = anyhow::Error::new(e);
            let mut context = Map::new();
            context.insert("file".to_string(), json!(file.display().to_string()));
            context.insert("operation".to_string(), json!("grn_import"));
            handler.handle_error(&err, context, true);
            Err(err)
        }
    }
}

fn summarize(report: &GrnImportReport) {
    info!(
        rows = report.total_rows(),
        accepted = report.records.len(),
        warnings = report.warning_count(),
        "GRN import finished"
    );
    for record in report.records.iter().filter(|r| !r.warnings.is_empty()) {
        for warning in &record.warnings {
            warn!(line = record.line, grn = %record.grn_number, "{}", warning);
        }
    }
    for error in &report.errors {
        warn!(line = error.line, field = error.field, "{}", error.message);
    }
}
