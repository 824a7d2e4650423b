// src/main.rs
mod config;
mod extractors;
mod pdf;
mod storage;
mod utils;

use std::path::PathBuf;

use clap::Parser;
use config::ExtractionConfig;
use extractors::VacancyExtractor;
use pdf::PdfDocument;
use storage::StorageManager;
use utils::AppError;

/// Extracts the vacancy tables of a job announcement PDF into a ';'-separated CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PDF announcement to read
    #[arg(short, long, default_value = "listado0.pdf")]
    input: PathBuf,

    /// CSV file to write
    #[arg(short, long, default_value = "vacantes.csv")]
    output: PathBuf,

    /// JSON settings file (heading prefixes, column labels, strategy order)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Load settings
    let config = match &args.config {
        Some(path) => ExtractionConfig::load(path)?,
        None => ExtractionConfig::default(),
    };
    let extractor = VacancyExtractor::from_config(&config)?;

    // 4. Initialize storage
    let storage = StorageManager::new(&args.output)?;

    // 5. Extract; the document is closed when it goes out of scope
    println!("Extrayendo tablas de '{}'...", args.input.display());
    let extraction = {
        let document = PdfDocument::open(&args.input)?;
        extractor.extract(&document)?
    };

    // 6. Write results
    let path = storage.save_records(&extraction.records)?;
    if let Some(summary_path) = &args.summary {
        storage.save_summary(summary_path, &args.input, &extraction)?;
    }

    println!(
        "Se ha generado '{}' con {} registros.",
        path.display(),
        extraction.records.len()
    );
    Ok(())
}
