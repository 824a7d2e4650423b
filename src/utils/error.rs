// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF: {0}")]
    Load(#[from] pdf_extract::Error), // lopdf parse/read failures

    #[error("Failed to interpret page content: {0}")]
    Content(#[from] pdf_extract::OutputError),

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Regular expression error: {0}")]
    RegexError(String),

    #[error("Invalid heading prefixes: {0}")]
    InvalidPrefixes(String),

    #[error("Reading page failed: {0}")]
    Page(#[from] PdfError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
