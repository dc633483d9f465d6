//! Error types for envlog-core.

use thiserror::Error;

/// Errors that can occur while rendering an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX encoding failed.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Flushing the output buffer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested export format is not supported.
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

/// Result type alias using the export error type.
pub type Result<T> = std::result::Result<T, ExportError>;
