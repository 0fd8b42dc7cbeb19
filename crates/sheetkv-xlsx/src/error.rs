//! XLSX error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// File does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Write attempted without a writable target
    #[error("Document is read-only")]
    ReadOnly,

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] sheetkv_core::Error),
}

impl From<XlsxError> for sheetkv_core::Error {
    fn from(err: XlsxError) -> Self {
        use sheetkv_core::Error;

        match err {
            XlsxError::NotFound(path) => Error::DocumentNotFound(path),
            XlsxError::ReadOnly => Error::ReadOnly,
            XlsxError::Io(e) => Error::Io(e),
            XlsxError::Core(e) => e,
            other => Error::DocumentFormat(other.to_string()),
        }
    }
}
