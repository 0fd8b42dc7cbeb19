//! Error types for sheetkv-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing addresses, expanding ranges or
/// extracting sections
#[derive(Debug, Error)]
pub enum Error {
    /// Address text is not letters followed by a positive row number
    #[error("Malformed cell address: {0}")]
    MalformedAddress(String),

    /// Range text does not split into exactly two addresses
    #[error("Malformed cell range: {0}")]
    MalformedRange(String),

    /// Range spans more than one column
    #[error("Unsupported range '{0}': only single-column ranges (e.g. A2:A10) are supported")]
    UnsupportedRange(String),

    /// A range error raised while processing a configured section
    #[error("Section '{section}' (range '{range}'): {source}")]
    Section {
        section: String,
        range: String,
        #[source]
        source: Box<Error>,
    },

    /// Two configured sections share a name
    #[error("Duplicate section name: {0}")]
    DuplicateSection(String),

    /// Settings could not be interpreted
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Document does not exist
    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    /// Document exists but cannot be read as a spreadsheet
    #[error("Invalid document format: {0}")]
    DocumentFormat(String),

    /// Sheet not found by name or index
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Shared string index outside the table
    #[error("Shared string index {index} out of range (count: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Write attempted on a document opened for reading
    #[error("Document was opened read-only")]
    ReadOnly,

    /// IO error while reading or writing a document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the section name and range text to a range error
    pub fn in_section<S: Into<String>, R: Into<String>>(self, section: S, range: R) -> Self {
        Error::Section {
            section: section.into(),
            range: range.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through section context
    pub fn root(&self) -> &Error {
        match self {
            Error::Section { source, .. } => source.root(),
            other => other,
        }
    }
}
