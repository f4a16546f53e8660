//! Lookup error types.

use thiserror::Error;

/// Errors that can occur while building the subject index.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The CSV had no usable data rows.
    #[error("invalid CSV: no data rows available")]
    NoDataRows,

    /// The subjects file could not be read.
    #[error("failed to read subjects file: {0}")]
    Io(#[from] std::io::Error),
}
