//! Error types reported at the crate boundary.
//!
//! Internal parsers are lenient and `Option`-based; the functions that sit at
//! the public boundary classify failures into these kinds.

use thiserror::Error;

/// The reasons a document can fail to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The file is not a PDF, or is damaged beyond what the recovery scan can
    /// repair.
    #[error("the data is not a readable PDF file")]
    MalformedPdf,
    /// The trailer carries an `/Encrypt` entry. Encrypted documents are
    /// rejected before any page access is attempted.
    #[error("the document is encrypted")]
    Encrypted,
    /// A caller-supplied path, stream or option value was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failure of a single stream filter.
///
/// Callers decoding image data may downgrade this to a warning and omit the
/// stream; everywhere else it surfaces as a hard error for the affected
/// stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filter} decode failed at byte {offset}")]
pub struct FilterError {
    /// The name of the filter that failed.
    pub filter: &'static str,
    /// The offset of the offending byte within the filter's input.
    pub offset: usize,
}

impl FilterError {
    pub(crate) fn new(filter: &'static str, offset: usize) -> Self {
        Self { filter, offset }
    }
}
