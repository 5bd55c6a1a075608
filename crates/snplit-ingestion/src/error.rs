//! Per-stage failure taxonomy for the retrieval pipeline.
//!
//! Every stage returns `Result<T, StageError>`; the orchestrator folds the
//! error into the item's report fragment and moves on to the next item.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    #[error("Could not resolve identifier to PMID - {0}")]
    Resolution(String),

    #[error("Could not retrieve article data - {0}")]
    Metadata(String),

    #[error("Could not query full-text locators - {0}")]
    Location(String),

    #[error("Failed to download document - {0}")]
    Download(String),

    #[error("Not a PDF file (content-type: {content_type})")]
    ContentType { content_type: String },

    #[error("Failed to convert document - {0}")]
    Conversion(String),

    #[error("Unexpected error - {0}")]
    Unexpected(String),
}

impl StageError {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Resolution(_)      => "resolve",
            StageError::Metadata(_)        => "metadata",
            StageError::Location(_)        => "locate",
            StageError::Download(_)        => "acquire",
            StageError::ContentType { .. } => "acquire",
            StageError::Conversion(_)      => "convert",
            StageError::Unexpected(_)      => "unexpected",
        }
    }
}
