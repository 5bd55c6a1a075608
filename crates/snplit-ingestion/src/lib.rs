//! snplit-ingestion — Literature lookup and full-text retrieval.
//!
//! - DOI → PMID resolution and PubMed metadata (`sources::pubmed`)
//! - Full-text location: Europe PMC first, Unpaywall as the fallback
//! - Artifact acquisition under per-batch ephemeral storage
//! - PDF → markdown conversion
//! - Batch orchestration into a plain-text report

pub mod acquirer;
pub mod ephemeral;
pub mod error;
pub mod locator;
pub mod models;
pub mod pdf_parser;
pub mod pipeline;
pub mod report;
pub mod sources;

pub use error::StageError;
pub use pipeline::{BatchOrchestrator, Collaborators, PipelineSettings};
