//! External service clients and the seams the orchestrator depends on.
//!
//! Each trait is one collaborator of the pipeline. Production clients live in
//! the submodules; tests substitute fakes.

pub mod europepmc;
pub mod pubmed;
pub mod unpaywall;

use async_trait::async_trait;

use crate::error::StageError;
use crate::models::{BibliographicRecord, OaRecord, PrimaryLookup};

/// Maps an external citation identifier (DOI) to a PMID.
#[async_trait]
pub trait IdResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<String, StageError>;
}

/// Fetches the bibliographic record for a PMID.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, pmid: &str) -> Result<BibliographicRecord, StageError>;
}

/// Record-aware full-text finder keyed by PMID.
///
/// "Unknown" is `Ok` with no URL; `Err` is reserved for transport or
/// service failures and must be `StageError::Location`.
#[async_trait]
pub trait PrimaryLocator: Send + Sync {
    async fn find(&self, pmid: &str) -> Result<PrimaryLookup, StageError>;
}

/// Open-access aggregation service keyed by the original identifier.
#[async_trait]
pub trait OaAggregator: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<OaRecord, StageError>;
}
