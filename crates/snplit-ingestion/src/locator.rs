//! Two-stage full-text location.
//!
//!   1. Primary locator keyed by PMID (Europe PMC in production).
//!   2. Open-access aggregator keyed by the original DOI (Unpaywall).
//!
//! The first stage that yields a URL wins. "Not found" is a normal outcome;
//! `StageError::Location` is only returned when no stage could answer at all.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::StageError;
use crate::models::{FullTextLocation, OaRecord};
use crate::sources::{OaAggregator, PrimaryLocator};

pub const GENERIC_NOT_FOUND_REASON: &str = "No open access PDF available";
pub const PRIMARY_SOURCE_LABEL: &str = "europepmc";

pub struct FullTextLocator {
    primary: Arc<dyn PrimaryLocator>,
    aggregator: Arc<dyn OaAggregator>,
}

impl FullTextLocator {
    pub fn new(primary: Arc<dyn PrimaryLocator>, aggregator: Arc<dyn OaAggregator>) -> Self {
        Self { primary, aggregator }
    }

    /// Locate full text for one resolved record.
    #[instrument(skip(self))]
    pub async fn locate(&self, pmid: &str, identifier: &str) -> Result<FullTextLocation, StageError> {
        let mut primary_error = None;

        match self.primary.find(pmid).await {
            Ok(lookup) => {
                if let Some(url) = lookup.url {
                    debug!(%url, "Primary locator found full text");
                    return Ok(FullTextLocation::Found {
                        url,
                        source: PRIMARY_SOURCE_LABEL.to_string(),
                    });
                }
                debug!(reason = ?lookup.reason, "Primary locator has no full text");
            }
            Err(e) => {
                warn!(error = %e, "Primary locator failed, falling back to aggregator");
                primary_error = Some(e);
            }
        }

        match self.aggregator.lookup(identifier).await {
            Ok(record) => Ok(select_location(&record)),
            Err(e) => Err(match primary_error {
                Some(p) => StageError::Location(format!("{p}; {e}")),
                None => e,
            }),
        }
    }
}

/// Pick the aggregator candidate to download.
///
/// First candidate exposing a PDF URL; else the first candidate's generic
/// URL. This mirrors how Unpaywall orders `oa_locations` (best first) and is
/// a policy choice rather than a guarantee of the best copy.
pub fn select_location(record: &OaRecord) -> FullTextLocation {
    let reason = || {
        record
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_NOT_FOUND_REASON.to_string())
    };

    if !record.is_oa {
        return FullTextLocation::NotFound { reason: reason() };
    }

    let non_empty = |s: &Option<String>| s.as_deref().filter(|u| !u.trim().is_empty()).map(String::from);
    let source = |host: &Option<String>| host.clone().unwrap_or_else(|| "unknown".to_string());

    if let Some((loc, url)) = record
        .oa_locations
        .iter()
        .find_map(|loc| non_empty(&loc.url_for_pdf).map(|u| (loc, u)))
    {
        return FullTextLocation::Found { url, source: source(&loc.host_type) };
    }

    match record.oa_locations.first() {
        Some(first) => match non_empty(&first.url) {
            Some(url) => FullTextLocation::Found { url, source: source(&first.host_type) },
            None => FullTextLocation::NotFound {
                reason: "No PDF URL found in open access location".to_string(),
            },
        },
        None => FullTextLocation::NotFound { reason: reason() },
    }
}
