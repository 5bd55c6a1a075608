//! Unpaywall v2 client, the open-access aggregator behind the fallback
//! full-text stage.
//!
//! API: https://api.unpaywall.org/v2/{doi}?email={contact}
//! Unpaywall requires a contact email on every request.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use snplit_common::sandbox::SandboxClient as Client;
use tracing::{debug, instrument, warn};

use super::OaAggregator;
use crate::error::StageError;
use crate::models::OaRecord;

pub const DEFAULT_UNPAYWALL_BASE: &str = "https://api.unpaywall.org/v2";

pub struct UnpaywallClient {
    client: Client,
    base_url: String,
    email: String,
}

/// Body of an Unpaywall error response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl UnpaywallClient {
    pub fn new(client: Client, email: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_UNPAYWALL_BASE.to_string(),
            email: email.into(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

/// Percent-encode a DOI for use as URL path segments. `/` separators are
/// kept; `#`, `?`, `%` and everything else outside the unreserved set are
/// escaped so the whole DOI reaches the server.
pub fn encode_doi_path(doi: &str) -> String {
    doi.trim()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl OaAggregator for UnpaywallClient {
    #[instrument(skip(self))]
    async fn lookup(&self, doi: &str) -> Result<OaRecord, StageError> {
        let url = format!("{}/{}", self.base_url, encode_doi_path(doi));
        let resp = self.client
            .get(&url)
            .map_err(|e| StageError::Location(e.to_string()))?
            .query(&[("email", self.email.as_str())])
            .send()
            .await
            .map_err(|e| StageError::Location(format!("Unpaywall: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            // Unknown DOIs come back as 404 with an explanatory message.
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            debug!(reason = ?body.message, "Unpaywall has no record for DOI");
            return Ok(OaRecord {
                is_oa: false,
                oa_locations: Vec::new(),
                message: Some(body.message.unwrap_or_else(|| format!("{doi} not found in Unpaywall"))),
            });
        }
        if !status.is_success() {
            warn!(%status, "Unpaywall request failed");
            return Err(StageError::Location(format!("Unpaywall returned HTTP {status}")));
        }

        let record: OaRecord = resp
            .json()
            .await
            .map_err(|e| StageError::Location(format!("Unpaywall response: {e}")))?;
        debug!(is_oa = record.is_oa, n = record.oa_locations.len(), "Unpaywall record");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_path_encoding() {
        assert_eq!(encode_doi_path(" 10.1038/nature12373 "), "10.1038/nature12373");
        assert_eq!(encode_doi_path("10.1000/a#b"), "10.1000/a%23b");
        assert_eq!(encode_doi_path("10.1000/a?b=c"), "10.1000/a%3Fb%3Dc");
        assert_eq!(encode_doi_path("10.1000/100%25"), "10.1000/100%2525");
        assert_eq!(
            encode_doi_path("10.1002/(SICI)1097-4636<1::AID>3.0.CO;2-0"),
            "10.1002/%28SICI%291097-4636%3C1%3A%3AAID%3E3.0.CO%3B2-0"
        );
    }
}
