//! Europe PMC REST client used as the primary full-text locator.
//!
//! Endpoint: https://www.ebi.ac.uk/europepmc/webservices/rest/search
//!
//! A PMID is looked up with `EXT_ID:<pmid> AND SRC:MED`. A free PDF entry in
//! `fullTextUrlList` wins; failing that, an open-access record with a PMCID
//! is served through the Europe PMC PDF renderer.

use async_trait::async_trait;
use serde::Deserialize;
use snplit_common::sandbox::SandboxClient as Client;
use snplit_common::SnplitError;
use tracing::{debug, instrument};

use super::PrimaryLocator;
use crate::error::StageError;
use crate::models::PrimaryLookup;

pub const DEFAULT_EPMC_BASE: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";
const EPMC_RENDER_URL: &str = "https://europepmc.org/backend/ptpmcrender.fcgi";

pub struct EuropePmcClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(rename = "resultList", default)]
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<EpmcResult>,
}

#[derive(Debug, Default, Deserialize)]
struct EpmcResult {
    #[serde(default)]
    pmcid: Option<String>,
    #[serde(rename = "isOpenAccess", default)]
    is_open_access: Option<String>,
    #[serde(rename = "fullTextUrlList", default)]
    full_text_url_list: Option<FullTextUrlList>,
}

#[derive(Debug, Default, Deserialize)]
struct FullTextUrlList {
    #[serde(rename = "fullTextUrl", default)]
    full_text_url: Vec<FullTextUrl>,
}

#[derive(Debug, Default, Deserialize)]
struct FullTextUrl {
    #[serde(rename = "documentStyle", default)]
    document_style: Option<String>,
    #[serde(rename = "availabilityCode", default)]
    availability_code: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl EuropePmcClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_EPMC_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self))]
    async fn search_by_pmid(&self, pmid: &str) -> Result<Vec<EpmcResult>, SnplitError> {
        let query = format!("EXT_ID:{pmid} AND SRC:MED");
        let params = [
            ("query", query.as_str()),
            ("resultType", "core"),
            ("format", "json"),
        ];

        let resp: SearchResponse = self.client
            .get(&format!("{}/search", self.base_url))?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(count = resp.result_list.result.len(), "Europe PMC search returned results");
        Ok(resp.result_list.result)
    }
}

#[async_trait]
impl PrimaryLocator for EuropePmcClient {
    async fn find(&self, pmid: &str) -> Result<PrimaryLookup, StageError> {
        let results = self
            .search_by_pmid(pmid)
            .await
            .map_err(|e| StageError::Location(format!("Europe PMC: {e}")))?;
        Ok(lookup_from_results(pmid, &results))
    }
}

fn lookup_from_results(pmid: &str, results: &[EpmcResult]) -> PrimaryLookup {
    let Some(record) = results.first() else {
        return PrimaryLookup {
            url: None,
            reason: Some(format!("PMID {pmid} not indexed by Europe PMC")),
        };
    };

    let free_pdf = record
        .full_text_url_list
        .as_ref()
        .into_iter()
        .flat_map(|l| l.full_text_url.iter())
        .find(|u| {
            u.document_style.as_deref() == Some("pdf")
                && matches!(u.availability_code.as_deref(), Some("OA") | Some("F"))
        })
        .and_then(|u| u.url.clone());

    if let Some(url) = free_pdf {
        return PrimaryLookup { url: Some(url), reason: None };
    }

    match (&record.pmcid, record.is_open_access.as_deref()) {
        (Some(pmcid), Some("Y")) => PrimaryLookup {
            url: Some(format!("{EPMC_RENDER_URL}?accid={pmcid}&blobtype=pdf")),
            reason: None,
        },
        _ => PrimaryLookup {
            url: None,
            reason: Some(format!("no PMC copy or PDF link for PMID {pmid}")),
        },
    }
}
