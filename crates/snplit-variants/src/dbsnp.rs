//! dbSNP lookups via NCBI Variation Services and E-utilities.
//!
//! Endpoints used:
//!   refsnp:  https://api.ncbi.nlm.nih.gov/variation/v0/refsnp/<rsN>
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi (db=snp)

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use snplit_common::sandbox::SandboxClient as Client;
use snplit_common::SnplitError;
use thiserror::Error;
use tracing::{error, info, instrument};

pub const DEFAULT_VARIATION_BASE: &str = "https://api.ncbi.nlm.nih.gov/variation/v0";
pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const NO_CLINICAL_DATA: &str = "No clinical significance data found";

#[derive(Debug, Error)]
pub enum DbSnpError {
    /// Non-2xx answer; `body` is the JSON error payload, or `{"raw_text": ...}`.
    #[error("dbSNP returned HTTP {status}")]
    Api { status: u16, body: Value },

    #[error(transparent)]
    Request(#[from] SnplitError),
}

impl DbSnpError {
    /// Tool-facing failure object.
    pub fn to_json(&self) -> Value {
        match self {
            DbSnpError::Api { status, body } => json!({
                "success": false,
                "status_code": status,
                "error": body,
            }),
            DbSnpError::Request(e) => json!({
                "success": false,
                "error": e.to_string(),
            }),
        }
    }
}

impl From<reqwest::Error> for DbSnpError {
    fn from(e: reqwest::Error) -> Self {
        DbSnpError::Request(SnplitError::Http(e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefSnpRecord {
    pub success: bool,
    pub data: Value,
    pub rs_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnpHit {
    pub rs_id: String,
    pub numeric_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnpSearchResult {
    pub success: bool,
    pub search_term: String,
    pub total_count: u64,
    pub returned_count: usize,
    pub results: Vec<SnpHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalEntry {
    pub accession: Option<String>,
    pub clinical_significance: Vec<String>,
    pub disease_names: Vec<String>,
    pub review_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClinicalData {
    Entries(Vec<ClinicalEntry>),
    Message(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicalReport {
    pub success: bool,
    pub rs_id: String,
    pub clinical_significance: ClinicalData,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    /// E-utilities sends the count as a string.
    #[serde(default)]
    count: Value,
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct DbSnpClient {
    client: Client,
    variation_base: String,
    eutils_base: String,
    api_key: Option<String>,
}

impl DbSnpClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        if api_key.is_some() {
            info!("NCBI API key configured");
        } else {
            info!("Running without NCBI API key (rate limits will be lower)");
        }
        Self {
            client,
            variation_base: DEFAULT_VARIATION_BASE.to_string(),
            eutils_base: DEFAULT_EUTILS_BASE.to_string(),
            api_key,
        }
    }

    pub fn with_variation_base(mut self, url: &str) -> Self {
        self.variation_base = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_eutils_base(mut self, url: &str) -> Self {
        self.eutils_base = url.trim_end_matches('/').to_string();
        self
    }

    /// Full RefSNP record for one rsID.
    #[instrument(skip(self))]
    pub async fn get_snp_by_rs(&self, rs_id: &str) -> Result<RefSnpRecord, DbSnpError> {
        let rs_id = normalize_rs_id(rs_id);
        let mut req = self.client
            .get(&format!("{}/refsnp/{}", self.variation_base, rs_id))?
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw_text": text }));
            error!(status = status.as_u16(), %body, "dbSNP API error");
            return Err(DbSnpError::Api { status: status.as_u16(), body });
        }

        let data: Value = resp.json().await?;
        info!(%rs_id, "Retrieved RefSNP record");
        Ok(RefSnpRecord { success: true, data, rs_id })
    }

    /// SNP ids matching `term`, at most `limit` of them.
    #[instrument(skip(self))]
    pub async fn search_snps(&self, term: &str, limit: usize) -> Result<SnpSearchResult, DbSnpError> {
        let mut params = vec![
            ("db", "snp".to_string()),
            ("term", term.to_string()),
            ("retmode", "json".to_string()),
            ("retmax", limit.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let resp = self.client
            .get(&format!("{}/esearch.fcgi", self.eutils_base))?
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw_text": text }));
            return Err(DbSnpError::Api { status: status.as_u16(), body });
        }

        let parsed: ESearchResponse = resp.json().await?;
        let result = parsed.esearchresult;
        let results: Vec<SnpHit> = result
            .idlist
            .iter()
            .take(limit)
            .map(|id| SnpHit { rs_id: format!("rs{id}"), numeric_id: id.clone() })
            .collect();

        info!(term, hits = results.len(), "dbSNP search succeeded");
        Ok(SnpSearchResult {
            success: true,
            search_term: term.to_string(),
            total_count: count_value(&result.count),
            returned_count: result.idlist.len(),
            results,
        })
    }

    /// Clinical annotations attached to a RefSNP record.
    pub async fn clinical_significance(&self, rs_id: &str) -> Result<ClinicalReport, DbSnpError> {
        let record = self.get_snp_by_rs(rs_id).await?;
        let entries = extract_clinical(&record.data);
        info!(rs_id = %record.rs_id, entries = entries.len(), "Extracted clinical annotations");
        Ok(ClinicalReport {
            success: true,
            rs_id: record.rs_id,
            clinical_significance: if entries.is_empty() {
                ClinicalData::Message(NO_CLINICAL_DATA.to_string())
            } else {
                ClinicalData::Entries(entries)
            },
        })
    }
}

/// `rs6311`, `RS6311` and `6311` all become `rs6311`.
pub fn normalize_rs_id(rs_id: &str) -> String {
    let trimmed = rs_id.trim();
    let digits = match trimmed.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("rs") => &trimmed[2..],
        _ => trimmed,
    };
    format!("rs{digits}")
}

fn count_value(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Walk `primary_snapshot_data.allele_annotations[].clinical[]`.
pub fn extract_clinical(data: &Value) -> Vec<ClinicalEntry> {
    let str_field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);

    data.pointer("/primary_snapshot_data/allele_annotations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|annotation| annotation.get("clinical").and_then(Value::as_array))
        .flatten()
        .map(|clinical| {
            let clinical_significance = match clinical
                .get("clinical_significances")
                .or_else(|| clinical.get("clinical_significance"))
            {
                Some(Value::Array(items)) => {
                    items.iter().filter_map(Value::as_str).map(str::to_string).collect()
                }
                Some(Value::String(s)) => vec![s.clone()],
                _ => Vec::new(),
            };
            // Disease names come either as plain strings or as `{ "name": ... }`.
            let disease_names = clinical
                .get("disease_names")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|d| match d {
                    Value::String(s) => Some(s.clone()),
                    other => str_field(other, "name"),
                })
                .collect();
            ClinicalEntry {
                accession: str_field(clinical, "accession_version")
                    .or_else(|| str_field(clinical, "accession")),
                clinical_significance,
                disease_names,
                review_status: str_field(clinical, "review_status"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_rs_id() {
        assert_eq!(normalize_rs_id("rs6311"), "rs6311");
        assert_eq!(normalize_rs_id(" RS6311 "), "rs6311");
        assert_eq!(normalize_rs_id("6311"), "rs6311");
        assert_eq!(normalize_rs_id("r"), "rsr");
    }

    #[test]
    fn test_extract_clinical_handles_both_shapes() {
        let data = json!({
            "primary_snapshot_data": { "allele_annotations": [
                { "clinical": [] },
                { "clinical": [{
                    "accession_version": "RCV000012345.2",
                    "clinical_significances": ["benign", "drug-response"],
                    "disease_names": ["Schizophrenia", { "name": "not provided" }],
                    "review_status": "criteria_provided_single_submitter"
                }]},
                { "clinical": [{ "accession": "RCV9", "clinical_significance": "pathogenic" }] }
            ]}
        });
        let entries = extract_clinical(&data);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].accession.as_deref(), Some("RCV000012345.2"));
        assert_eq!(entries[0].clinical_significance, vec!["benign", "drug-response"]);
        assert_eq!(entries[0].disease_names, vec!["Schizophrenia", "not provided"]);
        assert_eq!(entries[1].clinical_significance, vec!["pathogenic"]);
        assert!(entries[1].disease_names.is_empty());
    }

    #[test]
    fn test_extract_clinical_missing_snapshot() {
        assert!(extract_clinical(&json!({"refsnp_id": "1"})).is_empty());
    }

    #[test]
    fn test_api_error_json_shape() {
        let err = DbSnpError::Api { status: 404, body: json!({"error": {"message": "not found"}}) };
        assert_eq!(
            err.to_json(),
            json!({"success": false, "status_code": 404, "error": {"error": {"message": "not found"}}})
        );
    }
}
