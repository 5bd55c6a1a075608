use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::SnplitError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = "snplit/0.1 (biomedical lookup tools)";

/// Hosts every snplit service client needs.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "eutils.ncbi.nlm.nih.gov",    // PubMed / dbSNP E-utilities
    "api.ncbi.nlm.nih.gov",       // dbSNP Variation Services
    "clinicaltables.nlm.nih.gov", // NLM Clinical Tables SNP search
    "www.ebi.ac.uk",              // Europe PMC REST
    "europepmc.org",              // Europe PMC render endpoint
    "api.unpaywall.org",          // Unpaywall
    "localhost",
    "127.0.0.1",
];

/// An HTTP client that only talks to approved API hosts.
///
/// Service clients (PubMed, Europe PMC, Unpaywall, dbSNP, Clinical Tables) go
/// through this wrapper. Artifact downloads do not: publisher hosts are
/// arbitrary, so the acquirer owns its own redirect-following client.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist, timeout and user agent.
    pub fn new() -> Result<Self, SnplitError> {
        Self::with_settings(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, SnplitError> {
        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SnplitError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SnplitError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    fn check(&self, url: &str) -> Result<(), SnplitError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            tracing::warn!(url, "Blocked request to host outside the allowlist");
            Err(SnplitError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )))
        }
    }
}
