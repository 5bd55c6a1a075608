//! Configuration loading for snplit.
//! Reads snplit.toml from the current directory or path in SNPLIT_CONFIG env var.
//! Every field has a default, so a partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use snplit_ingestion::sources::europepmc::DEFAULT_EPMC_BASE;
use snplit_ingestion::sources::pubmed::DEFAULT_EUTILS_BASE;
use snplit_ingestion::sources::unpaywall::DEFAULT_UNPAYWALL_BASE;
use snplit_ingestion::PipelineSettings;
use snplit_variants::clinical_tables::DEFAULT_CLINICAL_TABLES_BASE;
use snplit_variants::dbsnp::DEFAULT_VARIATION_BASE;
use anyhow::Context;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ncbi: NcbiConfig,
    #[serde(default)]
    pub europepmc: EuropePmcConfig,
    #[serde(default)]
    pub unpaywall: UnpaywallConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_eutils_base")]
    pub eutils_base: String,
    #[serde(default = "default_variation_base")]
    pub variation_base: String,
    #[serde(default = "default_clinical_tables_base")]
    pub clinical_tables_base: String,
}

fn default_eutils_base()          -> String { DEFAULT_EUTILS_BASE.to_string() }
fn default_variation_base()       -> String { DEFAULT_VARIATION_BASE.to_string() }
fn default_clinical_tables_base() -> String { DEFAULT_CLINICAL_TABLES_BASE.to_string() }

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            eutils_base: default_eutils_base(),
            variation_base: default_variation_base(),
            clinical_tables_base: default_clinical_tables_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuropePmcConfig {
    #[serde(default = "default_epmc_base")]
    pub base_url: String,
}

fn default_epmc_base() -> String { DEFAULT_EPMC_BASE.to_string() }

impl Default for EuropePmcConfig {
    fn default() -> Self {
        Self { base_url: default_epmc_base() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpaywallConfig {
    #[serde(default = "default_unpaywall_base")]
    pub base_url: String,
    /// Contact address Unpaywall requires on every request.
    #[serde(default = "default_unpaywall_email")]
    pub email: String,
}

fn default_unpaywall_base()  -> String { DEFAULT_UNPAYWALL_BASE.to_string() }
fn default_unpaywall_email() -> String { "snplit-tools@example.org".to_string() }

impl Default for UnpaywallConfig {
    fn default() -> Self {
        Self {
            base_url: default_unpaywall_base(),
            email: default_unpaywall_email(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_timeout_secs()  -> u64    { 30 }
fn default_user_agent()    -> String { format!("snplit/{}", env!("CARGO_PKG_VERSION")) }
fn default_max_redirects() -> usize  { 10 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

mod tests;

impl Config {
    /// Load configuration from snplit.toml.
    /// Checks SNPLIT_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("SNPLIT_CONFIG")
            .unwrap_or_else(|_| "snplit.toml".to_string());
        Self::load_or_default(Path::new(&path))
    }

    /// Built-in defaults when `path` does not exist. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using built-in defaults. \
                 Copy snplit.example.toml to snplit.toml to customise."
            );
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy snplit.example.toml to snplit.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Apply `NCBI_API_KEY` and `UNPAYWALL_EMAIL` on top of the file values.
    /// Empty variables are ignored.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = var("NCBI_API_KEY") {
            self.ncbi.api_key = Some(key);
        }
        if let Some(email) = var("UNPAYWALL_EMAIL") {
            self.unpaywall.email = email;
        }
    }
}
