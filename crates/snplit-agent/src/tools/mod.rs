//! Tool registration for snplit.
//!
//! Every lookup the binary exposes is a `SnplitTool` registered in a central
//! `ToolRegistry`. The stdio transport resolves requests by tool name.
//!
//! Tool lifecycle:
//!   1. Implement `SnplitTool` for your type.
//!   2. Register with `ToolRegistry::register`.
//!   3. The transport invokes tools via `ToolRegistry::invoke(name, params)`.

pub mod literature_tools;
pub mod variant_tools;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use snplit_common::SandboxClient;
use snplit_ingestion::acquirer::HttpArtifactFetcher;
use snplit_ingestion::pdf_parser::PdfMarkdownConverter;
use snplit_ingestion::sources::europepmc::EuropePmcClient;
use snplit_ingestion::sources::pubmed::PubMedClient;
use snplit_ingestion::sources::unpaywall::UnpaywallClient;
use snplit_ingestion::{BatchOrchestrator, Collaborators};
use snplit_variants::{ClinicalTablesClient, DbSnpClient};

use crate::config::Config;

// ─────────────────────────────────────────────
//  Core trait — implement for each snplit tool
// ─────────────────────────────────────────────

/// A callable lookup tool.
///
/// # Minimal contract
/// - `name()` must be unique across the registry (snake_case, e.g. `"search_snp"`).
/// - `description()` is surfaced in the manifest as the tool docstring.
/// - `parameters_schema()` returns a JSON Schema object for the parameters.
/// - `invoke()` receives JSON params and returns JSON output.
#[async_trait]
pub trait SnplitTool: Send + Sync {
    /// Unique tool name (used as the function call identifier).
    fn name(&self) -> &str;

    /// Short description shown in the manifest.
    fn description(&self) -> &str;

    /// JSON Schema describing the expected input parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool. Returns a JSON result or an anyhow error.
    async fn invoke(&self, params: Value) -> Result<Value>;

    /// Whether this tool reaches hosts outside the API allowlist.
    fn requires_approval(&self) -> bool { false }
}

// ─────────────────────────────────────────────
//  Tool registry
// ─────────────────────────────────────────────

/// Central registry mapping tool names → trait objects.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn SnplitTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool. Panics if the name is already registered.
    pub fn register<T: SnplitTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        assert!(
            !self.tools.contains_key(&name),
            "Duplicate tool name: {name}"
        );
        self.tools.insert(name, Arc::new(tool));
    }

    /// Invoke a registered tool by name.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self.tools.get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {name}"))?;

        tracing::info!(
            tool = name,
            requires_approval = tool.requires_approval(),
            "Invoking tool"
        );

        tool.invoke(params).await
    }

    /// List all registered tools as a JSON object, sorted by name.
    pub fn manifest(&self) -> Value {
        let mut tools: Vec<&Arc<dyn SnplitTool>> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        let tools: Vec<Value> = tools.into_iter().map(|t| {
            serde_json::json!({
                "name": t.name(),
                "description": t.description(),
                "parameters": t.parameters_schema(),
                "requires_approval": t.requires_approval(),
            })
        }).collect();
        serde_json::json!({ "tools": tools })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize { self.tools.len() }
}

impl Default for ToolRegistry {
    fn default() -> Self { Self::new() }
}

// ─────────────────────────────────────────────
//  Parameter helpers
// ─────────────────────────────────────────────

pub(crate) fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

pub(crate) fn string_list_param(params: &Value, key: &str) -> Result<Vec<String>> {
    let items = params[key]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key} (array of strings)"))?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Parameter {key} must contain only strings"))
        })
        .collect()
}

/// Build the default snplit tool registry from configuration.
pub fn build_default_registry(config: &Config) -> Result<ToolRegistry> {
    let timeout = Duration::from_secs(config.http.timeout_secs);
    let client = SandboxClient::with_settings(timeout, &config.http.user_agent)
        .context("building API client")?;

    let tables = Arc::new(
        ClinicalTablesClient::new(client.clone()).with_base_url(&config.ncbi.clinical_tables_base),
    );
    let dbsnp = Arc::new(
        DbSnpClient::new(client.clone(), config.ncbi.api_key.clone())
            .with_variation_base(&config.ncbi.variation_base)
            .with_eutils_base(&config.ncbi.eutils_base),
    );

    let pubmed = Arc::new(
        PubMedClient::new(client.clone(), config.ncbi.api_key.clone())
            .with_base_url(&config.ncbi.eutils_base),
    );
    let fetcher = HttpArtifactFetcher::with_user_agent(
        timeout,
        config.http.max_redirects,
        &config.http.user_agent,
    )
    .context("building download client")?;
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Collaborators {
            resolver: pubmed.clone(),
            metadata: pubmed,
            primary: Arc::new(
                EuropePmcClient::new(client.clone()).with_base_url(&config.europepmc.base_url),
            ),
            aggregator: Arc::new(
                UnpaywallClient::new(client, config.unpaywall.email.clone())
                    .with_base_url(&config.unpaywall.base_url),
            ),
            fetcher: Arc::new(fetcher),
            converter: Arc::new(PdfMarkdownConverter),
        },
        config.pipeline.clone(),
    ));

    let mut reg = ToolRegistry::new();
    reg.register(variant_tools::SearchSnpTool::new(tables.clone()));
    reg.register(variant_tools::GetSnpInfoTool::new(tables));
    reg.register(variant_tools::SnpLookupHelpTool);
    reg.register(variant_tools::GetSnpByRsTool::new(dbsnp.clone()));
    reg.register(variant_tools::SearchSnpsTool::new(dbsnp.clone()));
    reg.register(variant_tools::ClinicalSignificanceTool::new(dbsnp));
    reg.register(literature_tools::GetArticlesTool::new(orchestrator.clone()));
    reg.register(literature_tools::FullTextMarkdownTool::new(orchestrator));
    tracing::info!("ToolRegistry ready with {} tools", reg.len());
    Ok(reg)
}

// ─────────────────────────────────────────────
//  Tests
// ─────────────────────────────────────────────
