//! Variant tools: Clinical Tables SNP search and dbSNP lookups.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use snplit_variants::clinical_tables::SNP_LOOKUP_HELP;
use snplit_variants::{ClinicalTablesClient, DbSnpClient};

use super::{str_param, SnplitTool};

const DEFAULT_SEARCH_LIMIT: u64 = 10;

fn rs_id_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "rs_id": { "type": "string", "description": "rsID, e.g. rs6311 (the rs prefix is optional)" }
        },
        "required": ["rs_id"]
    })
}

// ─────────────────────────────────────────────
//  Clinical Tables text tools
// ─────────────────────────────────────────────

pub struct SearchSnpTool {
    tables: Arc<ClinicalTablesClient>,
}

impl SearchSnpTool {
    pub fn new(tables: Arc<ClinicalTablesClient>) -> Self { Self { tables } }
}

#[async_trait]
impl SnplitTool for SearchSnpTool {
    fn name(&self) -> &str { "search_snp" }

    fn description(&self) -> &str {
        "Search for SNP information by rsID or genomic location. Returns GRCh38 and \
         GRCh37 chromosome, position, alleles and gene for every match."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "SNP identifier (e.g. rs1234), gene or location" }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let query = str_param(&params, "query")?;
        Ok(Value::String(self.tables.search_snp(query).await))
    }
}

pub struct GetSnpInfoTool {
    tables: Arc<ClinicalTablesClient>,
}

impl GetSnpInfoTool {
    pub fn new(tables: Arc<ClinicalTablesClient>) -> Self { Self { tables } }
}

#[async_trait]
impl SnplitTool for GetSnpInfoTool {
    fn name(&self) -> &str { "get_snp_info" }

    fn description(&self) -> &str {
        "Detailed information about one SNP by rsID, from both genome assemblies."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "rsid": { "type": "string", "description": "SNP identifier, e.g. rs1234" }
            },
            "required": ["rsid"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let rsid = str_param(&params, "rsid")?;
        Ok(Value::String(self.tables.snp_info(rsid).await))
    }
}

pub struct SnpLookupHelpTool;

#[async_trait]
impl SnplitTool for SnpLookupHelpTool {
    fn name(&self) -> &str { "snp_lookup_help" }

    fn description(&self) -> &str { "How to use the SNP lookup tools." }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _params: Value) -> Result<Value> {
        Ok(Value::String(SNP_LOOKUP_HELP.to_string()))
    }
}

// ─────────────────────────────────────────────
//  dbSNP JSON tools
// ─────────────────────────────────────────────

// API failures are part of the tool result (`success: false`), not tool errors.

pub struct GetSnpByRsTool {
    dbsnp: Arc<DbSnpClient>,
}

impl GetSnpByRsTool {
    pub fn new(dbsnp: Arc<DbSnpClient>) -> Self { Self { dbsnp } }
}

#[async_trait]
impl SnplitTool for GetSnpByRsTool {
    fn name(&self) -> &str { "get_snp_by_rs" }

    fn description(&self) -> &str {
        "Retrieve the full dbSNP RefSNP record for an rsID."
    }

    fn parameters_schema(&self) -> Value { rs_id_schema() }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let rs_id = str_param(&params, "rs_id")?;
        match self.dbsnp.get_snp_by_rs(rs_id).await {
            Ok(record) => Ok(serde_json::to_value(record)?),
            Err(e) => Ok(e.to_json()),
        }
    }
}

pub struct SearchSnpsTool {
    dbsnp: Arc<DbSnpClient>,
}

impl SearchSnpsTool {
    pub fn new(dbsnp: Arc<DbSnpClient>) -> Self { Self { dbsnp } }
}

#[async_trait]
impl SnplitTool for SearchSnpsTool {
    fn name(&self) -> &str { "search_snps" }

    fn description(&self) -> &str {
        "Search dbSNP with an E-utilities term (gene, trait or rsID) and list matching rsIDs."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "term":  { "type": "string", "description": "Search term, e.g. BRCA1" },
                "limit": { "type": "integer", "default": DEFAULT_SEARCH_LIMIT, "minimum": 1 }
            },
            "required": ["term"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let term = str_param(&params, "term")?;
        let limit = params["limit"].as_u64().unwrap_or(DEFAULT_SEARCH_LIMIT).max(1) as usize;
        match self.dbsnp.search_snps(term, limit).await {
            Ok(result) => Ok(serde_json::to_value(result)?),
            Err(e) => Ok(e.to_json()),
        }
    }
}

pub struct ClinicalSignificanceTool {
    dbsnp: Arc<DbSnpClient>,
}

impl ClinicalSignificanceTool {
    pub fn new(dbsnp: Arc<DbSnpClient>) -> Self { Self { dbsnp } }
}

#[async_trait]
impl SnplitTool for ClinicalSignificanceTool {
    fn name(&self) -> &str { "get_snp_clinical_significance" }

    fn description(&self) -> &str {
        "Clinical significance annotations (ClinVar accessions, significance, \
         diseases, review status) attached to a dbSNP record."
    }

    fn parameters_schema(&self) -> Value { rs_id_schema() }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let rs_id = str_param(&params, "rs_id")?;
        match self.dbsnp.clinical_significance(rs_id).await {
            Ok(report) => Ok(serde_json::to_value(report)?),
            Err(e) => Ok(e.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_help_tool_mentions_both_assemblies() {
        let out = SnpLookupHelpTool.invoke(Value::Null).await.unwrap();
        let text = out.as_str().unwrap();
        assert!(text.contains("GRCh38"));
        assert!(text.contains("GRCh37"));
    }

    #[test]
    fn test_rs_id_schema_requires_rs_id() {
        assert_eq!(rs_id_schema()["required"][0], "rs_id");
    }
}
