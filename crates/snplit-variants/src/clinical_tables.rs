//! NLM Clinical Tables SNP search.
//!
//! Endpoint: https://clinicaltables.nlm.nih.gov/api/snps/v3/search
//!
//! The API answers with a positional JSON array:
//! `[total, [codes], extra, [[field, ...], ...]]`, one inner row per SNP in
//! the order of the requested display fields.

use serde_json::Value;
use snplit_common::sandbox::SandboxClient as Client;
use snplit_common::SnplitError;
use tracing::{debug, error, info, instrument};

pub const DEFAULT_CLINICAL_TABLES_BASE: &str = "https://clinicaltables.nlm.nih.gov/api/snps/v3";

/// Display fields requested from the API, in row order.
pub const DISPLAY_FIELDS: [&str; 11] = [
    "rsNum",
    "38.chr", "38.pos", "38.alleles", "38.gene", "38.assembly",
    "37.chr", "37.pos", "37.alleles", "37.gene", "37.assembly",
];

const RESULT_SEPARATOR: &str = "\n\n==========\n\n";

pub const SNP_LOOKUP_HELP: &str = "\
To look up SNP information, you can:
1. Search for SNPs using the search_snp tool with a query
2. Get specific SNP details using the get_snp_info tool with an rsID

The information returned includes:
- SNP ID (rsNum)
- GRCh38 Assembly data:
  * Chromosome location
  * Position
  * Alleles
  * Associated gene
- GRCh37 Assembly data:
  * Chromosome location
  * Position
  * Alleles
  * Associated gene

Examples:
- search_snp(\"rs1234\")
- get_snp_info(\"rs1234\")";

/// Parsed search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnpTable {
    pub total: u64,
    pub rows: Vec<Vec<String>>,
}

pub struct ClinicalTablesClient {
    client: Client,
    base_url: String,
}

impl ClinicalTablesClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_CLINICAL_TABLES_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, query: &str) -> Result<SnpTable, SnplitError> {
        let fields = DISPLAY_FIELDS.join(",");
        let body: Value = self.client
            .get(&format!("{}/search", self.base_url))?
            .query(&[("terms", query), ("df", fields.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let table = parse_table(&body);
        debug!(total = table.total, rows = table.rows.len(), "Clinical Tables search returned");
        Ok(table)
    }

    /// Text report for every SNP matching `query`.
    pub async fn search_snp(&self, query: &str) -> String {
        match self.fetch(query).await {
            Ok(table) if table.rows.is_empty() => {
                format!("No SNP information found for query: {query}")
            }
            Ok(table) => {
                info!(query, shown = table.rows.len(), "SNP search succeeded");
                let blocks: Vec<String> = table.rows.iter().map(|r| format_snp_row(r)).collect();
                format!(
                    "Found {} matching SNPs. Showing first {}:\n\n{}",
                    table.total,
                    blocks.len(),
                    blocks.join(RESULT_SEPARATOR)
                )
            }
            Err(e) => {
                error!(query, error = %e, "SNP search failed");
                format!("Error searching for SNP: {e}")
            }
        }
    }

    /// Text report for the first SNP matching `rsid`.
    pub async fn snp_info(&self, rsid: &str) -> String {
        match self.fetch(rsid).await {
            Ok(table) => match table.rows.first() {
                Some(row) => format_snp_row(row),
                None => format!("No information found for SNP: {rsid}"),
            },
            Err(e) => {
                error!(rsid, error = %e, "SNP lookup failed");
                format!("Error retrieving SNP information: {e}")
            }
        }
    }
}

fn parse_table(body: &Value) -> SnpTable {
    let Some(parts) = body.as_array().filter(|p| p.len() >= 4) else {
        return SnpTable::default();
    };
    let rows = parts[3]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();
    SnpTable {
        total: parts[0].as_u64().unwrap_or(0),
        rows,
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render one result row as a two-assembly block.
pub fn format_snp_row(row: &[String]) -> String {
    if row.len() != DISPLAY_FIELDS.len() {
        let id = row.first().map(String::as_str).unwrap_or("");
        return format!("SNP ID: {id} (incomplete data)");
    }

    let assembly = |name: &str, chr: &str, pos: &str, alleles: &str, gene: &str| {
        let gene = if gene.is_empty() { "Not specified" } else { gene };
        format!(
            "{name} Assembly:\n  Chromosome: {chr}\n  Position: {pos}\n  Alleles: {alleles}\n  Gene: {gene}"
        )
    };

    [
        format!("SNP ID: {}", row[0]),
        String::new(),
        assembly("GRCh38", &row[1], &row[2], &row[3], &row[4]),
        String::new(),
        assembly("GRCh37", &row[6], &row[7], &row[8], &row[9]),
    ]
    .join("\n")
}
