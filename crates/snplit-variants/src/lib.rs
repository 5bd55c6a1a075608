//! snplit-variants — Genomic variant lookups.
//!
//! - NLM Clinical Tables SNP search, rendered as plain text (`clinical_tables`)
//! - dbSNP RefSNP records, SNP esearch and clinical significance (`dbsnp`)

pub mod clinical_tables;
pub mod dbsnp;

pub use clinical_tables::ClinicalTablesClient;
pub use dbsnp::{normalize_rs_id, DbSnpClient, DbSnpError};
