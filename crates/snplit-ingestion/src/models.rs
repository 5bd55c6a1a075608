//! Data models for the literature pipeline.

use serde::{Deserialize, Serialize};

/// Bibliographic record for one PubMed article.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BibliographicRecord {
    pub pmid: String,
    pub title: String,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub abstract_text: Option<String>,
}

impl BibliographicRecord {
    /// Vancouver-style citation, dropping any part the record lacks.
    ///
    /// `Smith J, Doe A. Title. Nature. 2020;12(3):45-67.`
    pub fn citation(&self) -> String {
        let mut out = String::new();
        if !self.authors.is_empty() {
            out.push_str(&self.authors.join(", "));
            out.push_str(". ");
        }
        let title = self.title.trim_end_matches('.');
        if !title.is_empty() {
            out.push_str(title);
            out.push_str(". ");
        }
        if let Some(ref journal) = self.journal {
            out.push_str(journal.trim_end_matches('.'));
            out.push_str(". ");
        }
        if let Some(year) = self.year {
            out.push_str(&year.to_string());
            match (&self.volume, &self.issue) {
                (Some(v), Some(i)) => out.push_str(&format!(";{v}({i})")),
                (Some(v), None) => out.push_str(&format!(";{v}")),
                (None, Some(i)) => out.push_str(&format!(";({i})")),
                (None, None) => {}
            }
            if let Some(ref pages) = self.pages {
                out.push_str(&format!(":{pages}"));
            }
            out.push('.');
        }
        out.trim_end().to_string()
    }

    /// `Journal (Year)` line, with "Unknown" placeholders.
    pub fn venue_line(&self) -> String {
        let journal = self.journal.as_deref().unwrap_or("Unknown journal");
        match self.year {
            Some(y) => format!("{journal} ({y})"),
            None => format!("{journal} (year unknown)"),
        }
    }
}

/// Outcome of full-text location for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FullTextLocation {
    Found { url: String, source: String },
    NotFound { reason: String },
}

/// What the primary locator knows about a PMID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryLookup {
    pub url: Option<String>,
    pub reason: Option<String>,
}

/// One candidate location reported by the open-access aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OaLocation {
    #[serde(default)]
    pub url_for_pdf: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host_type: Option<String>,
}

/// Aggregator response for one DOI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OaRecord {
    #[serde(default)]
    pub is_oa: bool,
    #[serde(default)]
    pub oa_locations: Vec<OaLocation>,
    /// Human-readable explanation some responses carry (e.g. unknown DOI).
    #[serde(default)]
    pub message: Option<String>,
}

/// Markdown rendition of one acquired artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    pub markdown: String,
    pub page_count: usize,
}
