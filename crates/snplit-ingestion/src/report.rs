//! Plain-text report fragments.
//!
//! One fragment per input identifier, joined in input order with
//! [`FRAGMENT_SEPARATOR`]. An empty batch renders a fixed sentinel instead of
//! an empty string.

use std::fmt;

use crate::error::StageError;
use crate::models::{BibliographicRecord, FullTextLocation};

pub const FRAGMENT_SEPARATOR: &str = "\n\n==========\n\n";
pub const NO_ARTICLES_SENTINEL: &str = "No articles were processed successfully.";
pub const NO_PDFS_SENTINEL: &str = "No PDFs were processed successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentStatus {
    Complete,
    Partial,
    Failed,
}

impl fmt::Display for FragmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentStatus::Complete => "complete",
            FragmentStatus::Partial  => "partial",
            FragmentStatus::Failed   => "failed",
        })
    }
}

/// Report text for exactly one identifier.
#[derive(Debug, Clone)]
pub struct Fragment {
    heading: &'static str,
    identifier: String,
    status: FragmentStatus,
    lines: Vec<String>,
}

impl Fragment {
    pub fn new(heading: &'static str, identifier: &str) -> Self {
        Self {
            heading,
            identifier: identifier.to_string(),
            status: FragmentStatus::Failed,
            lines: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn status(&self) -> FragmentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: FragmentStatus) {
        self.status = status;
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn error(&mut self, err: &StageError) -> &mut Self {
        self.lines.push(error_line(err));
        self
    }

    pub fn pmid(&mut self, pmid: &str) -> &mut Self {
        self.line(format!("PMID: {pmid}"))
    }

    /// Title, authors, venue, citation and abstract.
    pub fn record(&mut self, rec: &BibliographicRecord) -> &mut Self {
        self.line(format!("Title: {}", rec.title))
            .line(format!("Authors: {}", rec.authors.join("; ")))
            .line(format!("Journal: {}", rec.venue_line()))
            .line(format!("Citation: {}", rec.citation()))
            .blank()
            .line("Abstract:")
            .line(rec.abstract_text.clone().unwrap_or_else(|| "Not available".to_string()))
    }

    /// "Full Text Access" section of the article-info report.
    pub fn access(&mut self, location: &Result<FullTextLocation, StageError>) -> &mut Self {
        self.blank().line("Full Text Access:");
        match location {
            Ok(FullTextLocation::Found { url, .. }) => self.line(format!("URL: {url}")),
            Ok(FullTextLocation::NotFound { reason }) => self
                .line("Full text URL not available")
                .line(format!("Reason: {reason}")),
            Err(e) => self.error(e),
        }
    }

    pub fn render(&self) -> String {
        let mut out = vec![
            self.heading.to_string(),
            format!("DOI: {}", self.identifier),
            format!("Status: {}", self.status),
        ];
        out.extend(self.lines.iter().cloned());
        out.join("\n")
    }
}

/// Map a stage failure to its report line.
pub fn error_line(err: &StageError) -> String {
    format!("Error ({}): {}", err.stage(), err)
}

/// Join fragments in order, or return `sentinel` for an empty batch.
pub fn join_fragments(fragments: &[Fragment], sentinel: &str) -> String {
    if fragments.is_empty() {
        return sentinel.to_string();
    }
    fragments
        .iter()
        .map(Fragment::render)
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_batch_is_sentinel() {
        assert_eq!(join_fragments(&[], NO_PDFS_SENTINEL), NO_PDFS_SENTINEL);
    }

    #[test]
    fn test_fragment_render_layout() {
        let mut f = Fragment::new("Article Information:", "10.1/aaa");
        f.pmid("42").error(&StageError::Metadata("timeout".into()));
        assert_eq!(
            f.render(),
            "Article Information:\nDOI: 10.1/aaa\nStatus: failed\nPMID: 42\n\
             Error (metadata): Could not retrieve article data - timeout"
        );
    }

    #[test]
    fn test_join_preserves_order() {
        let a = Fragment::new("H:", "first");
        let b = Fragment::new("H:", "second");
        let joined = join_fragments(&[a, b], NO_PDFS_SENTINEL);
        let parts: Vec<&str> = joined.split(FRAGMENT_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("DOI: first"));
        assert!(parts[1].contains("DOI: second"));
    }

    #[test]
    fn test_access_not_found_lists_reason() {
        let mut f = Fragment::new("H:", "x");
        f.access(&Ok(FullTextLocation::NotFound { reason: "closed".into() }));
        let text = f.render();
        assert!(text.contains("Full text URL not available\nReason: closed"));
    }
}
