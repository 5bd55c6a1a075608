//! lopdf-based PDF → markdown conversion.
//!
//! Text is extracted page by page. Each page becomes a `## Page N` block;
//! lines that look like a standard article section heading are promoted to
//! `### Heading` so the output keeps the paper's skeleton.

use std::path::Path;

use lazy_static::lazy_static;
use lopdf::Document as PdfDoc;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::StageError;
use crate::models::ConvertedDocument;

lazy_static! {
    static ref HEADING_RE: Regex = Regex::new(
        r"(?i)^(?:\d+(?:\.\d+)*\.?\s+)?(abstract|introduction|background|methods|materials and methods|results|results and discussion|discussion|conclusions?|references|bibliography)\s*:?$"
    )
    .expect("heading regex is valid");
}

/// Binary-to-text converter seam.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<ConvertedDocument, StageError>;
}

/// Rust-native converter backed by lopdf text extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfMarkdownConverter;

impl DocumentConverter for PdfMarkdownConverter {
    fn convert(&self, path: &Path) -> Result<ConvertedDocument, StageError> {
        let pdf = PdfDoc::load(path)
            .map_err(|e| StageError::Conversion(format!("unreadable PDF: {e}")))?;

        let mut pages: Vec<(u32, String)> = Vec::new();
        for page_num in pdf.get_pages().keys().copied() {
            match pdf.extract_text(&[page_num]) {
                Ok(text) => pages.push((page_num, text)),
                Err(e) => {
                    warn!(page = page_num, error = %e, "Skipping page without extractable text");
                    pages.push((page_num, String::new()));
                }
            }
        }

        if pages.iter().all(|(_, text)| text.trim().is_empty()) {
            return Err(StageError::Conversion("no extractable text".to_string()));
        }

        let markdown = render_markdown(&pages);
        debug!(page_count = pages.len(), chars = markdown.len(), "PDF converted to markdown");

        Ok(ConvertedDocument {
            markdown,
            page_count: pages.len(),
        })
    }
}

/// Detect whether a line is a standard section heading.
fn is_heading(line: &str) -> bool {
    line.len() <= 40 && HEADING_RE.is_match(line)
}

/// Render extracted page text as markdown.
pub fn render_markdown(pages: &[(u32, String)]) -> String {
    let mut out = String::new();

    for (page_num, text) in pages {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("## Page {page_num}\n\n"));

        let mut last_blank = true;
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                if !last_blank {
                    out.push('\n');
                    last_blank = true;
                }
                continue;
            }
            if is_heading(line) {
                if !last_blank {
                    out.push('\n');
                }
                out.push_str(&format!("### {line}\n\n"));
                last_blank = true;
            } else {
                out.push_str(line);
                out.push('\n');
                last_blank = false;
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Minimal one-page PDF, one text line per entry.
    fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), (720 - 20 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_render_promotes_headings() {
        let pages = vec![(1, "Serotonin study\n\n1. Introduction\nrs6311 is common.\nMethods:\nWe sequenced.".to_string())];
        let md = render_markdown(&pages);
        assert!(md.starts_with("## Page 1"));
        assert!(md.contains("### 1. Introduction"));
        assert!(md.contains("### Methods:"));
        assert!(md.contains("rs6311 is common."));
        assert!(!md.contains("### Serotonin study"));
    }

    #[test]
    fn test_long_line_mentioning_results_is_not_a_heading() {
        assert!(!is_heading("Results were consistent across all of the cohorts studied"));
        assert!(is_heading("RESULTS"));
        assert!(is_heading("2.1 Materials and Methods"));
    }

    #[test]
    fn test_convert_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, sample_pdf(&["Hello World", "Abstract", "Variants matter."])).unwrap();

        let first = PdfMarkdownConverter.convert(&path).unwrap();
        let second = PdfMarkdownConverter.convert(&path).unwrap();
        assert!(!first.markdown.is_empty());
        assert!(first.markdown.contains("Hello World"));
        assert_eq!(first, second);
        assert_eq!(first.page_count, 1);
    }

    #[test]
    fn test_garbage_bytes_are_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"<html>definitely not a pdf</html>").unwrap();
        let err = PdfMarkdownConverter.convert(&path).unwrap_err();
        assert_eq!(err.stage(), "convert");
    }
}
