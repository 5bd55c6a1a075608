//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: DOI → PMID (`"<doi>"[doi]` term)
//!   efetch:  PMID → article XML

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use snplit_common::sandbox::SandboxClient as Client;
use snplit_common::SnplitError;
use tracing::{debug, instrument, warn};

use super::{IdResolver, MetadataSource};
use crate::error::StageError;
use crate::models::BibliographicRecord;

pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

impl PubMedClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_EUTILS_BASE.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return matching PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, term: &str) -> Result<Vec<String>, SnplitError> {
        let mut params = self.base_params();
        params.push(("term", term.to_string()));
        params.push(("retmode", "json".to_string()));

        let resp: ESearchResponse = self.client
            .get(&format!("{}/esearch.fcgi", self.base_url))?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.esearchresult.error {
            warn!(%err, "PubMed esearch reported an error");
        }
        debug!(ids = ?resp.esearchresult.idlist, "PubMed esearch returned PMIDs");
        Ok(resp.esearchresult.idlist)
    }

    /// Fetch PubMed XML for one PMID.
    #[instrument(skip(self))]
    async fn efetch(&self, pmid: &str) -> Result<String, SnplitError> {
        let mut params = self.base_params();
        params.push(("id", pmid.to_string()));
        params.push(("rettype", "abstract".to_string()));
        params.push(("retmode", "xml".to_string()));

        let xml = self.client
            .get(&format!("{}/efetch.fcgi", self.base_url))?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(xml)
    }
}

#[async_trait]
impl IdResolver for PubMedClient {
    async fn resolve(&self, identifier: &str) -> Result<String, StageError> {
        let term = format!("\"{}\"[doi]", identifier.trim());
        let ids = self
            .esearch(&term)
            .await
            .map_err(|e| StageError::Resolution(e.to_string()))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StageError::Resolution(format!("no PubMed record for {identifier}")))
    }
}

#[async_trait]
impl MetadataSource for PubMedClient {
    async fn fetch(&self, pmid: &str) -> Result<BibliographicRecord, StageError> {
        let xml = self
            .efetch(pmid)
            .await
            .map_err(|e| StageError::Metadata(e.to_string()))?;
        let records = parse_pubmed_xml(&xml).map_err(|e| StageError::Metadata(e.to_string()))?;

        let mut records = records.into_iter();
        let first = records.next();
        records
            .find(|r| r.pmid == pmid)
            .or(first)
            .ok_or_else(|| StageError::Metadata(format!("no article data returned for PMID {pmid}")))
    }
}

// ── XML parsing ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct AuthorParts {
    last: String,
    fore: String,
    initials: String,
    collective: String,
}

impl AuthorParts {
    fn display(&self) -> Option<String> {
        let collective = self.collective.trim();
        if !collective.is_empty() {
            return Some(collective.to_string());
        }
        let last = self.last.trim();
        if last.is_empty() {
            return None;
        }
        let given = if self.initials.trim().is_empty() { self.fore.trim() } else { self.initials.trim() };
        Some(if given.is_empty() { last.to_string() } else { format!("{last} {given}") })
    }
}

fn within(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.iter().any(|n| n.as_slice() == name)
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn abstract_label(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("Label")
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse PubMed efetch XML (`<PubmedArticleSet><PubmedArticle>…`) into records.
///
/// Articles without a title are skipped. Inline markup inside titles and
/// abstracts (`<i>`, `<sup>`, …) is flattened into the surrounding text.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<BibliographicRecord>, SnplitError> {
    let mut records = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<BibliographicRecord> = None;
    let mut abstract_parts: Vec<(Option<String>, String)> = Vec::new();
    let mut author = AuthorParts::default();
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| SnplitError::Xml(e.to_string()))?
        {
            Event::Start(ref e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => {
                        current = Some(BibliographicRecord::default());
                        abstract_parts.clear();
                    }
                    b"AbstractText" => abstract_parts.push((abstract_label(e), String::new())),
                    b"Author" => author = AuthorParts::default(),
                    _ => {}
                }
                stack.push(name);
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|e| SnplitError::Xml(e.to_string()))?;
                if let Some(rec) = current.as_mut() {
                    apply_text(rec, &stack, &mut abstract_parts, &mut author, &text);
                }
            }
            Event::End(ref e) => {
                match e.name().as_ref() {
                    b"Author" if within(&stack, b"AuthorList") => {
                        if let (Some(rec), Some(name)) = (current.as_mut(), author.display()) {
                            rec.authors.push(name);
                        }
                    }
                    b"PubmedArticle" => {
                        if let Some(mut rec) = current.take() {
                            rec.title = collapse_ws(&rec.title);
                            rec.abstract_text = join_abstract(&abstract_parts);
                            if rec.title.is_empty() {
                                warn!(pmid = %rec.pmid, "Skipping PubMed article with empty title");
                            } else {
                                records.push(rec);
                            }
                        }
                    }
                    _ => {}
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

/// Route one text node into the record field its element path names.
fn apply_text(
    rec: &mut BibliographicRecord,
    stack: &[Vec<u8>],
    abstract_parts: &mut [(Option<String>, String)],
    author: &mut AuthorParts,
    text: &str,
) {
    let Some(last) = stack.last() else {
        return;
    };
    if within(stack, b"ArticleTitle") {
        rec.title.push_str(text);
    } else if within(stack, b"AbstractText") {
        if let Some((_, body)) = abstract_parts.last_mut() {
            body.push_str(text);
        }
    } else {
        match last.as_slice() {
            b"PMID" if rec.pmid.is_empty() && within(stack, b"MedlineCitation") => {
                rec.pmid = text.trim().to_string();
            }
            b"LastName" if within(stack, b"Author") => author.last.push_str(text),
            b"ForeName" if within(stack, b"Author") => author.fore.push_str(text),
            b"Initials" if within(stack, b"Author") => author.initials.push_str(text),
            b"CollectiveName" if within(stack, b"Author") => author.collective.push_str(text),
            b"Title" if within(stack, b"Journal") => {
                rec.journal = Some(text.trim().to_string());
            }
            b"Volume" if within(stack, b"JournalIssue") => {
                rec.volume = Some(text.trim().to_string());
            }
            b"Issue" if within(stack, b"JournalIssue") => {
                rec.issue = Some(text.trim().to_string());
            }
            b"Year" if within(stack, b"PubDate") => {
                rec.year = text.trim().parse().ok();
            }
            b"MedlineDate" if within(stack, b"PubDate") && rec.year.is_none() => {
                rec.year = text.trim().get(..4).and_then(|y| y.parse().ok());
            }
            b"MedlinePgn" => {
                let pages = text.trim();
                if !pages.is_empty() {
                    rec.pages = Some(pages.to_string());
                }
            }
            _ => {}
        }
    }
}

fn join_abstract(parts: &[(Option<String>, String)]) -> Option<String> {
    let joined: Vec<String> = parts
        .iter()
        .filter_map(|(label, body)| {
            let body = collapse_ws(body);
            if body.is_empty() {
                return None;
            }
            Some(match label {
                Some(l) if !l.is_empty() => format!("{l}: {body}"),
                _ => body,
            })
        })
        .collect();
    if joined.is_empty() { None } else { Some(joined.join("\n\n")) }
}
