//! Shared fixtures for the ingestion integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use snplit_common::SandboxClient;
use snplit_ingestion::acquirer::HttpArtifactFetcher;
use snplit_ingestion::pdf_parser::PdfMarkdownConverter;
use snplit_ingestion::sources::europepmc::EuropePmcClient;
use snplit_ingestion::sources::pubmed::PubMedClient;
use snplit_ingestion::sources::unpaywall::UnpaywallClient;
use snplit_ingestion::{BatchOrchestrator, Collaborators, PipelineSettings};

pub const PUBMED_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">111</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <Issue>3</Issue>
            <PubDate><Year>2020</Year></PubDate>
          </JournalIssue>
          <Title>Human Genetics</Title>
        </Journal>
        <ArticleTitle>HTR2A rs6311 and treatment response.</ArticleTitle>
        <Pagination><MedlinePgn>45-67</MedlinePgn></Pagination>
        <Abstract>
          <AbstractText>Serotonin receptor variants shape drug response.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>Jane</ForeName><Initials>J</Initials></Author>
          <Author><LastName>Doe</LastName><ForeName>Alex</ForeName><Initials>A</Initials></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

/// Minimal one-page PDF with one text line per entry.
pub fn sample_pdf(lines: &[&str]) -> Vec<u8> {
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

/// Production collaborators pointed at one mock server.
///
/// Routes: `/eutils/*` (PubMed), `/epmc/search` (Europe PMC),
/// `/unpaywall/<doi>` (Unpaywall). Downloads go wherever the mocks say.
pub fn orchestrator_for(server_uri: &str, temp_root: &Path) -> BatchOrchestrator {
    let client = SandboxClient::new().unwrap();
    let pubmed = Arc::new(
        PubMedClient::new(client.clone(), None).with_base_url(&format!("{server_uri}/eutils")),
    );
    let europepmc =
        EuropePmcClient::new(client.clone()).with_base_url(&format!("{server_uri}/epmc"));
    let unpaywall = UnpaywallClient::new(client, "tests@example.org")
        .with_base_url(&format!("{server_uri}/unpaywall"));

    BatchOrchestrator::new(
        Collaborators {
            resolver: pubmed.clone(),
            metadata: pubmed,
            primary: Arc::new(europepmc),
            aggregator: Arc::new(unpaywall),
            fetcher: Arc::new(HttpArtifactFetcher::new(Duration::from_secs(10), 5).unwrap()),
            converter: Arc::new(PdfMarkdownConverter),
        },
        PipelineSettings {
            temp_root: Some(temp_root.to_path_buf()),
            ..Default::default()
        },
    )
}
