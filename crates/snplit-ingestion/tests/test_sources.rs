//! Service clients against mocked endpoints, plus live smoke tests.
//!
//! Run the live ones with:
//! cargo test --package snplit-ingestion --test test_sources -- --ignored --nocapture

mod common;

use serde_json::json;
use snplit_common::SandboxClient;
use snplit_ingestion::sources::europepmc::EuropePmcClient;
use snplit_ingestion::sources::pubmed::PubMedClient;
use snplit_ingestion::sources::unpaywall::UnpaywallClient;
use snplit_ingestion::sources::{IdResolver, MetadataSource, OaAggregator, PrimaryLocator};
use snplit_ingestion::StageError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::PUBMED_XML;

fn pubmed(server: &MockServer) -> PubMedClient {
    PubMedClient::new(SandboxClient::new().unwrap(), Some("k3y".into()))
        .with_base_url(&server.uri())
}

#[tokio::test]
async fn test_pubmed_resolves_doi_and_fetches_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("api_key", "k3y"))
        .and(query_param("term", "\"10.1/aaa\"[doi]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": { "count": "1", "idlist": ["111"] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PUBMED_XML))
        .mount(&server)
        .await;

    let client = pubmed(&server);
    let pmid = client.resolve("10.1/aaa").await.unwrap();
    assert_eq!(pmid, "111");

    let record = client.fetch(&pmid).await.unwrap();
    assert_eq!(record.title, "HTR2A rs6311 and treatment response.");
    assert_eq!(record.authors, vec!["Smith J", "Doe A"]);
    assert_eq!(record.year, Some(2020));
    assert_eq!(
        record.citation(),
        "Smith J, Doe A. HTR2A rs6311 and treatment response. Human Genetics. 2020;12(3):45-67."
    );
}

#[tokio::test]
async fn test_pubmed_unknown_doi_is_resolution_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": { "count": "0", "idlist": [] }
        })))
        .mount(&server)
        .await;

    let err = pubmed(&server).resolve("10.1/nope").await.unwrap_err();
    assert!(matches!(err, StageError::Resolution(ref m) if m.contains("10.1/nope")));
}

#[tokio::test]
async fn test_pubmed_server_error_is_metadata_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = pubmed(&server).fetch("111").await.unwrap_err();
    assert_eq!(err.stage(), "metadata");
}

#[tokio::test]
async fn test_europepmc_query_and_not_indexed_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", "EXT_ID:111 AND SRC:MED"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultList": { "result": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = EuropePmcClient::new(SandboxClient::new().unwrap()).with_base_url(&server.uri());
    let lookup = client.find("111").await.unwrap();
    assert!(lookup.url.is_none());
    assert_eq!(lookup.reason.as_deref(), Some("PMID 111 not indexed by Europe PMC"));
}

#[tokio::test]
async fn test_unpaywall_404_is_not_found_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/10.1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "HTTP_status_code": 404,
            "error": true,
            "message": "'10.1/missing' is an invalid doi."
        })))
        .mount(&server)
        .await;

    let client = UnpaywallClient::new(SandboxClient::new().unwrap(), "tests@example.org")
        .with_base_url(&server.uri());
    let record = client.lookup("10.1/missing").await.unwrap();
    assert!(!record.is_oa);
    assert_eq!(record.message.as_deref(), Some("'10.1/missing' is an invalid doi."));
}

#[tokio::test]
async fn test_unpaywall_receives_reserved_characters_escaped() {
    let server = MockServer::start().await;
    for (encoded, pdf) in [
        ("/unpaywall/10.1000/a%23b", "https://pub.test/hash.pdf"),
        ("/unpaywall/10.1000/a%3Fb%3Dc", "https://pub.test/query.pdf"),
        ("/unpaywall/10.1000/100%2525", "https://pub.test/percent.pdf"),
    ] {
        Mock::given(method("GET"))
            .and(path(encoded))
            .and(query_param("email", "tests@example.org"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_oa": true,
                "oa_locations": [{ "url_for_pdf": pdf, "host_type": "publisher" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = UnpaywallClient::new(SandboxClient::new().unwrap(), "tests@example.org")
        .with_base_url(&format!("{}/unpaywall", server.uri()));
    for (doi, pdf) in [
        ("10.1000/a#b", "https://pub.test/hash.pdf"),
        ("10.1000/a?b=c", "https://pub.test/query.pdf"),
        ("10.1000/100%25", "https://pub.test/percent.pdf"),
    ] {
        let record = client.lookup(doi).await.unwrap();
        assert_eq!(record.oa_locations[0].url_for_pdf.as_deref(), Some(pdf), "doi {doi}");
    }

    // Only the email parameter reaches the query string.
    for request in server.received_requests().await.unwrap() {
        assert_eq!(request.url.query(), Some("email=tests%40example.org"));
    }
}

#[tokio::test]
async fn test_unpaywall_server_error_is_location_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = UnpaywallClient::new(SandboxClient::new().unwrap(), "tests@example.org")
        .with_base_url(&server.uri());
    let err = client.lookup("10.1/aaa").await.unwrap_err();
    assert!(matches!(err, StageError::Location(ref m) if m.contains("500")));
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_pubmed_resolution() {
    let client = PubMedClient::new(SandboxClient::new().unwrap(), None);
    let pmid = client.resolve("10.1038/nature14539").await.expect("resolution failed");
    let record = client.fetch(&pmid).await.expect("efetch failed");
    println!("PMID {pmid}: {}", record.title);
    assert!(!record.title.is_empty());
}
