//! Literature tools: article information and full-text markdown for DOIs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use snplit_ingestion::BatchOrchestrator;

use super::{string_list_param, SnplitTool};

fn dois_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "dois": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Digital Object Identifiers, processed in order"
            }
        },
        "required": ["dois"]
    })
}

// ─────────────────────────────────────────────
//  Article information
// ─────────────────────────────────────────────

pub struct GetArticlesTool {
    orchestrator: Arc<BatchOrchestrator>,
}

impl GetArticlesTool {
    pub fn new(orchestrator: Arc<BatchOrchestrator>) -> Self { Self { orchestrator } }
}

#[async_trait]
impl SnplitTool for GetArticlesTool {
    fn name(&self) -> &str { "get_articles" }

    fn description(&self) -> &str {
        "For each DOI: PubMed metadata (title, authors, journal, citation), the full \
         abstract, and a full-text URL when one is openly available."
    }

    fn parameters_schema(&self) -> Value { dois_schema() }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let dois = string_list_param(&params, "dois")?;
        tracing::info!(tool = "get_articles", n = dois.len(), "Describing articles");
        Ok(Value::String(self.orchestrator.describe_articles(&dois).await))
    }
}

// ─────────────────────────────────────────────
//  Full-text markdown
// ─────────────────────────────────────────────

pub struct FullTextMarkdownTool {
    orchestrator: Arc<BatchOrchestrator>,
}

impl FullTextMarkdownTool {
    pub fn new(orchestrator: Arc<BatchOrchestrator>) -> Self { Self { orchestrator } }
}

#[async_trait]
impl SnplitTool for FullTextMarkdownTool {
    fn name(&self) -> &str { "get_full_text_markdown" }

    fn description(&self) -> &str {
        "For each DOI: locate an open-access PDF, download it to temporary storage, \
         and return its text converted to markdown alongside the article metadata. \
         Temporary files are removed before the tool returns."
    }

    fn parameters_schema(&self) -> Value { dois_schema() }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let dois = string_list_param(&params, "dois")?;
        tracing::info!(tool = "get_full_text_markdown", n = dois.len(), "Retrieving full text");
        Ok(Value::String(self.orchestrator.run(&dois).await))
    }

    // Downloads from whichever publisher host the locators return.
    fn requires_approval(&self) -> bool { true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tools::build_default_registry;
    use snplit_ingestion::report::{NO_ARTICLES_SENTINEL, NO_PDFS_SENTINEL};

    #[tokio::test]
    async fn test_empty_doi_lists_return_sentinels() {
        let reg = build_default_registry(&Config::default()).unwrap();
        let articles = reg.invoke("get_articles", serde_json::json!({ "dois": [] })).await.unwrap();
        assert_eq!(articles, NO_ARTICLES_SENTINEL);
        let pdfs = reg
            .invoke("get_full_text_markdown", serde_json::json!({ "dois": [] }))
            .await
            .unwrap();
        assert_eq!(pdfs, NO_PDFS_SENTINEL);
    }

    #[tokio::test]
    async fn test_missing_dois_is_an_error() {
        let reg = build_default_registry(&Config::default()).unwrap();
        let err = reg.invoke("get_articles", serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("dois"));
    }
}
