//! Batch orchestration.
//!
//! Drives each identifier through the pipeline, strictly in input order:
//!   1. Resolve DOI → PMID
//!   2. Fetch bibliographic metadata
//!   3. Locate full text (primary locator, then OA aggregator)
//!   4. Acquire the PDF into the batch's ephemeral directory
//!   5. Convert it to markdown on the blocking pool
//!
//! A stage failure ends that item with an error line in its fragment; the
//! batch always moves on. A panic inside an item is caught at the item
//! boundary and reported as an unexpected error. Every item yields exactly
//! one fragment.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::acquirer::{AcquiredArtifact, ArtifactFetcher, DocumentAcquirer};
use crate::ephemeral::{EphemeralDir, DEFAULT_DIR_PREFIX};
use crate::error::StageError;
use crate::locator::FullTextLocator;
use crate::models::{ConvertedDocument, FullTextLocation};
use crate::pdf_parser::DocumentConverter;
use crate::report::{
    join_fragments, Fragment, FragmentStatus, NO_ARTICLES_SENTINEL, NO_PDFS_SENTINEL,
};
use crate::sources::{IdResolver, MetadataSource, OaAggregator, PrimaryLocator};

pub const ARTICLE_HEADING: &str = "Article Information:";
pub const PDF_HEADING: &str = "PDF Processing Results:";

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Name prefix of each batch's ephemeral directory.
    #[serde(default = "default_temp_dir_prefix")]
    pub temp_dir_prefix: String,
    /// Parent of the ephemeral directories. System temp dir when unset.
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

fn default_temp_dir_prefix() -> String { DEFAULT_DIR_PREFIX.to_string() }

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir_prefix: default_temp_dir_prefix(),
            temp_root: None,
        }
    }
}

// ── Collaborators ─────────────────────────────────────────────────────────────

/// External services the orchestrator is built from.
pub struct Collaborators {
    pub resolver: Arc<dyn IdResolver>,
    pub metadata: Arc<dyn MetadataSource>,
    pub primary: Arc<dyn PrimaryLocator>,
    pub aggregator: Arc<dyn OaAggregator>,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub converter: Arc<dyn DocumentConverter>,
}

// ── Result ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub fragments: Vec<Fragment>,
    pub duration_ms: u64,
    sentinel: &'static str,
}

impl BatchReport {
    pub fn render(&self) -> String {
        join_fragments(&self.fragments, self.sentinel)
    }

    pub fn count(&self, status: FragmentStatus) -> usize {
        self.fragments.iter().filter(|f| f.status() == status).count()
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct BatchOrchestrator {
    resolver: Arc<dyn IdResolver>,
    metadata: Arc<dyn MetadataSource>,
    locator: FullTextLocator,
    acquirer: DocumentAcquirer,
    converter: Arc<dyn DocumentConverter>,
    settings: PipelineSettings,
}

impl BatchOrchestrator {
    pub fn new(services: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            resolver: services.resolver,
            metadata: services.metadata,
            locator: FullTextLocator::new(services.primary, services.aggregator),
            acquirer: DocumentAcquirer::new(services.fetcher),
            converter: services.converter,
            settings,
        }
    }

    /// Full-text batch: one markdown fragment per identifier.
    pub async fn run(&self, identifiers: &[String]) -> String {
        self.run_detailed(identifiers).await.render()
    }

    /// Article-info batch: metadata plus full-text URL, no download.
    pub async fn describe_articles(&self, identifiers: &[String]) -> String {
        self.describe_articles_detailed(identifiers).await.render()
    }

    #[instrument(skip_all, fields(n = identifiers.len()))]
    pub async fn run_detailed(&self, identifiers: &[String]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let t0 = Instant::now();
        info!(%batch_id, "Starting full-text batch");

        let mut fragments = Vec::with_capacity(identifiers.len());
        if !identifiers.is_empty() {
            let dir = match EphemeralDir::create(
                &self.settings.temp_dir_prefix,
                self.settings.temp_root.as_deref(),
            ) {
                Ok(dir) => Some(dir),
                Err(e) => {
                    error!(error = %e, "Could not create ephemeral directory");
                    None
                }
            };

            for (index, identifier) in identifiers.iter().enumerate() {
                let item = AssertUnwindSafe(self.process_document(index, identifier, dir.as_ref()))
                    .catch_unwind()
                    .await;
                fragments.push(item.unwrap_or_else(|panic| {
                    unexpected_fragment(PDF_HEADING, identifier, panic)
                }));
            }

            if let Some(dir) = dir {
                dir.close();
            }
        }

        finish(batch_id, t0, fragments, NO_PDFS_SENTINEL)
    }

    #[instrument(skip_all, fields(n = identifiers.len()))]
    pub async fn describe_articles_detailed(&self, identifiers: &[String]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let t0 = Instant::now();
        info!(%batch_id, "Starting article-info batch");

        let mut fragments = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let item = AssertUnwindSafe(self.describe_article(identifier))
                .catch_unwind()
                .await;
            fragments.push(item.unwrap_or_else(|panic| {
                unexpected_fragment(ARTICLE_HEADING, identifier, panic)
            }));
        }

        finish(batch_id, t0, fragments, NO_ARTICLES_SENTINEL)
    }

    async fn describe_article(&self, identifier: &str) -> Fragment {
        let mut fragment = Fragment::new(ARTICLE_HEADING, identifier);
        info!(doi = %identifier, "Processing article");

        let pmid = match self.resolver.resolve(identifier).await {
            Ok(pmid) => pmid,
            Err(e) => {
                warn!(doi = %identifier, error = %e, "Failed to get PMID");
                fragment.error(&e);
                return fragment;
            }
        };
        fragment.pmid(&pmid);

        let record = match self.metadata.fetch(&pmid).await {
            Ok(record) => record,
            Err(e) => {
                warn!(%pmid, error = %e, "Failed to fetch article data");
                fragment.error(&e);
                return fragment;
            }
        };
        fragment.record(&record);

        let location = self.locator.locate(&pmid, identifier).await;
        if let Err(ref e) = location {
            warn!(%pmid, error = %e, "Failed to find full text");
        }
        fragment.access(&location);
        fragment.set_status(match location {
            Ok(FullTextLocation::Found { .. }) => FragmentStatus::Complete,
            _ => FragmentStatus::Partial,
        });
        fragment
    }

    async fn process_document(
        &self,
        index: usize,
        identifier: &str,
        dir: Option<&EphemeralDir>,
    ) -> Fragment {
        let mut fragment = Fragment::new(PDF_HEADING, identifier);
        info!(doi = %identifier, "Processing DOI");

        // RESOLVE
        let pmid = match self.resolver.resolve(identifier).await {
            Ok(pmid) => pmid,
            Err(e) => {
                warn!(doi = %identifier, error = %e, "Failed to get PMID");
                fragment.error(&e);
                return fragment;
            }
        };
        fragment.pmid(&pmid);
        // From here on something was learned, so the floor is "partial".
        fragment.set_status(FragmentStatus::Partial);

        // METADATA (non-fatal on this path)
        let metadata_ok = match self.metadata.fetch(&pmid).await {
            Ok(record) => {
                fragment.record(&record);
                true
            }
            Err(e) => {
                warn!(%pmid, error = %e, "Failed to fetch article data, continuing with PMID only");
                fragment.error(&e);
                false
            }
        };

        // LOCATE
        fragment.blank();
        let (url, source) = match self.locator.locate(&pmid, identifier).await {
            Ok(FullTextLocation::Found { url, source }) => (url, source),
            Ok(FullTextLocation::NotFound { reason }) => {
                info!(doi = %identifier, %reason, "No full text available");
                fragment.line("Full text URL not available").line(format!("Reason: {reason}"));
                return fragment;
            }
            Err(e) => {
                warn!(doi = %identifier, error = %e, "Full-text location failed");
                fragment.error(&e);
                return fragment;
            }
        };
        fragment
            .line(format!("Open Access Source: {source}"))
            .line(format!("URL: {url}"));

        // ACQUIRE
        let Some(dir) = dir else {
            fragment.error(&StageError::Unexpected("ephemeral storage unavailable".to_string()));
            return fragment;
        };
        let artifact = match self.acquirer.acquire(&url, index, identifier, dir).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(doi = %identifier, error = %e, "Failed to acquire PDF");
                fragment.error(&e);
                return fragment;
            }
        };

        // CONVERT, then release the slot whatever the outcome
        let converted = self.convert(&artifact).await;
        artifact.release();

        match converted {
            Ok(doc) => {
                info!(doi = %identifier, pages = doc.page_count, "PDF converted");
                fragment.blank().line("Markdown Content:").line(doc.markdown);
                if metadata_ok {
                    fragment.set_status(FragmentStatus::Complete);
                }
            }
            Err(e) => {
                warn!(doi = %identifier, error = %e, "Failed to convert PDF");
                fragment.error(&e);
            }
        }
        fragment
    }

    async fn convert(&self, artifact: &AcquiredArtifact) -> Result<ConvertedDocument, StageError> {
        let converter = Arc::clone(&self.converter);
        let path = artifact.path().to_path_buf();
        tokio::task::spawn_blocking(move || converter.convert(&path))
            .await
            .map_err(|e| StageError::Unexpected(format!("conversion task failed: {e}")))?
    }
}

fn finish(
    batch_id: Uuid,
    t0: Instant,
    fragments: Vec<Fragment>,
    sentinel: &'static str,
) -> BatchReport {
    let report = BatchReport {
        batch_id,
        fragments,
        duration_ms: t0.elapsed().as_millis() as u64,
        sentinel,
    };
    info!(
        %batch_id,
        items       = report.fragments.len(),
        complete    = report.count(FragmentStatus::Complete),
        partial     = report.count(FragmentStatus::Partial),
        failed      = report.count(FragmentStatus::Failed),
        duration_ms = report.duration_ms,
        "Batch complete"
    );
    report
}

fn unexpected_fragment(heading: &'static str, identifier: &str, panic: Box<dyn Any + Send>) -> Fragment {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string());
    error!(doi = %identifier, %detail, "Unexpected error processing DOI");

    let mut fragment = Fragment::new(heading, identifier);
    fragment.error(&StageError::Unexpected(detail));
    fragment
}

// ── Tests ─────────────────────────────────────────────────────────────────────
