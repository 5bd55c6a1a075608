//! Artifact download and validation.
//!
//! The acquirer downloads one URL, checks the status and the declared content
//! type, then persists the payload into an [`EphemeralSlot`]. The returned
//! [`AcquiredArtifact`] owns that slot: dropping or releasing it deletes the
//! file, and any early return drops the slot before the caller sees the error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::{info, instrument, warn};

use crate::ephemeral::{EphemeralDir, EphemeralSlot};
use crate::error::StageError;

const DEFAULT_USER_AGENT: &str = "snplit/0.1 (open access retrieval)";

/// Raw response of the binary fetch transport.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Binary fetch transport. Must follow redirects.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Transport failures are `StageError::Download`; any HTTP status is `Ok`.
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, StageError>;
}

/// reqwest-backed transport. Not sandboxed: publisher hosts are arbitrary.
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, StageError> {
        Self::with_user_agent(timeout, max_redirects, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(
        timeout: Duration,
        max_redirects: usize,
        user_agent: &str,
    ) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .user_agent(user_agent)
            .build()
            .map_err(|e| StageError::Unexpected(format!("failed to build download client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, StageError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::Download(e.to_string()))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StageError::Download(e.to_string()))?
            .to_vec();

        Ok(FetchedResponse { status, content_type, bytes })
    }
}

/// A validated download persisted in its ephemeral slot.
#[derive(Debug)]
pub struct AcquiredArtifact {
    slot: EphemeralSlot,
}

impl AcquiredArtifact {
    pub fn path(&self) -> &Path {
        self.slot.path()
    }

    /// Delete the backing file, logging instead of failing.
    pub fn release(self) {
        let path = self.slot.path().to_path_buf();
        if let Err(e) = self.slot.release() {
            warn!(path = %path.display(), error = %e, "Failed to remove acquired artifact");
        }
    }
}

pub struct DocumentAcquirer {
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl DocumentAcquirer {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { fetcher }
    }

    /// Download `url` for batch item `index` into `dir`.
    #[instrument(skip(self, dir))]
    pub async fn acquire(
        &self,
        url: &str,
        index: usize,
        identifier: &str,
        dir: &EphemeralDir,
    ) -> Result<AcquiredArtifact, StageError> {
        let response = self.fetcher.fetch(url).await?;

        if !(200..300).contains(&response.status) {
            return Err(StageError::Download(format!("HTTP {} from {url}", response.status)));
        }
        if !is_pdf_content_type(&response.content_type) {
            return Err(StageError::ContentType { content_type: response.content_type });
        }

        let slot = dir.slot(index, identifier);
        // On write failure `slot` drops here and removes any partial file.
        slot.write(&response.bytes)
            .await
            .map_err(|e| StageError::Unexpected(format!("failed to persist artifact: {e}")))?;

        info!(bytes = response.bytes.len(), path = %slot.path().display(), "Artifact acquired");
        // The payload lives on disk from here on; `response.bytes` drops now.
        Ok(AcquiredArtifact { slot })
    }
}

pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
}
