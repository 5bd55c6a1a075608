//! Ephemeral storage for downloaded artifacts.
//!
//! One [`EphemeralDir`] per batch, one [`EphemeralSlot`] per item. A slot
//! deletes its file when released or dropped, so an unwinding panic cleans up
//! too. The directory is removed when the batch closes it; failure to remove
//! it is logged and otherwise ignored.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

pub const DEFAULT_DIR_PREFIX: &str = "pdf_processing_";

/// Per-batch scratch directory with a unique, randomised name.
#[derive(Debug)]
pub struct EphemeralDir {
    inner: TempDir,
}

impl EphemeralDir {
    /// Create a fresh directory under `root`, or the system temp dir.
    pub fn create(prefix: &str, root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let inner = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!(path = %inner.path().display(), "Created ephemeral batch directory");
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Reserve the slot for item `index` of the batch.
    ///
    /// The file name is derived from the identifier with path-unsafe
    /// characters replaced; the index prefix keeps duplicate identifiers in
    /// one batch apart.
    pub fn slot(&self, index: usize, identifier: &str) -> EphemeralSlot {
        let name = format!("{index:04}_{}.pdf", safe_file_stem(identifier));
        EphemeralSlot {
            path: self.inner.path().join(name),
            released: false,
        }
    }

    /// Remove the directory. Best effort: failures are logged, not returned.
    pub fn close(self) {
        let path = self.inner.path().to_path_buf();
        match self.inner.close() {
            Ok(()) => debug!(path = %path.display(), "Removed ephemeral batch directory"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to clean up temporary directory"
            ),
        }
    }
}

/// A single artifact file whose lifetime is bound to one acquisition.
#[derive(Debug)]
pub struct EphemeralSlot {
    path: PathBuf,
    released: bool,
}

impl EphemeralSlot {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(&self.path, bytes).await
    }

    /// Delete the file now. A file that was never written is not an error.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove_if_present(&self.path)
    }
}

impl Drop for EphemeralSlot {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove ephemeral file");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Make an identifier safe to use as a single file-name component.
pub fn safe_file_stem(identifier: &str) -> String {
    let replaced: String = identifier
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = replaced.trim_start_matches('.');
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}
