//! File-backed configuration that follows edits to the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::configuration::Configuration;
use crate::error::{ConfigError, ConfigResult};

/// Modification time and length; a change in either triggers a re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

/// A JSON configuration file.
///
/// [`snapshot`](Self::snapshot) is cheap when the file is unchanged, so
/// providers can call it from `fingerprint` on every refresh pass. A file
/// that stops parsing keeps serving the last good document.
pub struct ConfigFile {
    path: PathBuf,
    current: ArcSwap<Configuration>,
    stamp: Mutex<Option<Stamp>>,
}

impl ConfigFile {
    /// Load `path`. The first read must succeed.
    pub async fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        let document = Configuration::from_path(&path).await?;
        tracing::debug!(path = %path.display(), "configuration loaded");

        Ok(Self {
            path,
            current: ArcSwap::from_pointee(document),
            stamp: Mutex::new(Some(Stamp::of(&metadata))),
        })
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current document, re-read first if the file changed.
    ///
    /// Read and parse failures are logged and the previous document is
    /// returned. See [`refresh`](Self::refresh) for the I/O involved.
    pub fn snapshot(&self) -> Arc<Configuration> {
        if let Err(error) = self.refresh() {
            tracing::warn!(
                path = %self.path.display(),
                %error,
                "keeping previous configuration"
            );
        }
        self.current.load_full()
    }

    /// The document last loaded, without checking the file.
    #[must_use]
    pub fn current(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Re-read the file if its stamp changed.
    ///
    /// Returns `Ok(true)` when a new document was published. A broken file is
    /// reported once per change, not on every call.
    ///
    /// This uses blocking filesystem calls: one `stat` when the file is
    /// unchanged, plus a full read after a change. Callers on an async
    /// runtime should keep it off hot paths or move it to
    /// [`tokio::task::spawn_blocking`] for large files.
    pub fn refresh(&self) -> ConfigResult<bool> {
        let mut stamp = self.stamp.lock();
        let metadata = std::fs::metadata(&self.path).map_err(|source| self.io_error(source))?;
        let next = Stamp::of(&metadata);
        if *stamp == Some(next) {
            return Ok(false);
        }
        *stamp = Some(next);

        let bytes = std::fs::read(&self.path).map_err(|source| self.io_error(source))?;
        let document = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            origin: self.path.display().to_string(),
            source,
        })?;
        self.current.store(Arc::new(Configuration::new(document)));
        tracing::info!(path = %self.path.display(), "configuration reloaded");
        Ok(true)
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFile")
            .field("path", &self.path)
            .field("stamp", &*self.stamp.lock())
            .finish()
    }
}
