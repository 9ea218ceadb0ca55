//! Plugin loader seam.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::LoaderError;

/// Accepts verified plugin source.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Install `source`, fetched from `url`, as the module at catalog `path`.
    ///
    /// Called only after the signature over `path` and `source` verified.
    async fn install(&self, path: &str, url: &str, source: &[u8]) -> Result<(), LoaderError>;
}

/// Writes plugins beneath a directory, mirroring their catalog paths.
#[derive(Debug, Clone)]
pub struct FsPluginLoader {
    dir: PathBuf,
}

impl FsPluginLoader {
    /// Create a loader rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a catalog path is written to. Only plain relative components are
    /// allowed.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidPath`] for empty, absolute or
    /// traversing paths.
    pub fn target(&self, path: &str) -> Result<PathBuf, LoaderError> {
        let normalized = path.replace('\\', "/");
        let relative = Path::new(&normalized);
        let mut target = self.dir.clone();
        let mut parts = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) if !part.to_string_lossy().contains(':') => {
                    target.push(part);
                    parts = parts.saturating_add(1);
                },
                _ => return Err(LoaderError::InvalidPath(path.to_owned())),
            }
        }
        if parts == 0 {
            return Err(LoaderError::InvalidPath(path.to_owned()));
        }
        Ok(target)
    }
}

fn write_atomic(target: &Path, source: &[u8]) -> Result<(), LoaderError> {
    let parent = target
        .parent()
        .ok_or_else(|| LoaderError::InvalidPath(target.display().to_string()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(source)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| LoaderError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl PluginLoader for FsPluginLoader {
    async fn install(&self, path: &str, url: &str, source: &[u8]) -> Result<(), LoaderError> {
        let target = self.target(path)?;
        let bytes = source.to_vec();
        let dest = target.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dest, &bytes))
            .await
            .map_err(|e| LoaderError::Io(std::io::Error::other(e.to_string())))??;
        info!(path, url, target = %target.display(), bytes = source.len(), "plugin installed");
        Ok(())
    }
}
