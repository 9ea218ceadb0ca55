//! Full-text index over the catalog.
//!
//! A [`Snapshot`] pairs one [`Catalog`] with the [`InvertedIndex`] built from
//! it. [`SearchEngine`] publishes snapshots through an [`ArcSwap`]: a rebuild
//! constructs the new snapshot off to the side, persists it, then swaps the
//! pointer. Readers keep the `Arc` they loaded and never see a half-built
//! index.
//!
//! Queries run a three-stage fallback chain (first non-empty stage wins):
//!
//! 1. BM25 over terms and quoted phrases, soft-AND via a coordination factor
//! 2. `*query*` substring match
//! 3. fuzzy match (same first character, bounded edit distance)

mod fuzzy;
mod inverted;
mod persist;
mod query;
mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

pub use inverted::{InvertedIndex, MatchStage, SearchHits, SearchOptions};

use crate::catalog::Catalog;
use crate::error::IndexError;

/// A catalog together with its index.
#[derive(Debug, Default)]
pub struct Snapshot {
    catalog: Catalog,
    index: InvertedIndex,
}

impl Snapshot {
    /// Index `catalog`.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        let index = InvertedIndex::build(&catalog);
        Self { catalog, index }
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The index.
    #[must_use]
    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    /// Run a query against this snapshot.
    #[must_use]
    pub fn search(&self, query: &str, options: SearchOptions) -> SearchHits {
        self.index.search(query, &self.catalog, options)
    }
}

/// Owner of the live snapshot.
pub struct SearchEngine {
    current: ArcSwap<Snapshot>,
    store_path: Option<PathBuf>,
    options: SearchOptions,
}

impl SearchEngine {
    /// An in-memory engine with an empty catalog.
    #[must_use]
    pub fn new(options: SearchOptions) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            store_path: None,
            options,
        }
    }

    /// An engine that persists every rebuild to `path`.
    #[must_use]
    pub fn persistent(path: impl Into<PathBuf>, options: SearchOptions) -> Self {
        Self {
            store_path: Some(path.into()),
            ..Self::new(options)
        }
    }

    /// Where snapshots are persisted, if anywhere.
    #[must_use]
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Query limits.
    #[must_use]
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Publish the persisted snapshot, if one exists.
    ///
    /// Returns `Ok(true)` when a snapshot was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the file exists but cannot be read, has
    /// another format version, or is corrupt.
    pub fn restore(&self) -> Result<bool, IndexError> {
        let Some(path) = &self.store_path else {
            return Ok(false);
        };
        let Some((catalog, index)) = persist::load(path)? else {
            debug!(path = %path.display(), "no persisted index");
            return Ok(false);
        };
        info!(
            path = %path.display(),
            modules = catalog.len(),
            fingerprint = %catalog.short_fingerprint(),
            "restored persisted index"
        );
        self.current.store(Arc::new(Snapshot { catalog, index }));
        Ok(true)
    }

    /// Rebuild from `catalog`, persist, and publish.
    ///
    /// Building and persisting run on a blocking thread. A persistence
    /// failure is logged; the new snapshot is published regardless.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Task`] if the blocking task fails.
    pub async fn build(&self, catalog: Catalog) -> Result<Arc<Snapshot>, IndexError> {
        let store_path = self.store_path.clone();
        let snapshot = tokio::task::spawn_blocking(move || {
            let snapshot = Snapshot::new(catalog);
            if let Some(path) = store_path
                && let Err(e) = persist::save(&path, &snapshot.catalog, &snapshot.index)
            {
                warn!(path = %path.display(), error = %e, "failed to persist index");
            }
            snapshot
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))?;

        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        info!(
            modules = snapshot.catalog.len(),
            documents = snapshot.index.document_count(),
            terms = snapshot.index.term_count(),
            fingerprint = %snapshot.catalog.short_fingerprint(),
            "index published"
        );
        Ok(snapshot)
    }

    /// The live snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Query the live snapshot.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<String> {
        let hits = self.current.load().search(query, self.options);
        debug!(query, stage = ?hits.stage, results = hits.paths.len(), "search");
        hits.paths
    }
}
