//! On-disk snapshot of the catalog and its index.
//!
//! One JSON document holds both, tagged with a format version. Writes go to a
//! temporary file in the target directory followed by an atomic rename, so a
//! crash mid-write leaves the previous snapshot intact.

use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::IndexError;
use crate::index::inverted::InvertedIndex;

/// Format version written by this build.
pub(crate) const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedRef<'a> {
    version: u32,
    catalog: &'a Catalog,
    index: &'a InvertedIndex,
}

#[derive(Deserialize)]
struct Persisted {
    catalog: Catalog,
    index: InvertedIndex,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Write `catalog` and `index` to `path`.
pub(crate) fn save(path: &Path, catalog: &Catalog, index: &InvertedIndex) -> Result<(), IndexError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_vec(&PersistedRef {
        version: INDEX_FORMAT_VERSION,
        catalog,
        index,
    })
    .map_err(|e| IndexError::Serialization(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;
    Ok(())
}

/// Read a snapshot from `path`. A missing file yields `Ok(None)`.
pub(crate) fn load(path: &Path) -> Result<Option<(Catalog, InvertedIndex)>, IndexError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let probe: VersionProbe =
        serde_json::from_slice(&bytes).map_err(|e| IndexError::Serialization(e.to_string()))?;
    if probe.version != INDEX_FORMAT_VERSION {
        return Err(IndexError::UnsupportedVersion {
            found: probe.version,
            expected: INDEX_FORMAT_VERSION,
        });
    }

    let persisted: Persisted =
        serde_json::from_slice(&bytes).map_err(|e| IndexError::Serialization(e.to_string()))?;
    if !persisted.catalog.fingerprint_is_consistent() {
        return Err(IndexError::Serialization(
            "catalog fingerprint does not match its entries".to_owned(),
        ));
    }
    Ok(Some((persisted.catalog, persisted.index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Catalog, InvertedIndex) {
        let catalog =
            Catalog::from_manifest(br#"{"tools/ping.py": {"name": "Ping"}}"#).unwrap();
        let index = InvertedIndex::build(&catalog);
        (catalog, index)
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search").join("index.json");
        let (catalog, index) = sample();

        save(&path, &catalog, &index).unwrap();
        let (loaded_catalog, loaded_index) = load(&path).unwrap().unwrap();
        assert_eq!(loaded_catalog, catalog);
        assert_eq!(loaded_index, index);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn other_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{"version": 99, "catalog": null}"#).unwrap();
        assert!(matches!(
            load(&path),
            Err(IndexError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn tampered_catalog_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let (catalog, index) = sample();
        save(&path, &catalog, &index).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"Ping\"", "\"Pong\"")).unwrap();
        assert!(matches!(load(&path), Err(IndexError::Serialization(_))));
    }

    #[test]
    fn overwrite_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let (catalog, index) = sample();
        save(&path, &catalog, &index).unwrap();

        let empty = Catalog::default();
        save(&path, &empty, &InvertedIndex::build(&empty)).unwrap();
        let (loaded, _) = load(&path).unwrap().unwrap();
        assert!(loaded.is_empty());
    }
}
