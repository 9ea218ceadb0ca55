//! Raw key-value store trait and implementations.
//!
//! All operations are scoped to a namespace. Per-user state uses namespaces
//! like `limoka:{user_id}`; nothing outside that namespace is visible through
//! a [`ScopedKvStore`] bound to it.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Namespaces must be non-empty and free of null bytes.
fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Keys must be non-empty and free of null bytes.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw key-value store trait.
///
/// Provides namespaced byte-level storage. All operations are scoped
/// to a namespace for isolation.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a namespace and key.
    ///
    /// Overwrites any existing value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key from a namespace.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Delete all keys in a namespace.
    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory key-value store for tests and ephemeral data.
///
/// Keys are stored as `"{namespace}\0{key}"` in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}\0{key}")
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(&Self::full_key(namespace, key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.data
            .write()
            .await
            .insert(Self::full_key(namespace, key), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let mut data = self.data.write().await;
        Ok(data.remove(&Self::full_key(namespace, key)).is_some())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let data = self.data.read().await;
        let prefix = format!("{namespace}\0");
        Ok(data
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
            .collect())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        let mut data = self.data.write().await;
        let prefix = format!("{namespace}\0");
        let before = data.len();
        data.retain(|k, _| !k.starts_with(&prefix));
        Ok(u64::try_from(before.saturating_sub(data.len())).unwrap_or(u64::MAX))
    }
}

// ---------------------------------------------------------------------------
// JSON file implementation
// ---------------------------------------------------------------------------

/// Version tag of the on-disk document.
const FILE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileDocument {
    version: u32,
    /// namespace -> key -> base64 value
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

type Namespaces = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// Persistent key-value store backed by a single JSON file.
///
/// The whole store is held in memory; every mutation rewrites the file
/// through a temporary sibling and an atomic rename, so readers of the file
/// never see a partial document. Intended for small per-user state.
pub struct JsonFileKvStore {
    path: PathBuf,
    data: RwLock<Namespaces>,
}

impl std::fmt::Debug for JsonFileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileKvStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonFileKvStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file yields an empty store. A file with an unknown format
    /// version is ignored with a warning and overwritten on the next write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read and
    /// [`StorageError::Serialization`] if it is not valid JSON.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = match std::fs::read(&path) {
            Ok(bytes) => decode_document(&bytes, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Namespaces::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), namespaces = data.len(), "Opened JSON KV store");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to disk. Caller holds the write lock and swaps `data`
    /// into memory only once this succeeds.
    async fn persist(&self, data: &Namespaces) -> StorageResult<()> {
        let bytes = encode_document(data)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?
    }
}

fn decode_document(bytes: &[u8], path: &Path) -> StorageResult<Namespaces> {
    let doc: FileDocument =
        serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if doc.version != FILE_FORMAT_VERSION {
        warn!(
            path = %path.display(),
            version = doc.version,
            "Ignoring KV store file with unknown format version"
        );
        return Ok(Namespaces::new());
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let mut out = Namespaces::new();
    for (namespace, entries) in doc.namespaces {
        let mut decoded = BTreeMap::new();
        for (key, value) in entries {
            match engine.decode(value.as_bytes()) {
                Ok(v) => {
                    decoded.insert(key, v);
                },
                Err(e) => {
                    warn!(namespace = %namespace, key = %key, error = %e, "Skipping corrupt KV value");
                },
            }
        }
        out.insert(namespace, decoded);
    }
    Ok(out)
}

fn encode_document(data: &Namespaces) -> StorageResult<Vec<u8>> {
    let engine = base64::engine::general_purpose::STANDARD;
    let doc = FileDocument {
        version: FILE_FORMAT_VERSION,
        namespaces: data
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(ns, entries)| {
                let encoded = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), engine.encode(v)))
                    .collect();
                (ns.clone(), encoded)
            })
            .collect(),
    };
    serde_json::to_vec_pretty(&doc).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let existed = next
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some());
        if existed {
            self.persist(&next).await?;
            *data = next;
        }
        Ok(existed)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let removed = next.remove(namespace).map_or(0, |ns| ns.len());
        if removed > 0 {
            self.persist(&next).await?;
            *data = next;
        }
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

// ---------------------------------------------------------------------------
// Scoped store (namespace pre-bound)
// ---------------------------------------------------------------------------

/// A namespace-scoped view into a [`KvStore`].
///
/// # Example
///
/// ```
/// use limoka_storage::{MemoryKvStore, ScopedKvStore};
/// use std::sync::Arc;
///
/// # tokio_test_block_on(async {
/// let store = Arc::new(MemoryKvStore::new());
/// let scoped = ScopedKvStore::new(store, "limoka:42").unwrap();
///
/// scoped.set_json("history", &vec!["ping"]).await.unwrap();
/// let history: Option<Vec<String>> = scoped.get_json("history").await.unwrap();
/// assert_eq!(history, Some(vec!["ping".to_string()]));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Create a scoped view into the given store for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty
    /// or contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The namespace this store is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get a raw byte value by key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        self.inner.get(&self.namespace, key).await
    }

    /// Set a raw byte value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        self.inner.set(&self.namespace, key, value).await
    }

    /// Delete a key. Returns `true` if the key existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.inner.delete(&self.namespace, key).await
    }

    /// List all keys in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store operation fails.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }

    /// Delete all keys in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store operation fails.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.inner.clear_namespace(&self.namespace).await
    }

    /// Deserialize a JSON value from the store.
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if deserialization fails.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let bytes = self.get(key).await?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Serialize a value as JSON and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    pub async fn set_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, bytes).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- MemoryKvStore --

    #[tokio::test]
    async fn test_memory_get_set_overwrite() {
        let store = MemoryKvStore::new();
        store.set("ns1", "k", b"v1".to_vec()).await.unwrap();
        store.set("ns1", "k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("ns1", "k").await.unwrap(), Some(b"v2".to_vec()));
        assert!(store.get("ns1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_delete() {
        let store = MemoryKvStore::new();
        store.set("ns1", "k", b"v".to_vec()).await.unwrap();
        assert!(store.delete("ns1", "k").await.unwrap());
        assert!(!store.delete("ns1", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_namespace_isolation_and_clear() {
        let store = MemoryKvStore::new();
        store.set("ns1", "a", b"1".to_vec()).await.unwrap();
        store.set("ns1", "b", b"2".to_vec()).await.unwrap();
        store.set("ns2", "a", b"3".to_vec()).await.unwrap();

        let mut keys = store.list_keys("ns1").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        assert_eq!(store.clear_namespace("ns1").await.unwrap(), 2);
        assert!(store.list_keys("ns1").await.unwrap().is_empty());
        assert_eq!(store.get("ns2", "a").await.unwrap(), Some(b"3".to_vec()));
    }

    // -- Validation --

    #[test]
    fn test_validation_rejects_empty_and_null() {
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("ns\0bad").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("k\0bad").is_err());
        assert!(validate_key("history").is_ok());
    }

    // -- JsonFileKvStore --

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("kv.json");

        {
            let store = JsonFileKvStore::open(&path).unwrap();
            store.set("limoka:1", "history", b"[\"ping\"]".to_vec()).await.unwrap();
            store.set("limoka:2", "history", b"[]".to_vec()).await.unwrap();
        }

        let store = JsonFileKvStore::open(&path).unwrap();
        assert_eq!(
            store.get("limoka:1", "history").await.unwrap(),
            Some(b"[\"ping\"]".to_vec())
        );
        assert_eq!(store.list_keys("limoka:2").await.unwrap(), vec!["history"]);
    }

    #[tokio::test]
    async fn test_file_store_delete_and_clear_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let store = JsonFileKvStore::open(&path).unwrap();
        store.set("ns", "a", b"1".to_vec()).await.unwrap();
        store.set("ns", "b", b"2".to_vec()).await.unwrap();
        store.set("other", "c", b"3".to_vec()).await.unwrap();
        assert!(store.delete("ns", "a").await.unwrap());
        assert_eq!(store.clear_namespace("other").await.unwrap(), 1);
        drop(store);

        let store = JsonFileKvStore::open(&path).unwrap();
        assert!(store.get("ns", "a").await.unwrap().is_none());
        assert_eq!(store.get("ns", "b").await.unwrap(), Some(b"2".to_vec()));
        assert!(store.list_keys("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let path = state_dir.join("kv.json");

        let store = JsonFileKvStore::open(&path).unwrap();
        store.set("ns", "a", b"1".to_vec()).await.unwrap();
        store.set("gone", "x", b"9".to_vec()).await.unwrap();
        std::fs::remove_dir_all(&state_dir).unwrap();

        assert!(store.set("ns", "b", b"2".to_vec()).await.is_err());
        assert!(store.get("ns", "b").await.unwrap().is_none());

        assert!(store.set("ns", "a", b"changed".to_vec()).await.is_err());
        assert_eq!(store.get("ns", "a").await.unwrap(), Some(b"1".to_vec()));

        assert!(store.delete("ns", "a").await.is_err());
        assert_eq!(store.get("ns", "a").await.unwrap(), Some(b"1".to_vec()));

        assert!(store.clear_namespace("gone").await.is_err());
        assert_eq!(store.list_keys("gone").await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_file_store_ignores_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, br#"{"version":99,"namespaces":{"ns":{"k":"AA=="}}}"#).unwrap();

        let store = JsonFileKvStore::open(&path).unwrap();
        assert!(store.get("ns", "k").await.unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            JsonFileKvStore::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    // -- ScopedKvStore --

    #[tokio::test]
    async fn test_scoped_isolation() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let a = ScopedKvStore::new(Arc::clone(&store), "limoka:1").unwrap();
        let b = ScopedKvStore::new(Arc::clone(&store), "limoka:2").unwrap();

        a.set("history", b"a".to_vec()).await.unwrap();
        b.set("history", b"b".to_vec()).await.unwrap();

        assert_eq!(a.get("history").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(b.get("history").await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(a.clear().await.unwrap(), 1);
        assert!(a.list_keys().await.unwrap().is_empty());
        assert_eq!(b.list_keys().await.unwrap(), vec!["history"]);
    }

    #[tokio::test]
    async fn test_scoped_json_round_trip() {
        let store = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(store, "ns").unwrap();

        let history = vec!["ping".to_string(), "weather".to_string()];
        scoped.set_json("history", &history).await.unwrap();
        let loaded: Vec<String> = scoped.get_json("history").await.unwrap().unwrap();
        assert_eq!(loaded, history);

        let missing: Option<Vec<String>> = scoped.get_json("other").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_scoped_json_type_mismatch() {
        let store = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(store, "ns").unwrap();
        scoped.set("history", b"{\"not\":\"a list\"}".to_vec()).await.unwrap();

        let result: StorageResult<Option<Vec<String>>> = scoped.get_json("history").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_scoped_rejects_empty_namespace() {
        let store = Arc::new(MemoryKvStore::new());
        assert!(ScopedKvStore::new(store, "").is_err());
    }
}
