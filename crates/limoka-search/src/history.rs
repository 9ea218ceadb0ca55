//! Bounded per-user search history.

use std::sync::Arc;

use limoka_storage::{KvStore, ScopedKvStore, StorageResult};
use tokio::sync::Mutex;

/// Key under which the history list is stored.
pub const HISTORY_KEY: &str = "history";

/// Namespace holding one user's state.
#[must_use]
pub fn user_namespace(user_id: i64) -> String {
    format!("limoka:{user_id}")
}

/// Recent top-level queries per user, oldest first.
///
/// Updates are read-modify-write on the store, so clones share one write
/// lock and concurrent pushes never drop an entry.
#[derive(Clone)]
pub struct SearchHistory {
    store: Arc<dyn KvStore>,
    limit: usize,
    writes: Arc<Mutex<()>>,
}

impl SearchHistory {
    /// Create a history keeping at most `limit` queries per user.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Maximum number of queries kept.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn scope(&self, user_id: i64) -> StorageResult<ScopedKvStore> {
        ScopedKvStore::new(Arc::clone(&self.store), user_namespace(user_id))
    }

    /// The user's queries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store fails or holds a value of the
    /// wrong type.
    pub async fn list(&self, user_id: i64) -> StorageResult<Vec<String>> {
        Ok(self
            .scope(user_id)?
            .get_json::<Vec<String>>(HISTORY_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Append `query`, evicting the oldest entries beyond the limit.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store fails.
    pub async fn push(&self, user_id: i64, query: &str) -> StorageResult<()> {
        let scope = self.scope(user_id)?;
        let _guard = self.writes.lock().await;
        let mut history = scope
            .get_json::<Vec<String>>(HISTORY_KEY)
            .await?
            .unwrap_or_default();
        history.push(query.to_owned());
        let excess = history.len().saturating_sub(self.limit);
        history.drain(..excess);
        scope.set_json(HISTORY_KEY, &history).await
    }

    /// Forget the user's history.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store fails.
    pub async fn clear(&self, user_id: i64) -> StorageResult<()> {
        let scope = self.scope(user_id)?;
        let _guard = self.writes.lock().await;
        scope.delete(HISTORY_KEY).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use limoka_storage::MemoryKvStore;

    use super::*;

    fn history(limit: usize) -> (Arc<MemoryKvStore>, SearchHistory) {
        let store = Arc::new(MemoryKvStore::new());
        let history = SearchHistory::new(Arc::clone(&store) as Arc<dyn KvStore>, limit);
        (store, history)
    }

    #[tokio::test]
    async fn empty_by_default() {
        let (_, h) = history(10);
        assert!(h.list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_last_ten_in_order() {
        let (_, h) = history(10);
        for i in 0..12 {
            h.push(7, &format!("q{i}")).await.unwrap();
        }
        let list = h.list(7).await.unwrap();
        assert_eq!(list.len(), 10);
        assert_eq!(list.first().unwrap(), "q2");
        assert_eq!(list.last().unwrap(), "q11");
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (store, h) = history(10);
        h.push(1, "weather").await.unwrap();
        h.push(2, "ping").await.unwrap();
        assert_eq!(h.list(1).await.unwrap(), vec!["weather"]);
        assert_eq!(h.list(2).await.unwrap(), vec!["ping"]);
        assert_eq!(
            store.list_keys("limoka:1").await.unwrap(),
            vec![HISTORY_KEY.to_owned()]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pushes_keep_every_query() {
        let (_, h) = history(100);
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let h = h.clone();
                tokio::spawn(async move { h.push(3, &format!("q{i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut list = h.list(3).await.unwrap();
        assert_eq!(list.len(), 32);
        list.sort();
        list.dedup();
        assert_eq!(list.len(), 32);
    }

    #[tokio::test]
    async fn clear_empties() {
        let (_, h) = history(10);
        h.push(1, "x").await.unwrap();
        h.clear(1).await.unwrap();
        assert!(h.list(1).await.unwrap().is_empty());
        // Clearing an empty history is fine.
        h.clear(1).await.unwrap();
    }

    #[test]
    fn namespace_format() {
        assert_eq!(user_namespace(8_581_621_390), "limoka:8581621390");
        assert_eq!(user_namespace(-5), "limoka:-5");
    }
}
