use std::collections::BTreeMap;

use tokio::sync::RwLock;

/// Ordered in-memory table of records addressed by key.
///
/// Reads clone records out. Writes are only made through
/// [`Transaction::commit`](super::Transaction::commit), which serializes
/// writers and makes a record visible only once it is on disk.
#[derive(Debug)]
pub struct Table<K, V> {
    rows: RwLock<BTreeMap<K, V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: BTreeMap<K, V>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.rows.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.rows.read().await.contains_key(key)
    }

    /// First record (in key order) matching the predicate
    pub async fn find(&self, pred: impl Fn(&V) -> bool) -> Option<V> {
        self.rows.read().await.values().find(|v| pred(v)).cloned()
    }

    /// All records matching the predicate, in key order
    pub async fn scan(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.rows
            .read()
            .await
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Largest key, if any
    pub async fn last_key(&self) -> Option<K> {
        self.rows.read().await.keys().next_back().cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Insert or overwrite, returning the previous record
    pub(super) async fn upsert(&self, key: K, value: V) -> Option<V> {
        self.rows.write().await.insert(key, value)
    }

    /// Copy of every row, used for snapshots
    pub async fn rows(&self) -> BTreeMap<K, V> {
        self.rows.read().await.clone()
    }
}
