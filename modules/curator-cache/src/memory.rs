use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use curator_common::{CacheEntry, CacheStats, CachedPage};

use crate::CacheStore;

/// In-process cache. Shares the `CacheStore` contract with `SqliteCache` so
/// tests and `--no-cache` runs exercise the same call paths.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachedPage> {
        self.entries.read().await.get(key).map(|e| e.page.clone())
    }

    async fn get_many(&self, keys: &[String]) -> HashMap<String, CachedPage> {
        let entries = self.entries.read().await;
        keys.iter()
            .filter_map(|k| entries.get(k).map(|e| (k.clone(), e.page.clone())))
            .collect()
    }

    async fn set(&self, key: &str, page: &CachedPage) {
        self.set_many(&[(key.to_string(), page.clone())]).await;
    }

    async fn set_many(&self, pairs: &[(String, CachedPage)]) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        for (key, page) in pairs {
            let inserted_at = entries.get(key).map(|e| e.inserted_at).unwrap_or(now);
            entries.insert(
                key.clone(),
                CacheEntry {
                    key: key.clone(),
                    page: page.clone(),
                    inserted_at,
                },
            );
        }
    }

    async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            count: entries.len() as u64,
            oldest: entries.values().map(|e| e.inserted_at).min(),
            newest: entries.values().map(|e| e.inserted_at).max(),
        }
    }
}
