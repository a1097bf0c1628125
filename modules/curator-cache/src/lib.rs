//! Cache Store for normalized catalog items and their outbound links.
//!
//! One capability trait (`CacheStore`) with two implementations:
//! `SqliteCache` (the durable local store) and `MemoryCache` (tests and
//! `--no-cache` runs). Keys are URLs or normalized `title_year` strings.
//!
//! Runtime failures never surface to callers: reads degrade to misses and
//! writes are dropped with a warning. Only opening the store can fail.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use curator_common::{CacheStats, CachedPage};

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedPage>;

    /// Return the cached subset of `keys`. Missing keys are simply absent.
    async fn get_many(&self, keys: &[String]) -> HashMap<String, CachedPage>;

    async fn set(&self, key: &str, page: &CachedPage);

    /// Write all pairs atomically (one transaction).
    async fn set_many(&self, pairs: &[(String, CachedPage)]);

    async fn stats(&self) -> CacheStats;
}
