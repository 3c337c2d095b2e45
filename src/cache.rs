//! Deterministic query→result cache with TTL and bulk-write invalidation
//! (see `spec.md` §2.7, §9).
//!
//! Individual `store()`/`remove()` calls do *not* invalidate the cache --
//! tolerated because `CACHE_TIMEOUT` is meant to be short. Bulk writes
//! (`store_all`/`remove_all`) purge the autocompleter's entire cache
//! namespace unconditionally, since the cache is a correctness hazard once
//! providers mutate silently underneath it.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::keys::KeySchema;
use crate::store::RedisStore;

/// Batch size for bulk key deletion, bounding command sizes per `spec.md` §4.4.
const DELETE_CHUNK_SIZE: usize = 100;

#[derive(Clone)]
pub struct Cache {
    store: RedisStore,
    keys: KeySchema,
}

impl Cache {
    pub fn new(store: RedisStore, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    /// Fetch and deserialize a cached value, if present.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value under `key` for `ttl_secs` seconds.
    /// A `ttl_secs` of `0` means caching is disabled and this is a no-op.
    pub async fn set<T: Serialize>(&self, key: &str, ttl_secs: u64, value: &T) -> Result<()> {
        if ttl_secs == 0 {
            return Ok(());
        }
        let serialized = serde_json::to_string(value)?;
        self.store.setex(key, ttl_secs, &serialized).await
    }

    /// Purge every cache entry (normal and exact) for an autocompleter.
    pub async fn invalidate_autocompleter(&self, autocompleter: &str) -> Result<()> {
        let mut keys = self.store.scan_keys(&self.keys.cache_glob(autocompleter)).await?;
        keys.extend(self.store.scan_keys(&self.keys.exact_cache_glob(autocompleter)).await?);
        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            self.store.del(chunk).await?;
        }
        Ok(())
    }
}
