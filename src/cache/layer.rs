//! Cache handles bound to a named store, with cache-through reads.

use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::{CacheResult, CachedResponse, KvStorage, ResponseSnapshot, ResponseStorage};

/// Persistent string cache bound to one store name.
///
/// Handles are cheap to clone and share the underlying storage, so several
/// logical caches (dictionary, items) can live in the same database without
/// colliding.
pub struct LocalCache {
  storage: Arc<dyn KvStorage>,
  store: String,
}

impl LocalCache {
  /// Bind a cache handle to the given store name.
  pub fn bind(storage: Arc<dyn KvStorage>, store: impl Into<String>) -> Self {
    Self {
      storage,
      store: store.into(),
    }
  }

  pub fn store_name(&self) -> &str {
    &self.store
  }

  /// Read a record. An empty string is a hit, not a miss.
  pub async fn get(&self, key: &str) -> Result<Option<String>> {
    self.storage.get(&self.store, key)
  }

  /// Overwrite a record.
  pub async fn set(&self, key: &str, value: &str) -> Result<()> {
    self.storage.set(&self.store, key, value)
  }

  /// Read a record through the cache.
  ///
  /// 1. Cached value present - return it without calling the fetcher
  /// 2. Missing - call the fetcher once and write its result back
  /// 3. Fetcher error - propagate it and leave the cache untouched
  ///
  /// A failing cache read counts as a miss and a failing write-back is only
  /// logged, so a broken local store never hides a good remote value.
  pub async fn fetch_through<F, Fut, E>(&self, key: &str, fetcher: F) -> Result<CacheResult<String>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, E>>,
  {
    match self.get(key).await {
      Ok(Some(cached)) => {
        debug!(store = %self.store, key, "cache hit");
        return Ok(CacheResult::from_cache(cached));
      }
      Ok(None) => debug!(store = %self.store, key, "cache miss"),
      Err(e) => warn!(store = %self.store, key, error = %e, "cache read failed, treating as miss"),
    }

    let value = fetcher().await?;

    if let Err(e) = self.set(key, &value).await {
      warn!(store = %self.store, key, error = %e, "cache write-back failed");
    }

    Ok(CacheResult::from_remote(value))
  }
}

impl Clone for LocalCache {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      store: self.store.clone(),
    }
  }
}

/// Response snapshot cache bound to one generation name (e.g. `rx-view-v1`).
///
/// Bumping the name starts a fresh generation; older generations stay on disk
/// until pruned.
pub struct ResponseCache {
  storage: Arc<dyn ResponseStorage>,
  name: String,
}

impl ResponseCache {
  /// Open the response cache with the given generation name.
  pub fn open(storage: Arc<dyn ResponseStorage>, name: impl Into<String>) -> Self {
    Self {
      storage,
      name: name.into(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Find the snapshot stored for a request.
  pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<CachedResponse>> {
    self.storage.match_response(&self.name, method, url)
  }

  /// Store the snapshot for a request, replacing any previous one.
  pub async fn put(&self, method: &str, url: &str, response: &ResponseSnapshot) -> Result<()> {
    self.storage.put_response(&self.name, method, url, response)
  }

  /// Every generation present in storage, including this one if populated.
  pub async fn generations(&self) -> Result<Vec<String>> {
    self.storage.cache_names()
  }

  /// Delete every generation other than this one.
  ///
  /// Returns the names of the removed generations with their entry counts.
  pub async fn prune_other_generations(&self) -> Result<Vec<(String, usize)>> {
    let mut removed = Vec::new();
    for name in self.storage.cache_names()? {
      if name == self.name {
        continue;
      }
      let count = self.storage.delete_cache(&name)?;
      removed.push((name, count));
    }
    Ok(removed)
  }
}

impl Clone for ResponseCache {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      name: self.name.clone(),
    }
  }
}
