//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};

/// Backend for string records grouped into named stores.
///
/// Implementors must keep stores isolated from each other: the same key in
/// two stores names two different records.
pub trait KvStorage: Send + Sync {
  /// Get a record. `Ok(None)` means absent; an empty string is a present value.
  fn get(&self, store: &str, key: &str) -> Result<Option<String>>;

  /// Insert or overwrite a record.
  fn set(&self, store: &str, key: &str, value: &str) -> Result<()>;
}

/// Backend for HTTP response snapshots grouped into named caches.
pub trait ResponseStorage: Send + Sync {
  /// Find the snapshot stored for a request identity.
  fn match_response(&self, cache: &str, method: &str, url: &str)
    -> Result<Option<CachedResponse>>;

  /// Store or overwrite the snapshot for a request identity.
  fn put_response(
    &self,
    cache: &str,
    method: &str,
    url: &str,
    response: &ResponseSnapshot,
  ) -> Result<()>;

  /// Names of every response cache that holds at least one entry.
  fn cache_names(&self) -> Result<Vec<String>>;

  /// Drop a whole response cache, returning the number of removed entries.
  fn delete_cache(&self, cache: &str) -> Result<usize>;
}

/// An HTTP response reduced to what can be replayed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl ResponseSnapshot {
  /// Plain-text response with the given status.
  pub fn text(status: u16, body: &str) -> Self {
    Self {
      status,
      headers: vec![(
        "content-type".to_string(),
        "text/plain; charset=utf-8".to_string(),
      )],
      body: body.as_bytes().to_vec(),
    }
  }

  /// Body decoded as UTF-8, replacing invalid sequences.
  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// A stored response snapshot.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// The cached response
  pub response: ResponseSnapshot,
  /// When the response was cached
  pub cached_at: DateTime<Utc>,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh remote data.
  pub fn from_remote(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Remote,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Create a new cache result for a failed lookup served with a fallback value.
  pub fn degraded(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Degraded,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Served from the local cache without any remote call
  Cache,
  /// Fetched from the remote store and written back to the cache
  Remote,
  /// Remote lookup failed; a fallback value was returned and nothing was cached
  Degraded,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Cache => write!(f, "cache"),
      Self::Remote => write!(f, "remote"),
      Self::Degraded => write!(f, "degraded"),
    }
  }
}
