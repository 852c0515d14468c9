//! Local persistent caching for translations, items and HTTP responses.
//!
//! This module provides a store-agnostic caching mechanism that:
//! - Keeps string records namespaced by a store name (`rx-view-db`, ...)
//! - Keeps response snapshots namespaced by a version-tagged cache name
//! - Implements cache-through reads on top of any async fetcher
//! - Never expires records; a record lives until it is overwritten

mod layer;
mod storage;
mod traits;

pub use layer::{LocalCache, ResponseCache};
pub use storage::{MemoryStorage, SqliteStorage};
pub use traits::{
  CacheResult, CacheSource, CachedResponse, KvStorage, ResponseSnapshot, ResponseStorage,
};
