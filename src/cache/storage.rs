//! Cache storage backends: SQLite on disk and an in-memory map.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{CachedResponse, KvStorage, ResponseSnapshot, ResponseStorage};

/// Storage implementation that keeps everything in process memory.
/// Used when persistence is disabled and as the fake backend in tests.
#[derive(Default)]
pub struct MemoryStorage {
  records: Mutex<HashMap<(String, String), String>>,
  responses: Mutex<HashMap<(String, String), CachedResponse>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of records held in one store.
  #[cfg(test)]
  pub fn record_count(&self, store: &str) -> usize {
    self
      .records
      .lock()
      .map(|records| records.keys().filter(|(s, _)| s == store).count())
      .unwrap_or(0)
  }

  /// Number of responses held in one cache.
  #[cfg(test)]
  pub fn response_count(&self, cache: &str) -> usize {
    self
      .responses
      .lock()
      .map(|responses| responses.keys().filter(|(c, _)| c == cache).count())
      .unwrap_or(0)
  }
}

impl KvStorage for MemoryStorage {
  fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
    let records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(records.get(&(store.to_string(), key.to_string())).cloned())
  }

  fn set(&self, store: &str, key: &str, value: &str) -> Result<()> {
    let mut records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    records.insert((store.to_string(), key.to_string()), value.to_string());
    Ok(())
  }
}

impl ResponseStorage for MemoryStorage {
  fn match_response(
    &self,
    cache: &str,
    method: &str,
    url: &str,
  ) -> Result<Option<CachedResponse>> {
    let responses = self
      .responses
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      responses
        .get(&(cache.to_string(), request_hash(method, url)))
        .cloned(),
    )
  }

  fn put_response(
    &self,
    cache: &str,
    method: &str,
    url: &str,
    response: &ResponseSnapshot,
  ) -> Result<()> {
    let mut responses = self
      .responses
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    responses.insert(
      (cache.to_string(), request_hash(method, url)),
      CachedResponse {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let responses = self
      .responses
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = responses.keys().map(|(c, _)| c.clone()).collect();
    names.sort();
    names.dedup();
    Ok(names)
  }

  fn delete_cache(&self, cache: &str) -> Result<usize> {
    let mut responses = self
      .responses
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let before = responses.len();
    responses.retain(|(c, _), _| c != cache);
    Ok(before - responses.len())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Create a new SQLite storage at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("rxview").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- String records, namespaced by store name
CREATE TABLE IF NOT EXISTS kv_cache (
    store TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (store, key)
);

-- Response snapshots, namespaced by cache generation name
CREATE TABLE IF NOT EXISTS response_cache (
    cache_name TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_hash)
);
"#;

impl KvStorage for SqliteStorage {
  fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_cache WHERE store = ? AND key = ?",
        params![store, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache record {}: {}", key, e))
  }

  fn set(&self, store: &str, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (store, key, value, cached_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![store, key, value],
      )
      .map_err(|e| eyre!("Failed to store cache record {}: {}", key, e))?;

    Ok(())
  }
}

impl ResponseStorage for SqliteStorage {
  fn match_response(
    &self,
    cache: &str,
    method: &str,
    url: &str,
  ) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, headers, body, cached_at FROM response_cache
         WHERE cache_name = ? AND request_hash = ?",
        params![cache, request_hash(method, url)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cached response for {}: {}", url, e))?;

    match row {
      Some((status, headers, body, cached_at_str)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize cached headers: {}", e))?;
        Ok(Some(CachedResponse {
          response: ResponseSnapshot {
            status,
            headers,
            body,
          },
          cached_at: parse_datetime(&cached_at_str)?,
        }))
      }
      None => Ok(None),
    }
  }

  fn put_response(
    &self,
    cache: &str,
    method: &str,
    url: &str,
    response: &ResponseSnapshot,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let headers = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache
           (cache_name, request_hash, method, url, status, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          cache,
          request_hash(method, url),
          method,
          url,
          response.status,
          headers,
          response.body
        ],
      )
      .map_err(|e| eyre!("Failed to store response for {}: {}", url, e))?;

    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT cache_name FROM response_cache ORDER BY cache_name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list response caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read response cache name: {}", e))?;

    Ok(names)
  }

  fn delete_cache(&self, cache: &str) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE cache_name = ?",
        params![cache],
      )
      .map_err(|e| eyre!("Failed to delete response cache {}: {}", cache, e))
  }
}

/// Stable, fixed-length identity for a request.
fn request_hash(method: &str, url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(method.to_ascii_uppercase().as_bytes());
  hasher.update(b" ");
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_storage() -> (tempfile::TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::open(&dir.path().join("nested").join("cache.db")).unwrap();
    (dir, storage)
  }

  #[test]
  fn sqlite_distinguishes_absent_from_empty() {
    let (_dir, storage) = temp_storage();
    assert_eq!(storage.get("rx-view-db", "dict:a:en").unwrap(), None);

    storage.set("rx-view-db", "dict:a:en", "").unwrap();
    assert_eq!(
      storage.get("rx-view-db", "dict:a:en").unwrap(),
      Some(String::new())
    );
  }

  #[test]
  fn sqlite_stores_are_isolated() {
    let (_dir, storage) = temp_storage();
    storage.set("rx-view-db", "lang", "ja").unwrap();
    storage.set("rx-view-items", "lang", "ko-KR").unwrap();

    assert_eq!(
      storage.get("rx-view-db", "lang").unwrap().as_deref(),
      Some("ja")
    );
    assert_eq!(
      storage.get("rx-view-items", "lang").unwrap().as_deref(),
      Some("ko-KR")
    );
  }

  #[test]
  fn sqlite_set_overwrites() {
    let (_dir, storage) = temp_storage();
    storage.set("s", "k", "old").unwrap();
    storage.set("s", "k", "new").unwrap();
    assert_eq!(storage.get("s", "k").unwrap().as_deref(), Some("new"));
  }

  #[test]
  fn sqlite_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.set("rx-view-db", "dict:胃薬:ja", "胃薬").unwrap();
    }
    let reopened = SqliteStorage::open(&path).unwrap();
    assert_eq!(
      reopened.get("rx-view-db", "dict:胃薬:ja").unwrap().as_deref(),
      Some("胃薬")
    );
  }

  #[test]
  fn sqlite_response_round_trip_keyed_by_method_and_url() {
    let (_dir, storage) = temp_storage();
    let snapshot = ResponseSnapshot {
      status: 200,
      headers: vec![("content-type".into(), "text/html".into())],
      body: b"<html></html>".to_vec(),
    };
    storage
      .put_response("rx-view-v1", "GET", "https://rx.example/index.html", &snapshot)
      .unwrap();

    let hit = storage
      .match_response("rx-view-v1", "GET", "https://rx.example/index.html")
      .unwrap()
      .unwrap();
    assert_eq!(hit.response, snapshot);

    assert!(storage
      .match_response("rx-view-v1", "HEAD", "https://rx.example/index.html")
      .unwrap()
      .is_none());
    assert!(storage
      .match_response("rx-view-v2", "GET", "https://rx.example/index.html")
      .unwrap()
      .is_none());
  }

  #[test]
  fn sqlite_lists_and_deletes_generations() {
    let (_dir, storage) = temp_storage();
    let snapshot = ResponseSnapshot::text(200, "ok");
    storage
      .put_response("rx-view-v1", "GET", "https://rx.example/a", &snapshot)
      .unwrap();
    storage
      .put_response("rx-view-v1", "GET", "https://rx.example/b", &snapshot)
      .unwrap();
    storage
      .put_response("rx-view-v2", "GET", "https://rx.example/a", &snapshot)
      .unwrap();

    assert_eq!(
      storage.cache_names().unwrap(),
      vec!["rx-view-v1".to_string(), "rx-view-v2".to_string()]
    );
    assert_eq!(storage.delete_cache("rx-view-v1").unwrap(), 2);
    assert_eq!(storage.cache_names().unwrap(), vec!["rx-view-v2".to_string()]);
  }

  #[test]
  fn memory_storage_matches_sqlite_semantics() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("s", "k").unwrap(), None);
    storage.set("s", "k", "").unwrap();
    assert_eq!(storage.get("s", "k").unwrap(), Some(String::new()));
    assert_eq!(storage.get("other", "k").unwrap(), None);
    assert_eq!(storage.record_count("s"), 1);

    let snapshot = ResponseSnapshot::text(200, "ok");
    storage
      .put_response("c1", "get", "https://rx.example/", &snapshot)
      .unwrap();
    assert!(storage
      .match_response("c1", "GET", "https://rx.example/")
      .unwrap()
      .is_some());
    assert_eq!(storage.delete_cache("c1").unwrap(), 1);
    assert_eq!(storage.response_count("c1"), 0);
  }

  #[test]
  fn request_hash_is_stable_and_method_sensitive() {
    let a = request_hash("GET", "https://rx.example/");
    assert_eq!(a, request_hash("get", "https://rx.example/"));
    assert_ne!(a, request_hash("POST", "https://rx.example/"));
    assert_eq!(a.len(), 64);
  }
}
