//! Dictionary resolver that puts the local cache in front of the remote table.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheResult, LocalCache};

use super::client::DictionaryRemote;
use super::error::{DictionaryError, RemoteError};
use super::key::TranslationKey;
use super::types::TranslationEntry;

/// Resolves translation keys to display text.
///
/// Reads never fail: a remote error degrades to the empty string (meaning
/// "untranslated") and is not cached, so the next lookup retries. Writes go
/// to the remote first and only then refresh the local cache.
pub struct DictionaryResolver<R: DictionaryRemote> {
  remote: Arc<R>,
  cache: LocalCache,
}

impl<R: DictionaryRemote> DictionaryResolver<R> {
  pub fn new(remote: R, cache: LocalCache) -> Self {
    Self {
      remote: Arc::new(remote),
      cache,
    }
  }

  /// Resolve a key to its text, or `""` when no translation exists.
  pub async fn resolve(&self, key_text: &str, lang: &str, domain: Option<&str>) -> String {
    let key = TranslationKey::new(key_text, lang);
    let key = match domain {
      Some(domain) => key.in_domain(domain),
      None => key,
    };
    self.resolve_key(&key).await.data
  }

  /// Resolve a key, reporting whether the text came from cache or remote.
  pub async fn resolve_key(&self, key: &TranslationKey) -> CacheResult<String> {
    let cache_key = key.cache_key();

    let result = self
      .cache
      .fetch_through(&cache_key, || async {
        let texts = self.remote.lookup(key).await?;
        Ok::<_, RemoteError>(single_text(key, texts))
      })
      .await;

    match result {
      Ok(result) => result,
      Err(e) => {
        warn!(%key, error = %e, "dictionary lookup failed, serving untranslated");
        CacheResult::degraded(String::new())
      }
    }
  }

  /// Write a translation remotely, then refresh the local cache.
  ///
  /// The cache is only touched after the remote write succeeded. Keys are
  /// taken from the stored row, which carries its real domain even when the
  /// caller left it out, plus the domain-less key.
  pub async fn upsert(&self, entry: TranslationEntry) -> Result<TranslationEntry, DictionaryError> {
    let key = entry.key();

    let stored = self
      .remote
      .upsert(&entry)
      .await
      .map_err(|source| DictionaryError::Upsert {
        key: key.to_string(),
        source,
      })?;

    for k in refresh_keys(&key, &stored.key()) {
      self
        .cache
        .set(&k.cache_key(), &stored.text)
        .await
        .map_err(|e| DictionaryError::CacheWrite {
          key: k.to_string(),
          reason: e.to_string(),
        })?;
    }

    info!(%key, "dictionary entry updated");
    Ok(stored)
  }
}

impl<R: DictionaryRemote> Clone for DictionaryResolver<R> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      cache: self.cache.clone(),
    }
  }
}

/// Cache keys that can hold the text of a `(key_text, lang)` row.
fn refresh_keys(requested: &TranslationKey, stored: &TranslationKey) -> Vec<TranslationKey> {
  let mut keys = vec![stored.clone(), stored.without_domain()];
  if !keys.contains(requested) {
    keys.push(requested.clone());
  }
  keys.dedup();
  keys
}

/// Exactly one match is a translation; none or several mean "untranslated".
fn single_text(key: &TranslationKey, mut texts: Vec<String>) -> String {
  match texts.len() {
    1 => texts.swap_remove(0),
    0 => {
      debug!(%key, "no dictionary record");
      String::new()
    }
    n => {
      debug!(%key, matches = n, "ambiguous dictionary key");
      String::new()
    }
  }
}
