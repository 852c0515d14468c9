//! In-memory remote dictionary for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::client::DictionaryRemote;
use super::error::RemoteError;
use super::key::TranslationKey;
use super::types::TranslationEntry;

#[derive(Default)]
pub struct FakeRemote {
  records: Mutex<Vec<TranslationEntry>>,
  lookups: AtomicUsize,
  upserts: AtomicUsize,
  offline: AtomicBool,
}

impl FakeRemote {
  pub fn with_records(records: Vec<TranslationEntry>) -> Self {
    Self {
      records: Mutex::new(records),
      ..Self::default()
    }
  }

  pub fn entry(domain: Option<&str>, key_text: &str, lang: &str, text: &str) -> TranslationEntry {
    TranslationEntry {
      domain: domain.map(String::from),
      key_text: key_text.to_string(),
      lang: lang.to_string(),
      text: text.to_string(),
      needs_review: None,
    }
  }

  pub fn lookups(&self) -> usize {
    self.lookups.load(Ordering::SeqCst)
  }

  pub fn upserts(&self) -> usize {
    self.upserts.load(Ordering::SeqCst)
  }

  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  fn check_online(&self) -> Result<(), RemoteError> {
    if self.offline.load(Ordering::SeqCst) {
      return Err(RemoteError::InvalidResponse("connection refused".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl DictionaryRemote for FakeRemote {
  async fn lookup(&self, key: &TranslationKey) -> Result<Vec<String>, RemoteError> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    // Let concurrent lookups interleave like real network calls
    tokio::task::yield_now().await;
    self.check_online()?;
    let records = self.records.lock().unwrap();
    Ok(
      records
        .iter()
        .filter(|r| r.key_text == key.key_text && r.lang == key.lang)
        .filter(|r| key.domain.is_none() || r.domain == key.domain)
        .map(|r| r.text.clone())
        .collect(),
    )
  }

  async fn upsert(&self, entry: &TranslationEntry) -> Result<TranslationEntry, RemoteError> {
    self.upserts.fetch_add(1, Ordering::SeqCst);
    self.check_online()?;
    let mut records = self.records.lock().unwrap();
    let mut stored = entry.clone();
    if let Some(pos) = records
      .iter()
      .position(|r| r.key_text == entry.key_text && r.lang == entry.lang)
    {
      // Merge keeps columns the write left out
      let existing = records.remove(pos);
      stored.domain = stored.domain.or(existing.domain);
      stored.needs_review = stored.needs_review.or(existing.needs_review);
    }
    records.push(stored.clone());
    Ok(stored)
  }
}
