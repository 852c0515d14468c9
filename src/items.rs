//! Saved medication items and the preferred language.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cache::LocalCache;
use crate::dictionary::Lang;

const ITEMS_KEY: &str = "items";
const LANG_KEY: &str = "lang";

/// Doses per day, one to four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TimesPerDay(u8);

impl TimesPerDay {
  pub fn get(self) -> u8 {
    self.0
  }
}

impl TryFrom<u8> for TimesPerDay {
  type Error = String;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    if (1..=4).contains(&value) {
      Ok(Self(value))
    } else {
      Err(format!("times per day must be between 1 and 4, got {}", value))
    }
  }
}

impl From<TimesPerDay> for u8 {
  fn from(value: TimesPerDay) -> Self {
    value.0
  }
}

/// One medication the caregiver wants explained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
  pub id: String,
  pub drug_class: String,
  pub times_per_day: TimesPerDay,
  pub days: u32,
  pub notes: Vec<String>,
}

impl Item {
  pub fn new(
    drug_class: impl Into<String>,
    times_per_day: TimesPerDay,
    days: u32,
    notes: Vec<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      drug_class: drug_class.into(),
      times_per_day,
      days,
      notes,
    }
  }
}

/// Items and preferences persisted in their own cache store.
#[derive(Clone)]
pub struct ItemBook {
  cache: LocalCache,
  default_lang: Lang,
}

impl ItemBook {
  pub fn new(cache: LocalCache, default_lang: Lang) -> Self {
    Self {
      cache,
      default_lang,
    }
  }

  /// All items, newest first.
  pub async fn list(&self) -> Result<Vec<Item>> {
    match self.cache.get(ITEMS_KEY).await? {
      Some(json) => serde_json::from_str(&json)
        .map_err(|e| eyre!("Saved items in store {} are corrupt: {}", self.cache.store_name(), e)),
      None => Ok(Vec::new()),
    }
  }

  async fn save(&self, items: &[Item]) -> Result<()> {
    let json = serde_json::to_string(items).map_err(|e| eyre!("Failed to serialize items: {}", e))?;
    self.cache.set(ITEMS_KEY, &json).await
  }

  /// Add an item in front of the existing ones.
  pub async fn add(&self, item: Item) -> Result<()> {
    let mut items = self.list().await?;
    items.insert(0, item);
    self.save(&items).await
  }

  /// Remove an item by id. Returns whether anything was removed.
  pub async fn remove(&self, id: &str) -> Result<bool> {
    let mut items = self.list().await?;
    let before = items.len();
    items.retain(|item| item.id != id);
    if items.len() == before {
      return Ok(false);
    }
    self.save(&items).await?;
    Ok(true)
  }

  pub async fn clear(&self) -> Result<()> {
    self.save(&[]).await
  }

  /// Preferred language, falling back to the configured default.
  pub async fn lang(&self) -> Result<Lang> {
    match self.cache.get(LANG_KEY).await? {
      Some(code) => Ok(code.parse().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring stored language preference");
        self.default_lang
      })),
      None => Ok(self.default_lang),
    }
  }

  pub async fn set_lang(&self, lang: Lang) -> Result<()> {
    self.cache.set(LANG_KEY, lang.code()).await
  }
}
