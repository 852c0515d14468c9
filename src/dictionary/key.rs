//! Cache keys for dictionary lookups.

use std::fmt;

/// Identifies a single translatable string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TranslationKey {
  /// Optional grouping such as `drug_class` or `dosage_label`
  pub domain: Option<String>,
  /// Source text the translation is keyed on
  pub key_text: String,
  /// Target language code (e.g. `zh-CN`)
  pub lang: String,
}

impl TranslationKey {
  pub fn new(key_text: impl Into<String>, lang: impl Into<String>) -> Self {
    Self {
      domain: None,
      key_text: key_text.into(),
      lang: lang.into(),
    }
  }

  pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
    self.domain = Some(domain.into());
    self
  }

  /// Same key with the domain dropped.
  pub fn without_domain(&self) -> Self {
    Self {
      domain: None,
      key_text: self.key_text.clone(),
      lang: self.lang.clone(),
    }
  }

  /// Deterministic local cache key.
  ///
  /// `dict:<domain>:<key_text>:<lang>` with a domain, `dict:<key_text>:<lang>`
  /// without one.
  pub fn cache_key(&self) -> String {
    match &self.domain {
      Some(domain) => format!("dict:{}:{}:{}", domain, self.key_text, self.lang),
      None => format!("dict:{}:{}", self.key_text, self.lang),
    }
  }
}

impl fmt::Display for TranslationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.domain {
      Some(domain) => write!(f, "{}/{} [{}]", domain, self.key_text, self.lang),
      None => write!(f, "{} [{}]", self.key_text, self.lang),
    }
  }
}
