//! Remote dictionary access over the Supabase REST (PostgREST) API.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SupabaseConfig;

use super::error::RemoteError;
use super::key::TranslationKey;
use super::types::TranslationEntry;

/// Columns that identify a record for upserts (last write wins).
const CONFLICT_COLUMNS: &str = "key_text,lang";

/// At most two rows are requested; two already means "ambiguous".
const LOOKUP_LIMIT: &str = "2";

/// Remote store holding the canonical dictionary.
#[async_trait]
pub trait DictionaryRemote: Send + Sync {
  /// Texts of every record matching the key (domain only when given).
  async fn lookup(&self, key: &TranslationKey) -> Result<Vec<String>, RemoteError>;

  /// Insert or overwrite the record identified by `(key_text, lang)`.
  async fn upsert(&self, entry: &TranslationEntry) -> Result<TranslationEntry, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct TextRow {
  text: Option<String>,
}

/// Supabase client for the dictionary table and auth endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SupabaseClient {
  client: Client,
  base_url: String,
  table: String,
  api_key: Option<String>,
}

impl SupabaseClient {
  /// Build a client. Without a key the client still exists, but every
  /// request fails with `MissingCredential`.
  pub fn new(config: &SupabaseConfig, api_key: Option<String>) -> Result<Self, RemoteError> {
    if api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
      return Err(RemoteError::MissingCredential(
        "Supabase API key is empty".to_string(),
      ));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self {
      client,
      base_url: config.url.trim_end_matches('/').to_string(),
      table: config.table.clone(),
      api_key,
    })
  }

  fn table_url(&self) -> String {
    format!("{}/rest/v1/{}", self.base_url, self.table)
  }

  fn auth_headers(&self) -> Result<header::HeaderMap, RemoteError> {
    let api_key = self.api_key.as_deref().ok_or_else(|| {
      RemoteError::MissingCredential(
        "Supabase API key not set (RXVIEW_SUPABASE_KEY or SUPABASE_ANON_KEY)".to_string(),
      )
    })?;
    let mut headers = header::HeaderMap::new();
    let key = header::HeaderValue::from_str(api_key)
      .map_err(|e| RemoteError::MissingCredential(format!("invalid API key: {}", e)))?;
    let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
      .map_err(|e| RemoteError::MissingCredential(format!("invalid API key: {}", e)))?;
    headers.insert("apikey", key);
    headers.insert(header::AUTHORIZATION, bearer);
    Ok(headers)
  }

  /// Check if response is successful, returning an error with body if not.
  async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
      Ok(response)
    } else {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      Err(RemoteError::from_status(status, &body))
    }
  }

  /// Ask Supabase Auth to email a one-time sign-in link.
  pub async fn send_sign_in_link(&self, email: &str) -> Result<(), RemoteError> {
    let url = format!("{}/auth/v1/otp", self.base_url);
    let body = serde_json::json!({ "email": email, "create_user": true });

    let response = self
      .client
      .post(&url)
      .headers(self.auth_headers()?)
      .json(&body)
      .send()
      .await?;

    Self::check_response(response).await?;
    Ok(())
  }
}

/// PostgREST query parameters for a key lookup.
fn lookup_params(key: &TranslationKey) -> Vec<(&'static str, String)> {
  let mut params = vec![("select", "text".to_string())];
  if let Some(domain) = &key.domain {
    params.push(("domain", format!("eq.{}", domain)));
  }
  params.push(("key_text", format!("eq.{}", key.key_text)));
  params.push(("lang", format!("eq.{}", key.lang)));
  params.push(("limit", LOOKUP_LIMIT.to_string()));
  params
}

#[async_trait]
impl DictionaryRemote for SupabaseClient {
  async fn lookup(&self, key: &TranslationKey) -> Result<Vec<String>, RemoteError> {
    debug!(%key, "querying remote dictionary");

    let response = self
      .client
      .get(self.table_url())
      .headers(self.auth_headers()?)
      .query(&lookup_params(key))
      .send()
      .await?;

    let rows: Vec<TextRow> = Self::check_response(response)
      .await?
      .json()
      .await
      .map_err(|e| RemoteError::InvalidResponse(format!("dictionary rows: {}", e)))?;

    Ok(
      rows
        .into_iter()
        .map(|row| row.text.unwrap_or_default())
        .collect(),
    )
  }

  async fn upsert(&self, entry: &TranslationEntry) -> Result<TranslationEntry, RemoteError> {
    debug!(key = %entry.key(), "upserting remote dictionary record");

    let response = self
      .client
      .post(self.table_url())
      .headers(self.auth_headers()?)
      .header("Prefer", "resolution=merge-duplicates,return=representation")
      .query(&[("on_conflict", CONFLICT_COLUMNS)])
      .json(&[entry])
      .send()
      .await?;

    let mut stored: Vec<TranslationEntry> = Self::check_response(response)
      .await?
      .json()
      .await
      .map_err(|e| RemoteError::InvalidResponse(format!("upserted record: {}", e)))?;

    if stored.is_empty() {
      return Err(RemoteError::InvalidResponse(
        "upsert returned no record".to_string(),
      ));
    }
    Ok(stored.swap_remove(0))
  }
}
