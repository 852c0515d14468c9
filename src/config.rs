use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::dictionary::Lang;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub supabase: SupabaseConfig,
  /// Origin the application's own resources are served from
  pub origin: Url,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Language used when none has been chosen yet
  #[serde(default)]
  pub default_lang: Lang,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
  pub url: String,
  /// Dictionary table name
  #[serde(default = "default_table")]
  pub table: String,
  /// Timeout for every remote call, in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Store name for memoized dictionary lookups
  #[serde(default = "default_store")]
  pub store: String,
  /// Store name for saved items and preferences
  #[serde(default = "default_items_store")]
  pub items_store: String,
  /// Version-tagged response cache name; bump it to ship a new generation
  #[serde(default = "default_response_cache")]
  pub response_cache: String,
  /// Database location (defaults to the user data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      store: default_store(),
      items_store: default_items_store(),
      response_cache: default_response_cache(),
      path: None,
    }
  }
}

fn default_table() -> String {
  "dictionary".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_store() -> String {
  "rx-view-db".to_string()
}

fn default_items_store() -> String {
  "rx-view-items".to_string()
}

fn default_response_cache() -> String {
  "rx-view-v1".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rxview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rxview/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/rxview/config.yaml\n\
                 with at least `supabase.url` and `origin`."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("rxview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rxview").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Supabase API key from the environment, if set.
  ///
  /// Checks RXVIEW_SUPABASE_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn api_key() -> Option<String> {
    std::env::var("RXVIEW_SUPABASE_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .ok()
  }

  /// Supabase API key, required for writes and sign-in.
  pub fn get_api_key() -> Result<String> {
    Self::api_key().ok_or_else(|| {
      eyre!(
        "Supabase API key not found. Set RXVIEW_SUPABASE_KEY or SUPABASE_ANON_KEY environment variable."
      )
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_config_uses_defaults() {
    let config = Config::parse(
      "supabase:\n  url: https://demo.supabase.co\norigin: https://rx.example.org\n",
    )
    .unwrap();

    assert_eq!(config.supabase.table, "dictionary");
    assert_eq!(config.supabase.timeout_secs, 30);
    assert_eq!(config.cache.store, "rx-view-db");
    assert_eq!(config.cache.items_store, "rx-view-items");
    assert_eq!(config.cache.response_cache, "rx-view-v1");
    assert_eq!(config.cache.path, None);
    assert_eq!(config.default_lang, Lang::En);
    assert_eq!(config.origin.as_str(), "https://rx.example.org/");
  }

  #[test]
  fn full_config_overrides_defaults() {
    let config = Config::parse(
      r#"
supabase:
  url: https://demo.supabase.co
  table: phrases_flat
  timeout_secs: 5
origin: https://rx.example.org
default_lang: zh-CN
cache:
  store: rx-guide-db
  response_cache: rx-view-v2
  path: /tmp/rx.db
"#,
    )
    .unwrap();

    assert_eq!(config.supabase.table, "phrases_flat");
    assert_eq!(config.supabase.timeout_secs, 5);
    assert_eq!(config.default_lang, Lang::ZhCn);
    assert_eq!(config.cache.store, "rx-guide-db");
    assert_eq!(config.cache.items_store, "rx-view-items");
    assert_eq!(config.cache.response_cache, "rx-view-v2");
    assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/rx.db")));
  }

  #[test]
  fn invalid_origin_is_rejected() {
    assert!(Config::parse("supabase:\n  url: x\norigin: not a url\n").is_err());
  }

  #[test]
  fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("absent.yaml"))).is_err());
  }
}
