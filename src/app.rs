use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::cache::{KvStorage, LocalCache, MemoryStorage, ResponseCache, ResponseStorage, SqliteStorage};
use crate::cli::{CacheCommand, Command, ItemsCommand};
use crate::config::Config;
use crate::dictionary::{DictionaryResolver, Lang, SupabaseClient, TranslationEntry, TranslationKey};
use crate::instructions;
use crate::items::{Item, ItemBook, TimesPerDay};
use crate::offline::{HttpNetwork, InterceptHandle, Request};
use crate::speech;

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Backend for string records (dictionary memo, items, preferences)
  records: Arc<dyn KvStorage>,

  /// Backend for response snapshots
  responses: Arc<dyn ResponseStorage>,

  /// Language override from the command line
  lang_override: Option<Lang>,
}

impl App {
  pub fn new(config: Config, persist: bool, lang_override: Option<Lang>) -> Result<Self> {
    let (records, responses) = if persist {
      let storage = match &config.cache.path {
        Some(path) => SqliteStorage::open(path)?,
        None => SqliteStorage::open_default()?,
      };
      shared(Arc::new(storage))
    } else {
      shared(Arc::new(MemoryStorage::new()))
    };

    Ok(Self {
      config,
      records,
      responses,
      lang_override,
    })
  }

  fn supabase(&self, api_key: Option<String>) -> Result<SupabaseClient> {
    SupabaseClient::new(&self.config.supabase, api_key)
      .map_err(|e| eyre!("Failed to create Supabase client: {}", e))
  }

  /// Resolver for reads. A missing key only affects cache misses, which
  /// degrade to untranslated.
  fn resolver(&self) -> Result<DictionaryResolver<SupabaseClient>> {
    Ok(self.resolver_with(self.supabase(Config::api_key())?))
  }

  fn resolver_with(&self, client: SupabaseClient) -> DictionaryResolver<SupabaseClient> {
    let cache = LocalCache::bind(self.records.clone(), &self.config.cache.store);
    DictionaryResolver::new(client, cache)
  }

  fn items(&self) -> ItemBook {
    let cache = LocalCache::bind(self.records.clone(), &self.config.cache.items_store);
    ItemBook::new(cache, self.config.default_lang)
  }

  fn response_cache(&self) -> ResponseCache {
    ResponseCache::open(self.responses.clone(), &self.config.cache.response_cache)
  }

  fn intercept(&self) -> Result<InterceptHandle<HttpNetwork>> {
    let network = HttpNetwork::new(Duration::from_secs(self.config.supabase.timeout_secs))
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(InterceptHandle::install(
      network,
      self.response_cache(),
      &self.config.origin,
    ))
  }

  async fn lang(&self) -> Result<Lang> {
    match self.lang_override {
      Some(lang) => Ok(lang),
      None => self.items().lang().await,
    }
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Resolve { key_text, domain } => self.resolve(&key_text, domain).await,
      Command::Upsert {
        key_text,
        text,
        domain,
        needs_review,
      } => self.upsert(key_text, text, domain, needs_review).await,
      Command::Fetch { url, method, data } => self.fetch(&url, &method, data).await,
      Command::Items(cmd) => self.run_items(cmd).await,
      Command::Lang { code, list } => self.run_lang(code, list).await,
      Command::Show { voices } => self.show(&voices).await,
      Command::Login { email } => self.login(&email).await,
      Command::Cache(cmd) => self.run_cache(cmd).await,
    }
  }

  async fn resolve(&self, key_text: &str, domain: Option<String>) -> Result<()> {
    let lang = self.lang().await?;
    let key = TranslationKey::new(key_text, lang.code());
    let key = match domain {
      Some(domain) => key.in_domain(domain),
      None => key,
    };

    let result = self.resolver()?.resolve_key(&key).await;
    info!(%key, source = %result.source, "resolved");

    if result.data.is_empty() {
      println!("{}", instructions::UNTRANSLATED);
    } else {
      println!("{}", result.data);
    }
    Ok(())
  }

  async fn upsert(
    &self,
    key_text: String,
    text: String,
    domain: Option<String>,
    needs_review: bool,
  ) -> Result<()> {
    let lang = self.lang().await?;
    let entry = TranslationEntry {
      domain,
      key_text,
      lang: lang.code().to_string(),
      text,
      needs_review: needs_review.then_some(true),
    };

    let client = self.supabase(Some(Config::get_api_key()?))?;
    let stored = self.resolver_with(client).upsert(entry).await?;
    println!("{} = {}", stored.key(), stored.text);
    Ok(())
  }

  async fn fetch(&self, url: &str, method: &str, data: Option<String>) -> Result<()> {
    let url = absolute_url(&self.config.origin, url)?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", method, e))?;

    let mut request = Request::new(method, url);
    if let Some(data) = data {
      request = request.with_body(data.into_bytes());
    }

    let handle = self.intercept()?;
    let response = handle
      .fetch(&request)
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", request.url, e))?;

    handle.uninstall();

    println!("{}", response.status);
    println!("{}", response.body_text());
    Ok(())
  }

  async fn run_items(&self, cmd: ItemsCommand) -> Result<()> {
    let book = self.items();
    match cmd {
      ItemsCommand::List => {
        let items = book.list().await?;
        if items.is_empty() {
          println!("No items.");
        }
        for item in items {
          println!(
            "{}  {}  {}x/day  {} days  {}",
            item.id,
            item.drug_class,
            item.times_per_day.get(),
            item.days,
            item.notes.join(" / ")
          );
        }
      }
      ItemsCommand::Add {
        drug_class,
        times,
        days,
        notes,
      } => {
        let times = TimesPerDay::try_from(times).map_err(|e| eyre!(e))?;
        let item = Item::new(drug_class, times, days, notes);
        println!("{}", item.id);
        book.add(item).await?;
      }
      ItemsCommand::Remove { id } => {
        if !book.remove(&id).await? {
          return Err(eyre!("No item with id {}", id));
        }
      }
      ItemsCommand::Clear => book.clear().await?,
    }
    Ok(())
  }

  async fn run_lang(&self, code: Option<Lang>, list: bool) -> Result<()> {
    if list {
      for lang in Lang::ALL {
        println!("{:<6} {}", lang.code(), lang.label());
      }
      return Ok(());
    }

    let book = self.items();
    match code {
      Some(lang) => {
        book.set_lang(lang).await?;
        info!(%lang, "language preference saved");
      }
      None => {
        let lang = book.lang().await?;
        println!("{} ({})", lang.code(), lang.label());
      }
    }
    Ok(())
  }

  async fn show(&self, voices: &[speech::Voice]) -> Result<()> {
    let items = self.items().list().await?;
    if items.is_empty() {
      println!("No items.");
      return Ok(());
    }

    let lang = self.lang().await?;
    let resolver = self.resolver()?;
    let cards = instructions::compose_all(&resolver, &items, lang).await;

    for card in cards {
      println!("{}", card);
      let request = speech::speech_request(&card, voices);
      match &request.voice {
        Some(voice) => println!("  speech ({}, {}): {}", request.lang, voice.name, request.text),
        None => println!("  speech ({}): {}", request.lang, request.text),
      }
      println!();
    }
    Ok(())
  }

  async fn login(&self, email: &str) -> Result<()> {
    self
      .supabase(Some(Config::get_api_key()?))?
      .send_sign_in_link(email)
      .await
      .map_err(|e| eyre!("Failed to request sign-in link: {}", e))?;
    println!("Sign-in link sent to {}", email);
    Ok(())
  }

  async fn run_cache(&self, cmd: CacheCommand) -> Result<()> {
    let cache = self.response_cache();
    match cmd {
      CacheCommand::Generations => {
        for name in cache.generations().await? {
          let marker = if name == cache.name() { "*" } else { " " };
          println!("{} {}", marker, name);
        }
      }
      CacheCommand::Prune => {
        for (name, count) in cache.prune_other_generations().await? {
          println!("removed {} ({} responses)", name, count);
        }
      }
    }
    Ok(())
  }
}

/// Hand out one storage backend for both kinds of records.
fn shared<S>(storage: Arc<S>) -> (Arc<dyn KvStorage>, Arc<dyn ResponseStorage>)
where
  S: KvStorage + ResponseStorage + 'static,
{
  (storage.clone(), storage)
}

/// Resolve a URL argument relative to the application origin.
fn absolute_url(origin: &Url, url: &str) -> Result<Url> {
  origin.join(url).map_err(|e| eyre!("Invalid URL {}: {}", url, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn app() -> App {
    let config: Config = serde_yaml::from_str(
      "supabase:\n  url: https://demo.supabase.co\norigin: https://rx.example.org\ndefault_lang: ja\n",
    )
    .unwrap();
    App::new(config, false, None).unwrap()
  }

  #[tokio::test]
  async fn items_commands_round_trip() {
    let app = app();
    app
      .run(Command::Items(ItemsCommand::Add {
        drug_class: "胃薬".to_string(),
        times: 2,
        days: 7,
        notes: vec![],
      }))
      .await
      .unwrap();

    let items = app.items().list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].drug_class, "胃薬");

    app.run(Command::Items(ItemsCommand::Clear)).await.unwrap();
    assert!(app.items().list().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn add_rejects_invalid_times() {
    let result = app()
      .run(Command::Items(ItemsCommand::Add {
        drug_class: "胃薬".to_string(),
        times: 6,
        days: 7,
        notes: vec![],
      }))
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn removing_unknown_item_fails() {
    let result = app()
      .run(Command::Items(ItemsCommand::Remove {
        id: "missing".to_string(),
      }))
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn lang_preference_and_override() {
    let mut app = app();
    assert_eq!(app.lang().await.unwrap(), Lang::Ja);

    app
      .run(Command::Lang {
        code: Some(Lang::KoKr),
        list: false,
      })
      .await
      .unwrap();
    assert_eq!(app.lang().await.unwrap(), Lang::KoKr);

    app.lang_override = Some(Lang::En);
    assert_eq!(app.lang().await.unwrap(), Lang::En);
  }

  #[tokio::test]
  async fn cached_labels_resolve_without_api_key() {
    let app = app();
    let cache = LocalCache::bind(app.records.clone(), &app.config.cache.store);
    cache.set("dict:drug_class:胃薬:ja", "胃腸薬").await.unwrap();
    let resolver = app.resolver_with(app.supabase(None).unwrap());

    assert_eq!(resolver.resolve("胃薬", "ja", Some("drug_class")).await, "胃腸薬");
    // Misses degrade instead of failing
    assert_eq!(resolver.resolve("降圧薬", "ja", Some("drug_class")).await, "");
  }

  #[test]
  fn relative_urls_resolve_against_origin() {
    let origin = Url::parse("https://rx.example.org/").unwrap();
    assert_eq!(
      absolute_url(&origin, "/sw.js").unwrap().as_str(),
      "https://rx.example.org/sw.js"
    );
    assert_eq!(
      absolute_url(&origin, "https://cdn.example.net/x").unwrap().as_str(),
      "https://cdn.example.net/x"
    );
  }
}
