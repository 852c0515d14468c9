use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dictionary::Lang;
use crate::speech::Voice;

#[derive(Parser, Debug)]
#[command(name = "rxview")]
#[command(about = "Multilingual medication instructions, offline-first")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rxview/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Language to display (default: saved preference)
  #[arg(short, long, global = true)]
  pub lang: Option<Lang>,

  /// Keep caches in memory only for this run
  #[arg(long, global = true)]
  pub no_persist: bool,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Translate one dictionary key
  Resolve {
    key_text: String,
    #[arg(short, long)]
    domain: Option<String>,
  },

  /// Write a translation to the remote dictionary
  Upsert {
    key_text: String,
    text: String,
    #[arg(short, long)]
    domain: Option<String>,
    /// Flag the translation for review
    #[arg(long)]
    needs_review: bool,
  },

  /// Fetch a URL through the offline response cache
  Fetch {
    url: String,
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
    /// Request body
    #[arg(short = 'd', long)]
    data: Option<String>,
  },

  /// Manage saved items
  #[command(subcommand)]
  Items(ItemsCommand),

  /// Show or change the preferred language
  Lang {
    code: Option<Lang>,
    /// List supported languages
    #[arg(long)]
    list: bool,
  },

  /// Show instruction cards for every saved item
  Show {
    /// Available synthesizer voices as NAME=LANG
    #[arg(long = "voice")]
    voices: Vec<Voice>,
  },

  /// Email a one-time sign-in link
  Login { email: String },

  /// Inspect the response cache
  #[command(subcommand)]
  Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum ItemsCommand {
  /// List saved items
  List,
  /// Save a new item
  Add {
    drug_class: String,
    /// Doses per day (1-4)
    #[arg(short, long)]
    times: u8,
    #[arg(short, long)]
    days: u32,
    #[arg(short, long = "note")]
    notes: Vec<String>,
  },
  /// Remove an item by id
  Remove { id: String },
  /// Remove every item
  Clear,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// List response cache generations on disk
  Generations,
  /// Delete every generation except the configured one
  Prune,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_resolve_with_global_lang() {
    let args = Args::parse_from(["rxview", "resolve", "胃薬", "--lang", "zh-CN", "-d", "drug_class"]);
    assert_eq!(args.lang, Some(Lang::ZhCn));
    match args.command {
      Command::Resolve { key_text, domain } => {
        assert_eq!(key_text, "胃薬");
        assert_eq!(domain.as_deref(), Some("drug_class"));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn parses_items_add_with_notes() {
    let args = Args::parse_from([
      "rxview", "items", "add", "抗菌薬", "-t", "3", "-d", "5", "-n", "食後", "-n", "眠気",
    ]);
    match args.command {
      Command::Items(ItemsCommand::Add { times, days, notes, .. }) => {
        assert_eq!(times, 3);
        assert_eq!(days, 5);
        assert_eq!(notes, vec!["食後".to_string(), "眠気".to_string()]);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn rejects_unknown_language() {
    assert!(Args::try_parse_from(["rxview", "lang", "fr"]).is_err());
  }

  #[test]
  fn parses_voices() {
    let args = Args::parse_from(["rxview", "show", "--voice", "Kyoko=ja-JP"]);
    match args.command {
      Command::Show { voices } => assert_eq!(voices[0].lang, "ja-JP"),
      other => panic!("unexpected command {:?}", other),
    }
  }
}
