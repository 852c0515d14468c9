use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::key::TranslationKey;

/// A dictionary record as stored in the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  pub key_text: String,
  pub lang: String,
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub needs_review: Option<bool>,
}

impl TranslationEntry {
  pub fn key(&self) -> TranslationKey {
    let key = TranslationKey::new(&self.key_text, &self.lang);
    match &self.domain {
      Some(domain) => key.in_domain(domain),
      None => key,
    }
  }
}

/// Languages offered for display and speech.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lang {
  #[default]
  #[serde(rename = "en")]
  En,
  #[serde(rename = "zh-CN")]
  ZhCn,
  #[serde(rename = "vi-VN")]
  ViVn,
  #[serde(rename = "ne-NP")]
  NeNp,
  #[serde(rename = "ko-KR")]
  KoKr,
  #[serde(rename = "ja")]
  Ja,
}

impl Lang {
  pub const ALL: [Lang; 6] = [
    Lang::En,
    Lang::ZhCn,
    Lang::ViVn,
    Lang::NeNp,
    Lang::KoKr,
    Lang::Ja,
  ];

  /// BCP 47 code used as the dictionary `lang` column.
  pub fn code(self) -> &'static str {
    match self {
      Lang::En => "en",
      Lang::ZhCn => "zh-CN",
      Lang::ViVn => "vi-VN",
      Lang::NeNp => "ne-NP",
      Lang::KoKr => "ko-KR",
      Lang::Ja => "ja",
    }
  }

  /// Name of the language in that language.
  pub fn label(self) -> &'static str {
    match self {
      Lang::En => "English",
      Lang::ZhCn => "中文（简体）",
      Lang::ViVn => "Tiếng Việt",
      Lang::NeNp => "नेपाली",
      Lang::KoKr => "한국어",
      Lang::Ja => "日本語",
    }
  }
}

impl fmt::Display for Lang {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl FromStr for Lang {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Lang::ALL
      .into_iter()
      .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| {
        let codes: Vec<&str> = Lang::ALL.iter().map(|l| l.code()).collect();
        format!("unsupported language '{}' (expected one of {})", s, codes.join(", "))
      })
  }
}
