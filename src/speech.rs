//! Speech requests for an external synthesizer.

use crate::dictionary::Lang;
use crate::instructions::Instruction;

/// A synthesizer voice and the language it speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
  pub name: String,
  pub lang: String,
}

impl std::str::FromStr for Voice {
  type Err = String;

  /// Parses `name=lang`, e.g. `Kyoko=ja-JP`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (name, lang) = s
      .split_once('=')
      .ok_or_else(|| format!("expected NAME=LANG, got '{}'", s))?;
    if name.is_empty() || lang.is_empty() {
      return Err(format!("expected NAME=LANG, got '{}'", s));
    }
    Ok(Self {
      name: name.to_string(),
      lang: lang.to_string(),
    })
  }
}

/// What to hand to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
  pub text: String,
  pub lang: Lang,
  pub voice: Option<Voice>,
}

/// Pick a voice for a language: exact match first, then any voice of the
/// same base language (`zh` for `zh-CN`).
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
  let base = lang.split('-').next().unwrap_or(lang);
  voices
    .iter()
    .find(|v| v.lang == lang)
    .or_else(|| voices.iter().find(|v| v.lang.starts_with(base)))
}

/// Speech request for an instruction card.
pub fn speech_request(instruction: &Instruction, voices: &[Voice]) -> SpeechRequest {
  SpeechRequest {
    text: instruction.speech_text(),
    lang: instruction.lang,
    voice: select_voice(voices, instruction.lang.code()).cloned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn voices() -> Vec<Voice> {
    vec![
      "Samantha=en-US".parse().unwrap(),
      "Tingting=zh-CN".parse().unwrap(),
      "Meijia=zh-TW".parse().unwrap(),
      "Kyoko=ja-JP".parse().unwrap(),
    ]
  }

  #[test]
  fn exact_match_wins() {
    let voices = voices();
    assert_eq!(select_voice(&voices, "zh-CN").unwrap().name, "Tingting");
  }

  #[test]
  fn falls_back_to_base_language() {
    let voices = voices();
    assert_eq!(select_voice(&voices, "ja").unwrap().name, "Kyoko");
    assert_eq!(select_voice(&voices, "en").unwrap().name, "Samantha");
  }

  #[test]
  fn no_voice_for_unknown_language() {
    assert!(select_voice(&voices(), "ne-NP").is_none());
  }

  #[test]
  fn voice_parsing_requires_both_parts() {
    assert!("Kyoko".parse::<Voice>().is_err());
    assert!("=ja".parse::<Voice>().is_err());
  }

  #[test]
  fn request_carries_card_text() {
    let card = Instruction {
      item_id: "1".into(),
      lang: Lang::Ja,
      drug: "胃薬".into(),
      dosage: "1日2回".into(),
      days: "7日分".into(),
      timeline: "🌞 ☀".into(),
      notes: "—".into(),
    };
    let request = speech_request(&card, &voices());
    assert_eq!(request.text, "胃薬. 1日2回. 7日分. —");
    assert_eq!(request.voice.unwrap().name, "Kyoko");
  }
}
