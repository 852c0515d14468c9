//! Instruction cards: an item's labels resolved into one language.

use futures::future::join_all;
use std::fmt;

use crate::dictionary::{DictionaryRemote, DictionaryResolver, Lang};
use crate::items::Item;

/// Shown in place of any label that has no translation yet.
pub const UNTRANSLATED: &str = "［未訳］";

/// Dictionary domain of drug class names
pub const DRUG_CLASS_DOMAIN: &str = "drug_class";
/// Dictionary domain of "<n>回/日" dosage labels
pub const DOSAGE_LABEL_DOMAIN: &str = "dosage_label";
/// Dictionary domain of templated labels
pub const DAYS_TEMPLATE_DOMAIN: &str = "days_template";
/// Key of the "for {n} days" template
pub const DAYS_TEMPLATE_KEY: &str = "for-days";
/// Placeholder replaced with the number of days
pub const DAYS_PLACEHOLDER: &str = "{n}";

/// Morning, noon, evening, bedtime.
const TIMELINE: [&str; 4] = ["🌞", "☀", "🌙", "🌜"];

/// An item with every label resolved for display and speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
  pub item_id: String,
  pub lang: Lang,
  pub drug: String,
  pub dosage: String,
  pub days: String,
  pub timeline: String,
  pub notes: String,
}

impl Instruction {
  /// Sentence read aloud for this card.
  pub fn speech_text(&self) -> String {
    format!("{}. {}. {}. {}", self.drug, self.dosage, self.days, self.notes)
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "[{}] [{}] [{}]", self.drug, self.dosage, self.days)?;
    writeln!(f, "  timing: {}", self.timeline)?;
    write!(f, "  notes:  {}", self.notes)
  }
}

/// Dictionary key of the dosage label for a number of doses per day.
pub fn dosage_key(times_per_day: u8) -> String {
  format!("{}回/日", times_per_day)
}

fn or_placeholder(text: String) -> String {
  if text.is_empty() {
    UNTRANSLATED.to_string()
  } else {
    text
  }
}

/// Resolve every label of an item. Missing translations become the
/// placeholder; the first `{n}` of the days template gets filled in.
pub async fn compose<R: DictionaryRemote>(
  resolver: &DictionaryResolver<R>,
  item: &Item,
  lang: Lang,
) -> Instruction {
  let code = lang.code();
  let times = item.times_per_day.get();
  let dosage_label = dosage_key(times);

  let (drug, dosage, days) = futures::join!(
    resolver.resolve(&item.drug_class, code, Some(DRUG_CLASS_DOMAIN)),
    resolver.resolve(&dosage_label, code, Some(DOSAGE_LABEL_DOMAIN)),
    resolver.resolve(DAYS_TEMPLATE_KEY, code, Some(DAYS_TEMPLATE_DOMAIN))
  );

  let days = or_placeholder(days).replacen(DAYS_PLACEHOLDER, &item.days.to_string(), 1);

  let notes = if item.notes.is_empty() {
    "—".to_string()
  } else {
    item.notes.join(" / ")
  };

  Instruction {
    item_id: item.id.clone(),
    lang,
    drug: or_placeholder(drug),
    dosage: or_placeholder(dosage),
    days,
    timeline: TIMELINE[..usize::from(times)].join(" "),
    notes,
  }
}

/// Compose cards for many items concurrently, preserving order.
pub async fn compose_all<R: DictionaryRemote>(
  resolver: &DictionaryResolver<R>,
  items: &[Item],
  lang: Lang,
) -> Vec<Instruction> {
  join_all(items.iter().map(|item| compose(resolver, item, lang))).await
}
