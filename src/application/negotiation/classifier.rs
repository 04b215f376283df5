//! Classification of free-text counterparty answers.

use crate::domain::Intent;

/// Maps a normalized message to an [`Intent`].
pub trait IntentClassifier: Send + Sync {
    /// `text` has already gone through [`normalize`].
    fn classify(&self, text: &str) -> Intent;
}

/// Lowercase, drop punctuation and collapse whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-message keyword lookup.
///
/// Sets are checked in order affirmative, negative, confirm, deny, so a
/// word listed twice resolves to the earlier set.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    affirmative: Vec<String>,
    negative: Vec<String>,
    confirm: Vec<String>,
    deny: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<S: AsRef<str>>(affirmative: &[S], negative: &[S], confirm: &[S], deny: &[S]) -> Self {
        let prepare = |words: &[S]| words.iter().map(|w| normalize(w.as_ref())).collect();
        Self {
            affirmative: prepare(affirmative),
            negative: prepare(negative),
            confirm: prepare(confirm),
            deny: prepare(deny),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            &["да", "yes", "д"],
            &["нет", "no", "н"],
            &["подтверждаю", "confirm", "п"],
            &["не подтверждаю", "не", "нет", "cancel"],
        )
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let hit = |set: &[String]| set.iter().any(|word| word == text);
        if hit(&self.affirmative) {
            Intent::Affirmative
        } else if hit(&self.negative) {
            Intent::Negative
        } else if hit(&self.confirm) {
            Intent::Confirm
        } else if hit(&self.deny) {
            Intent::Deny
        } else {
            Intent::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        KeywordClassifier::default().classify(&normalize(text))
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Да!!! "), "да");
        assert_eq!(normalize("Не,   подтверждаю."), "не подтверждаю");
    }

    #[test]
    fn recognizes_each_keyword_set() {
        assert_eq!(classify("ДА"), Intent::Affirmative);
        assert_eq!(classify("yes."), Intent::Affirmative);
        assert_eq!(classify("нет"), Intent::Negative);
        assert_eq!(classify("Подтверждаю"), Intent::Confirm);
        assert_eq!(classify("не подтверждаю"), Intent::Deny);
        assert_eq!(classify("cancel"), Intent::Deny);
    }

    #[test]
    fn matching_is_whole_message() {
        assert_eq!(classify("да, конечно"), Intent::Unrecognized);
        assert_eq!(classify("наверное"), Intent::Unrecognized);
        assert_eq!(classify(""), Intent::Unrecognized);
    }

    #[test]
    fn overlapping_word_resolves_to_negative() {
        assert_eq!(classify("нет"), Intent::Negative);
    }
}
