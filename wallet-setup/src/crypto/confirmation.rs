//! Checking user-retyped words against the concealed originals

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::concealment::ConcealmentMask;
use super::mnemonic::RecoveryPhrase;

/// Text the user typed for hidden positions, keyed by position
///
/// Entries are zeroized when removed, cleared, or dropped.
#[derive(Default)]
pub struct ConfirmationAttempt {
    entries: BTreeMap<usize, String>,
}

impl ConfirmationAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the text for `position`, replacing any previous entry
    pub fn set(&mut self, position: usize, text: impl Into<String>) {
        if let Some(mut old) = self.entries.insert(position, text.into()) {
            old.zeroize();
        }
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.entries.get(&position).map(String::as_str)
    }

    pub fn remove(&mut self, position: usize) {
        if let Some(mut old) = self.entries.remove(&position) {
            old.zeroize();
        }
    }

    pub fn clear(&mut self) {
        for value in self.entries.values_mut() {
            value.zeroize();
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for ConfirmationAttempt {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        let mut attempt = Self::new();
        for (position, text) in iter {
            attempt.set(position, text);
        }
        attempt
    }
}

impl Drop for ConfirmationAttempt {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ConfirmationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationAttempt")
            .field("positions", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Verdict on a confirmation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "failed_positions")]
pub enum ConfirmationResult {
    Confirmed,
    /// Hidden positions whose input did not match, ascending
    Rejected(Vec<usize>),
}

impl ConfirmationResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Compare every hidden position against the original word
///
/// Input is trimmed, then compared exactly and case-sensitively. A missing
/// entry is a mismatch. Visible positions are never looked at.
pub fn validate(
    phrase: &RecoveryPhrase,
    mask: &ConcealmentMask,
    attempt: &ConfirmationAttempt,
) -> ConfirmationResult {
    let failed: Vec<usize> = mask
        .hidden_positions()
        .filter(|&position| {
            match (phrase.word(position), attempt.get(position)) {
                (Some(expected), Some(typed)) => typed.trim() != expected,
                _ => true,
            }
        })
        .collect();

    if failed.is_empty() {
        ConfirmationResult::Confirmed
    } else {
        ConfirmationResult::Rejected(failed)
    }
}

/// True when every hidden position has a non-empty trimmed entry
pub fn is_submittable(attempt: &ConfirmationAttempt, mask: &ConcealmentMask) -> bool {
    mask.hidden_positions()
        .all(|position| attempt.get(position).is_some_and(|text| !text.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mnemonic::PHRASE_WORDS;
    use crate::crypto::wordlist::Wordlist;

    fn fixture() -> (RecoveryPhrase, ConcealmentMask) {
        let wordlist = Wordlist::english();
        let words = (0..PHRASE_WORDS)
            .map(|i| wordlist.get(i * 10).unwrap().to_string())
            .collect();
        let phrase = RecoveryPhrase::from_words(words, &wordlist).unwrap();
        let mask = ConcealmentMask::new(PHRASE_WORDS, [2, 5, 9, 14, 18]).unwrap();
        (phrase, mask)
    }

    fn exact_attempt(phrase: &RecoveryPhrase, mask: &ConcealmentMask) -> ConfirmationAttempt {
        mask.hidden_positions()
            .map(|p| (p, phrase.word(p).unwrap().to_string()))
            .collect()
    }

    #[test]
    fn test_exact_attempt_confirms() {
        let (phrase, mask) = fixture();
        let attempt = exact_attempt(&phrase, &mask);
        assert_eq!(validate(&phrase, &mask, &attempt), ConfirmationResult::Confirmed);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let (phrase, mask) = fixture();
        let mut attempt = exact_attempt(&phrase, &mask);
        attempt.set(9, format!("  {}\t", phrase.word(9).unwrap()));
        assert!(validate(&phrase, &mask, &attempt).is_confirmed());
    }

    #[test]
    fn test_case_matters() {
        let (phrase, mask) = fixture();
        let mut attempt = exact_attempt(&phrase, &mask);
        attempt.set(14, phrase.word(14).unwrap().to_uppercase());
        assert_eq!(validate(&phrase, &mask, &attempt), ConfirmationResult::Rejected(vec![14]));
    }

    #[test]
    fn test_missing_entries_are_rejected_in_order() {
        let (phrase, mask) = fixture();
        let mut attempt = exact_attempt(&phrase, &mask);
        attempt.remove(18);
        attempt.remove(2);
        assert_eq!(validate(&phrase, &mask, &attempt), ConfirmationResult::Rejected(vec![2, 18]));
    }

    #[test]
    fn test_visible_positions_are_not_compared() {
        let (phrase, mask) = fixture();
        let mut attempt = exact_attempt(&phrase, &mask);
        attempt.set(0, "garbage");
        assert!(validate(&phrase, &mask, &attempt).is_confirmed());
    }

    #[test]
    fn test_submittable_tracks_every_input() {
        let (phrase, mask) = fixture();
        let mut attempt = ConfirmationAttempt::new();
        assert!(!is_submittable(&attempt, &mask));

        for position in mask.hidden_positions() {
            assert!(!is_submittable(&attempt, &mask));
            attempt.set(position, phrase.word(position).unwrap());
        }
        assert!(is_submittable(&attempt, &mask));

        attempt.set(5, "   ");
        assert!(!is_submittable(&attempt, &mask));

        // wrong but non-empty still counts as submittable
        attempt.set(5, "wrong");
        assert!(is_submittable(&attempt, &mask));
    }

    #[test]
    fn test_debug_hides_values() {
        let attempt: ConfirmationAttempt = [(3, "secretword")].into_iter().collect();
        assert!(!format!("{:?}", attempt).contains("secretword"));
    }
}
