//! Wordlist the recovery phrase is drawn from

use std::collections::HashSet;
use std::sync::OnceLock;

use bip39::Language;

use crate::error::{Error, Result};

/// Smallest wordlist accepted for phrase generation
pub const MIN_WORDLIST_LEN: usize = 2048;

static GLOBAL: OnceLock<Wordlist> = OnceLock::new();

/// Fixed, ordered list of candidate words, indexed `0..len`
#[derive(Debug, Clone, Copy)]
pub struct Wordlist {
    words: &'static [&'static str],
}

impl Wordlist {
    /// Wrap an externally supplied list
    pub fn new(words: &'static [&'static str]) -> Result<Self> {
        if words.len() < MIN_WORDLIST_LEN {
            return Err(Error::InvalidInput(format!(
                "wordlist has {} entries, at least {} required",
                words.len(),
                MIN_WORDLIST_LEN
            )));
        }

        let mut seen = HashSet::with_capacity(words.len());
        for (index, word) in words.iter().enumerate() {
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                return Err(Error::InvalidInput(format!(
                    "wordlist entry {} is empty or contains whitespace",
                    index
                )));
            }
            if !seen.insert(*word) {
                return Err(Error::InvalidInput(format!(
                    "wordlist entry {} is a duplicate",
                    index
                )));
            }
        }

        Ok(Self { words })
    }

    /// The BIP-39 English list
    pub fn english() -> Self {
        Self {
            words: Language::English.word_list(),
        }
    }

    /// Process-wide list, loaded on first use and read-only afterwards
    pub fn global() -> &'static Wordlist {
        GLOBAL.get_or_init(Self::english)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.words.get(index).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| *w == word)
    }
}
