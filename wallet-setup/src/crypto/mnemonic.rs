//! Recovery phrase generation and handling

use std::fmt;

use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::{debug, error};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::wordlist::Wordlist;
use crate::error::{Error, Result};

/// Number of words in a recovery phrase
pub const PHRASE_WORDS: usize = 24;

/// An ordered 24-word recovery phrase
///
/// Not `Clone`: the owning session is the only holder. The words are
/// zeroized when the phrase is dropped, and `Debug` never prints them.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RecoveryPhrase {
    words: Vec<String>,
}

impl RecoveryPhrase {
    /// Build a phrase from words the caller already holds
    pub fn from_words(mut words: Vec<String>, wordlist: &Wordlist) -> Result<Self> {
        if words.len() != PHRASE_WORDS {
            let len = words.len();
            words.zeroize();
            return Err(Error::InvalidInput(format!(
                "recovery phrase must have {} words, got {}",
                PHRASE_WORDS, len
            )));
        }

        if let Some(position) = words.iter().position(|w| !wordlist.contains(w)) {
            words.zeroize();
            return Err(Error::InvalidInput(format!(
                "word at position {} is not in the wordlist",
                position
            )));
        }

        Ok(Self { words })
    }

    /// Word at `position`, if in range
    pub fn word(&self, position: usize) -> Option<&str> {
        self.words.get(position).map(String::as_str)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryPhrase([REDACTED; {} words])", self.words.len())
    }
}

/// Draws recovery phrases from a cryptographically secure source
///
/// The `CryptoRng` bound keeps non-cryptographic generators out.
pub struct MnemonicGenerator<R = OsRng> {
    wordlist: Wordlist,
    rng: R,
}

impl MnemonicGenerator<OsRng> {
    /// Generator backed by the operating system's entropy source
    pub fn new(wordlist: Wordlist) -> Self {
        Self::with_rng(wordlist, OsRng)
    }
}

impl<R: RngCore + CryptoRng> MnemonicGenerator<R> {
    pub fn with_rng(wordlist: Wordlist, rng: R) -> Self {
        Self { wordlist, rng }
    }

    /// Generate a new phrase of 24 independently drawn words
    ///
    /// Words may repeat across positions.
    pub fn generate(&mut self) -> Result<RecoveryPhrase> {
        // Partial phrases are scrubbed on drop if generation bails out
        let mut phrase = RecoveryPhrase {
            words: Vec::with_capacity(PHRASE_WORDS),
        };

        for _ in 0..PHRASE_WORDS {
            let index = draw_index(&mut self.rng, self.wordlist.len()).map_err(|e| {
                error!("Secure entropy source failed during phrase generation");
                e
            })?;
            let word = self
                .wordlist
                .get(index)
                .ok_or_else(|| Error::InvalidInput(format!("wordlist index {} out of range", index)))?;
            phrase.words.push(word.to_string());
        }

        debug!("Generated recovery phrase of {} words", phrase.len());
        Ok(phrase)
    }
}

/// Draw a uniform index in `0..bound` by rejection sampling
///
/// `gen_range` would panic when the source fails; `try_fill_bytes` reports it.
fn draw_index<R: RngCore + CryptoRng>(rng: &mut R, bound: usize) -> Result<usize> {
    let bound = u32::try_from(bound)
        .map_err(|_| Error::InvalidInput(format!("wordlist of {} entries is too large", bound)))?;
    if bound == 0 {
        return Err(Error::InvalidInput("wordlist is empty".to_string()));
    }

    // Largest value whose residue class is complete
    let rem = (u32::MAX % bound + 1) % bound;
    let limit = u32::MAX - rem;

    let mut buf = [0u8; 4];
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        let value = u32::from_le_bytes(buf);
        if value <= limit {
            buf.zeroize();
            return Ok((value % bound) as usize);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Secure-typed source that always fails
    pub(crate) struct BrokenEntropy;

    impl RngCore for BrokenEntropy {
        fn next_u32(&mut self) -> u32 {
            unreachable!("entropy is unavailable")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("entropy is unavailable")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("entropy is unavailable")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("entropy device closed"))
        }
    }

    impl CryptoRng for BrokenEntropy {}

    #[test]
    fn test_generate_phrase() {
        let mut generator = MnemonicGenerator::new(Wordlist::english());
        let phrase = generator.generate().unwrap();

        assert_eq!(phrase.len(), PHRASE_WORDS);
        assert!(phrase.words().all(|w| Wordlist::english().contains(w)));
    }

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let wordlist = Wordlist::english();
        let a = MnemonicGenerator::with_rng(wordlist, StdRng::seed_from_u64(7))
            .generate()
            .unwrap();
        let b = MnemonicGenerator::with_rng(wordlist, StdRng::seed_from_u64(7))
            .generate()
            .unwrap();

        assert!(a.words().eq(b.words()));
    }

    #[test]
    fn test_entropy_failure() {
        let mut generator = MnemonicGenerator::with_rng(Wordlist::english(), BrokenEntropy);
        let err = generator.generate().unwrap_err();

        assert!(matches!(err, Error::EntropyUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_words_checks_length_and_membership() {
        let wordlist = Wordlist::english();

        let short = vec!["abandon".to_string(); 12];
        assert!(RecoveryPhrase::from_words(short, &wordlist).is_err());

        let mut words = vec!["abandon".to_string(); PHRASE_WORDS];
        words[3] = "notaword".to_string();
        let err = RecoveryPhrase::from_words(words, &wordlist).unwrap_err();
        assert!(err.to_string().contains("position 3"));

        let words = vec!["zoo".to_string(); PHRASE_WORDS];
        let phrase = RecoveryPhrase::from_words(words, &wordlist).unwrap();
        assert_eq!(phrase.word(23), Some("zoo"));
        assert_eq!(phrase.word(24), None);
    }

    #[test]
    fn test_debug_is_redacted() {
        let words = vec!["abandon".to_string(); PHRASE_WORDS];
        let phrase = RecoveryPhrase::from_words(words, &Wordlist::english()).unwrap();
        let printed = format!("{:?}", phrase);

        assert!(!printed.contains("abandon"));
        assert!(printed.contains("24 words"));
    }

    #[test]
    fn test_draw_index_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for bound in [1usize, 2, 3, 2048, 4096] {
            for _ in 0..200 {
                assert!(draw_index(&mut rng, bound).unwrap() < bound);
            }
        }
    }
}
