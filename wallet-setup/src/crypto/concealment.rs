//! Selection of phrase positions hidden during confirmation

use std::collections::BTreeSet;

use rand::rngs::{OsRng, StdRng};
use rand::seq::index;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use super::mnemonic::RecoveryPhrase;
use crate::error::{Error, Result};

/// Share of the phrase hidden when nothing else is configured
pub const DEFAULT_CONCEAL_RATIO: f64 = 0.25;

/// How hidden positions are chosen
#[derive(Debug, Clone, PartialEq)]
pub enum ConcealmentPolicy {
    /// Hide `round(ratio * len)` positions picked with OS entropy
    Ratio(f64),
    /// Hide exactly this many positions picked with OS entropy
    FixedCount(usize),
    /// Hide `count` positions picked by a seeded generator
    Seeded { count: usize, seed: u64 },
    /// Hide exactly these positions
    Positions(Vec<usize>),
}

impl Default for ConcealmentPolicy {
    fn default() -> Self {
        Self::Ratio(DEFAULT_CONCEAL_RATIO)
    }
}

/// Set of hidden word positions
///
/// At least one word is hidden and at least one stays visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcealmentMask {
    len: usize,
    hidden: BTreeSet<usize>,
}

impl ConcealmentMask {
    pub fn new(len: usize, hidden: impl IntoIterator<Item = usize>) -> Result<Self> {
        let hidden: BTreeSet<usize> = hidden.into_iter().collect();

        if let Some(&position) = hidden.iter().find(|&&p| p >= len) {
            return Err(Error::InvalidInput(format!(
                "hidden position {} is outside a phrase of {} words",
                position, len
            )));
        }
        if hidden.is_empty() || hidden.len() >= len {
            return Err(Error::InvalidInput(format!(
                "must hide between 1 and {} positions, got {}",
                len.saturating_sub(1),
                hidden.len()
            )));
        }

        Ok(Self { len, hidden })
    }

    pub fn is_hidden(&self, position: usize) -> bool {
        self.hidden.contains(&position)
    }

    /// Hidden positions in ascending order
    pub fn hidden_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.hidden.iter().copied()
    }

    /// Visible positions in ascending order
    pub fn visible_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |p| !self.hidden.contains(p))
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}

/// Choose which positions of `phrase` to hide
pub fn conceal(phrase: &RecoveryPhrase, policy: &ConcealmentPolicy) -> Result<ConcealmentMask> {
    let len = phrase.len();

    let mask = match policy {
        ConcealmentPolicy::Ratio(ratio) => {
            if !ratio.is_finite() || *ratio <= 0.0 || *ratio >= 1.0 {
                return Err(Error::InvalidInput(format!(
                    "concealment ratio must be between 0 and 1, got {}",
                    ratio
                )));
            }
            let count = ((ratio * len as f64).round() as usize).clamp(1, len.saturating_sub(1));
            sample(len, count, os_seeded_rng()?)?
        }
        ConcealmentPolicy::FixedCount(count) => {
            check_count(*count, len)?;
            sample(len, *count, os_seeded_rng()?)?
        }
        ConcealmentPolicy::Seeded { count, seed } => {
            check_count(*count, len)?;
            sample(len, *count, StdRng::seed_from_u64(*seed))?
        }
        ConcealmentPolicy::Positions(positions) => {
            ConcealmentMask::new(len, positions.iter().copied())?
        }
    };

    debug!("Concealed {} of {} phrase positions", mask.hidden_count(), len);
    Ok(mask)
}

fn check_count(count: usize, len: usize) -> Result<()> {
    if count == 0 || count >= len {
        return Err(Error::InvalidInput(format!(
            "must hide between 1 and {} positions, got {}",
            len.saturating_sub(1),
            count
        )));
    }
    Ok(())
}

fn os_seeded_rng() -> Result<StdRng> {
    StdRng::from_rng(OsRng).map_err(|e| Error::EntropyUnavailable(e.to_string()))
}

fn sample(len: usize, count: usize, mut rng: StdRng) -> Result<ConcealmentMask> {
    ConcealmentMask::new(len, index::sample(&mut rng, len, count).into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mnemonic::PHRASE_WORDS;
    use crate::crypto::wordlist::Wordlist;

    fn phrase() -> RecoveryPhrase {
        let words = vec!["abandon".to_string(); PHRASE_WORDS];
        RecoveryPhrase::from_words(words, &Wordlist::english()).unwrap()
    }

    #[test]
    fn test_default_ratio_hides_six() {
        let mask = conceal(&phrase(), &ConcealmentPolicy::default()).unwrap();
        assert_eq!(mask.hidden_count(), 6);
        assert_eq!(mask.visible_positions().count(), 18);
    }

    #[test]
    fn test_ratio_clamps_to_invariant() {
        let tiny = conceal(&phrase(), &ConcealmentPolicy::Ratio(0.001)).unwrap();
        assert_eq!(tiny.hidden_count(), 1);

        let huge = conceal(&phrase(), &ConcealmentPolicy::Ratio(0.999)).unwrap();
        assert_eq!(huge.hidden_count(), 23);

        assert!(conceal(&phrase(), &ConcealmentPolicy::Ratio(1.0)).is_err());
        assert!(conceal(&phrase(), &ConcealmentPolicy::Ratio(f64::NAN)).is_err());
    }

    #[test]
    fn test_fixed_count_bounds() {
        assert!(conceal(&phrase(), &ConcealmentPolicy::FixedCount(0)).is_err());
        assert!(conceal(&phrase(), &ConcealmentPolicy::FixedCount(24)).is_err());

        for count in 1..PHRASE_WORDS {
            let mask = conceal(&phrase(), &ConcealmentPolicy::FixedCount(count)).unwrap();
            assert_eq!(mask.hidden_count(), count);
            assert!(mask.hidden_positions().all(|p| p < PHRASE_WORDS));
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let policy = ConcealmentPolicy::Seeded { count: 5, seed: 42 };
        let a = conceal(&phrase(), &policy).unwrap();
        let b = conceal(&phrase(), &policy).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hidden_count(), 5);
    }

    #[test]
    fn test_explicit_positions() {
        let policy = ConcealmentPolicy::Positions(vec![18, 2, 5, 9, 14, 5]);
        let mask = conceal(&phrase(), &policy).unwrap();
        assert_eq!(mask.hidden_positions().collect::<Vec<_>>(), vec![2, 5, 9, 14, 18]);
        assert!(mask.is_hidden(9));
        assert!(!mask.is_hidden(10));

        assert!(conceal(&phrase(), &ConcealmentPolicy::Positions(vec![])).is_err());
        assert!(conceal(&phrase(), &ConcealmentPolicy::Positions(vec![24])).is_err());
        assert!(conceal(&phrase(), &ConcealmentPolicy::Positions((0..24).collect())).is_err());
    }
}
