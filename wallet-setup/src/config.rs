//! Setup configuration from the process environment

use std::path::PathBuf;

use crate::crypto::{ConcealmentPolicy, DEFAULT_CONCEAL_RATIO, PHRASE_WORDS};

pub const ENV_TEST_MODE: &str = "WALLET_SETUP_TEST";
pub const ENV_REINITIALIZE: &str = "REINITIALIZE_WALLET_SETUP";
pub const ENV_NETWORK: &str = "WALLET_SETUP_NETWORK";
pub const ENV_CONCEAL_RATIO: &str = "WALLET_SETUP_CONCEAL_RATIO";
pub const ENV_CONCEAL_SEED: &str = "WALLET_SETUP_CONCEAL_SEED";
pub const ENV_PROGRESS_FILE: &str = "WALLET_SETUP_PROGRESS_FILE";

/// Onboarding configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SetupConfig {
    /// Test/diagnostic mode
    pub test_mode: bool,
    /// Start from a fresh session, ignoring persisted progress
    pub reinitialize: bool,
    /// Network preselected before the wizard starts
    pub network: Option<String>,
    /// Share of words hidden, strictly between 0 and 1
    pub conceal_ratio: f64,
    /// Makes concealment deterministic when set
    pub conceal_seed: Option<u64>,
    /// Where non-secret progress is persisted; none disables persistence
    ///
    /// Opt-in because the data directory is not known until the wizard
    /// has run.
    pub progress_file: Option<PathBuf>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            reinitialize: false,
            network: None,
            conceal_ratio: DEFAULT_CONCEAL_RATIO,
            conceal_seed: None,
            progress_file: None,
        }
    }
}

impl SetupConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let conceal_ratio = lookup(ENV_CONCEAL_RATIO)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0 && *ratio < 1.0)
            .unwrap_or(defaults.conceal_ratio);

        Self {
            test_mode: lookup(ENV_TEST_MODE).map(|v| parse_flag(&v)).unwrap_or(false),
            reinitialize: lookup(ENV_REINITIALIZE).map(|v| parse_flag(&v)).unwrap_or(false),
            network: lookup(ENV_NETWORK).filter(|v| !v.trim().is_empty()),
            conceal_ratio,
            conceal_seed: lookup(ENV_CONCEAL_SEED).and_then(|v| v.trim().parse().ok()),
            progress_file: lookup(ENV_PROGRESS_FILE)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Concealment strategy implied by this configuration
    pub fn concealment_policy(&self) -> ConcealmentPolicy {
        match self.conceal_seed {
            Some(seed) => {
                let count = (self.conceal_ratio * PHRASE_WORDS as f64).round() as usize;
                ConcealmentPolicy::Seeded {
                    count: count.clamp(1, PHRASE_WORDS - 1),
                    seed,
                }
            }
            None => ConcealmentPolicy::Ratio(self.conceal_ratio),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SetupConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SetupConfig::default());
        assert_eq!(config.concealment_policy(), ConcealmentPolicy::Ratio(0.25));
    }

    #[test]
    fn test_bootstrap_flags() {
        let config = SetupConfig::from_lookup(lookup(&[
            (ENV_TEST_MODE, "true"),
            (ENV_REINITIALIZE, "1"),
            (ENV_NETWORK, "regtest"),
            (ENV_PROGRESS_FILE, "/tmp/progress.json"),
        ]));
        assert!(config.test_mode);
        assert!(config.reinitialize);
        assert_eq!(config.network.as_deref(), Some("regtest"));
        assert_eq!(config.progress_file, Some(PathBuf::from("/tmp/progress.json")));
    }

    #[test]
    fn test_seed_makes_policy_deterministic() {
        let config = SetupConfig::from_lookup(lookup(&[
            (ENV_CONCEAL_RATIO, "0.5"),
            (ENV_CONCEAL_SEED, "99"),
        ]));
        assert_eq!(
            config.concealment_policy(),
            ConcealmentPolicy::Seeded { count: 12, seed: 99 }
        );
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let config = SetupConfig::from_lookup(lookup(&[
            (ENV_TEST_MODE, "maybe"),
            (ENV_CONCEAL_RATIO, "lots"),
            (ENV_CONCEAL_SEED, "-x"),
        ]));
        assert!(!config.test_mode);
        assert_eq!(config.conceal_ratio, DEFAULT_CONCEAL_RATIO);
        assert_eq!(config.conceal_seed, None);

        for ratio in ["0", "0.0", "1", "1.5", "-0.25", "NaN", "inf"] {
            let config = SetupConfig::from_lookup(lookup(&[(ENV_CONCEAL_RATIO, ratio)]));
            assert_eq!(config.conceal_ratio, DEFAULT_CONCEAL_RATIO, "ratio {}", ratio);
        }
    }

    #[test]
    fn test_out_of_range_ratio_still_creates_wallets() {
        use crate::crypto::{conceal, RecoveryPhrase, Wordlist};

        let words = vec!["abandon".to_string(); PHRASE_WORDS];
        let phrase = RecoveryPhrase::from_words(words, &Wordlist::english()).unwrap();

        for seed in [None, Some("7")] {
            let mut pairs = vec![(ENV_CONCEAL_RATIO, "0.0")];
            if let Some(seed) = seed {
                pairs.push((ENV_CONCEAL_SEED, seed));
            }
            let config = SetupConfig::from_lookup(lookup(&pairs));
            let mask = conceal(&phrase, &config.concealment_policy()).unwrap();
            assert_eq!(mask.hidden_count(), 6);
        }
    }
}
