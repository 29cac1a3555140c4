//! Wizard steps

use std::fmt;

use serde::{Deserialize, Serialize};

/// Onboarding steps in their only allowed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    NetworkSelect,
    DataDirSelect,
    WalletChoice,
    MnemonicDisplay,
    MnemonicConfirm,
    PassphraseSetup,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 6] = [
        Self::NetworkSelect,
        Self::DataDirSelect,
        Self::WalletChoice,
        Self::MnemonicDisplay,
        Self::MnemonicConfirm,
        Self::PassphraseSetup,
    ];

    /// The step that follows this one, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::NetworkSelect => Some(Self::DataDirSelect),
            Self::DataDirSelect => Some(Self::WalletChoice),
            Self::WalletChoice => Some(Self::MnemonicDisplay),
            Self::MnemonicDisplay => Some(Self::MnemonicConfirm),
            Self::MnemonicConfirm => Some(Self::PassphraseSetup),
            Self::PassphraseSetup => None,
        }
    }

    /// 1-based position in the wizard
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::NetworkSelect => "Select network",
            Self::DataDirSelect => "Blockchain location",
            Self::WalletChoice => "Create or restore wallet",
            Self::MnemonicDisplay => "Write down your recovery phrase",
            Self::MnemonicConfirm => "Confirm your recovery phrase",
            Self::PassphraseSetup => "Set a passphrase",
        }
    }

    /// Whether this step needs a live recovery phrase
    pub fn holds_secret(self) -> bool {
        self >= Self::MnemonicDisplay
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NetworkSelect => "network selection",
            Self::DataDirSelect => "data directory selection",
            Self::WalletChoice => "wallet choice",
            Self::MnemonicDisplay => "mnemonic display",
            Self::MnemonicConfirm => "mnemonic confirmation",
            Self::PassphraseSetup => "passphrase setup",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_chain_in_order() {
        for pair in OnboardingStep::ALL.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(OnboardingStep::PassphraseSetup.next(), None);
        assert_eq!(OnboardingStep::NetworkSelect.number(), 1);
        assert_eq!(OnboardingStep::PassphraseSetup.number(), 6);
    }

    #[test]
    fn test_secret_steps_follow_wallet_choice() {
        let secret: Vec<_> = OnboardingStep::ALL
            .into_iter()
            .filter(|step| step.holds_secret())
            .collect();
        assert_eq!(
            secret,
            vec![
                OnboardingStep::MnemonicDisplay,
                OnboardingStep::MnemonicConfirm,
                OnboardingStep::PassphraseSetup,
            ]
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&OnboardingStep::MnemonicConfirm).unwrap();
        assert_eq!(json, "\"mnemonic_confirm\"");
    }
}
