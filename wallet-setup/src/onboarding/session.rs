//! Secret-bearing state of one wallet creation

use std::path::{Path, PathBuf};

use bitcoin::Network;
use tracing::debug;

use crate::crypto::{
    is_submittable, validate, ConcealmentMask, ConfirmationAttempt, ConfirmationResult,
    RecoveryPhrase,
};

/// Everything a single "create new wallet" run owns
///
/// The session is the only holder of its phrase. Dropping the session
/// zeroizes the phrase and any typed confirmation words.
#[derive(Debug)]
pub struct WalletSetupSession {
    network: Network,
    data_dir: PathBuf,
    phrase: RecoveryPhrase,
    mask: ConcealmentMask,
    attempt: ConfirmationAttempt,
    failed_positions: Vec<usize>,
    confirmed: bool,
}

impl WalletSetupSession {
    pub(crate) fn new(
        network: Network,
        data_dir: PathBuf,
        phrase: RecoveryPhrase,
        mask: ConcealmentMask,
    ) -> Self {
        debug!(
            "Opened wallet setup session ({} hidden positions)",
            mask.hidden_count()
        );
        Self {
            network,
            data_dir,
            phrase,
            mask,
            attempt: ConfirmationAttempt::new(),
            failed_positions: Vec::new(),
            confirmed: false,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn mask(&self) -> &ConcealmentMask {
        &self.mask
    }

    pub(crate) fn phrase(&self) -> &RecoveryPhrase {
        &self.phrase
    }

    pub fn attempt(&self) -> &ConfirmationAttempt {
        &self.attempt
    }

    /// Positions rejected by the last submission
    pub fn failed_positions(&self) -> &[usize] {
        &self.failed_positions
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Store the user's text for a hidden position; returns submit readiness
    pub(crate) fn set_word(&mut self, position: usize, text: String) -> bool {
        if text.trim().is_empty() {
            self.attempt.remove(position);
        } else {
            self.attempt.set(position, text);
        }
        self.is_submittable()
    }

    pub fn is_submittable(&self) -> bool {
        is_submittable(&self.attempt, &self.mask)
    }

    /// Validate the current attempt
    ///
    /// On rejection only the failed entries are cleared, so correct words
    /// stay filled in for the retry.
    pub(crate) fn submit(&mut self) -> ConfirmationResult {
        let result = validate(&self.phrase, &self.mask, &self.attempt);
        match &result {
            ConfirmationResult::Confirmed => {
                self.failed_positions.clear();
                self.attempt.clear();
                self.confirmed = true;
            }
            ConfirmationResult::Rejected(failed) => {
                for &position in failed {
                    self.attempt.remove(position);
                }
                self.failed_positions = failed.clone();
            }
        }
        result
    }

    /// Split into the parts handed over on completion
    pub(crate) fn into_parts(self) -> (Network, PathBuf, RecoveryPhrase) {
        (self.network, self.data_dir, self.phrase)
    }
}
