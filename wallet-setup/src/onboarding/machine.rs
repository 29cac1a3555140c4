//! The onboarding wizard
//!
//! `OnboardingStateMachine` walks a new wallet through
//! network → data directory → wallet choice → phrase display →
//! phrase confirmation → passphrase. Every affordance checks the current
//! step first; an out-of-order call fails with `InvalidTransition` and
//! leaves the machine untouched. Failed checks (bad directory, wrong
//! words) keep the machine at the step where they happened.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bitcoin::Network;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::datadir::{DataDirSelected, DataDirectory, DirectoryLease, FsDataDirectory};
use super::progress::{ProgressStore, SetupProgress};
use super::session::WalletSetupSession;
use super::step::OnboardingStep;
use crate::config::SetupConfig;
use crate::crypto::{conceal, ConcealmentPolicy, ConfirmationResult, MnemonicGenerator, RecoveryPhrase, Wordlist};
use crate::error::{Error, Result};

/// Shortest passphrase accepted at the last step
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Parse a network name such as `regtest`, `testnet` or `main`
pub fn parse_network(name: &str) -> Result<Network> {
    let name = name.trim().to_ascii_lowercase();
    let alias = match name.as_str() {
        "mainnet" => "bitcoin",
        other => other,
    };
    Network::from_str(alias)
        .or_else(|_| Network::from_core_arg(alias))
        .map_err(|_| Error::InvalidInput(format!("unknown network '{}'", name)))
}

/// One slot of the confirmation view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmSlot {
    Visible { position: usize, word: String },
    Hidden { position: usize, input: String },
}

/// What the presentation layer shows while the user retypes hidden words
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmView {
    pub slots: Vec<ConfirmSlot>,
    pub submittable: bool,
    pub failed_positions: Vec<usize>,
}

impl Drop for ConfirmView {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            match slot {
                ConfirmSlot::Visible { word, .. } => word.zeroize(),
                ConfirmSlot::Hidden { input, .. } => input.zeroize(),
            }
        }
    }
}

/// Non-secret summary of the wizard, safe to log or print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupSnapshot {
    pub step: OnboardingStep,
    pub completed: bool,
    pub network: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub hidden_positions: Vec<usize>,
    pub submittable: bool,
    pub failed_positions: Vec<usize>,
}

/// Result of a finished wizard
///
/// Takes over the phrase from the session that produced it.
pub struct CompletedSetup {
    pub network: Network,
    pub data_dir: PathBuf,
    pub phrase: RecoveryPhrase,
    pub passphrase: Zeroizing<String>,
}

impl fmt::Debug for CompletedSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletedSetup")
            .field("network", &self.network)
            .field("data_dir", &self.data_dir)
            .field("phrase", &self.phrase)
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// Wallet onboarding wizard
pub struct OnboardingStateMachine<D = FsDataDirectory, R = OsRng> {
    step: OnboardingStep,
    completed: bool,
    network: Option<Network>,
    data_dir: Option<DirectoryLease>,
    session: Option<WalletSetupSession>,
    generator: MnemonicGenerator<R>,
    policy: ConcealmentPolicy,
    directory: D,
    progress: Option<ProgressStore>,
}

impl OnboardingStateMachine {
    /// Production wizard: OS entropy, process-wide wordlist, local filesystem
    pub fn new(policy: ConcealmentPolicy) -> Self {
        Self::with_components(
            MnemonicGenerator::new(*Wordlist::global()),
            policy,
            FsDataDirectory,
        )
    }

    /// Build the wizard described by `config`
    ///
    /// Persisted progress is resumed unless `reinitialize` is set, in which
    /// case it is discarded.
    pub fn from_config(config: &SetupConfig) -> Result<Self> {
        let mut machine = Self::new(config.concealment_policy());
        if let Some(path) = &config.progress_file {
            machine = machine.with_progress_store(ProgressStore::new(path));
        }

        if config.reinitialize {
            info!("Reinitializing wallet setup");
            machine.reset();
        } else {
            machine.resume()?;
        }

        if let Some(name) = &config.network {
            if machine.step == OnboardingStep::NetworkSelect {
                machine.select_network(parse_network(name)?)?;
            }
        }

        Ok(machine)
    }
}

impl<D: DataDirectory, R: RngCore + CryptoRng> OnboardingStateMachine<D, R> {
    pub fn with_components(generator: MnemonicGenerator<R>, policy: ConcealmentPolicy, directory: D) -> Self {
        Self {
            step: OnboardingStep::NetworkSelect,
            completed: false,
            network: None,
            data_dir: None,
            session: None,
            generator,
            policy,
            directory,
            progress: None,
        }
    }

    pub fn with_progress_store(mut self, store: ProgressStore) -> Self {
        self.progress = Some(store);
        self
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    /// True once the passphrase was accepted and the phrase handed over
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn network(&self) -> Option<Network> {
        self.network
    }

    /// The accepted data directory, for display
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_ref().map(DirectoryLease::path)
    }

    pub fn session(&self) -> Option<&WalletSetupSession> {
        self.session.as_ref()
    }

    /// Record the chosen network
    ///
    /// Allowed while the network or directory is being chosen. Leaves
    /// network selection once a directory has also been accepted.
    pub fn select_network(&mut self, network: Network) -> Result<OnboardingStep> {
        self.require(
            "select a network",
            &[OnboardingStep::NetworkSelect, OnboardingStep::DataDirSelect],
        )?;

        info!("Selected network {}", network);
        self.network = Some(network);
        self.leave_network_select();
        self.persist();
        Ok(self.step)
    }

    pub fn select_network_by_name(&mut self, name: &str) -> Result<OnboardingStep> {
        let network = parse_network(name)?;
        self.select_network(network)
    }

    /// Accept a directory chosen by the picker
    ///
    /// The directory is created or claimed through the filesystem
    /// collaborator and stays locked until another directory is chosen or
    /// the wizard is reset or dropped. On failure the previous choice and
    /// step are kept.
    pub fn select_data_dir(&mut self, event: DataDirSelected) -> Result<OnboardingStep> {
        self.require(
            "select a data directory",
            &[OnboardingStep::NetworkSelect, OnboardingStep::DataDirSelect],
        )?;

        let requested = Path::new(&event.path);
        if self.data_dir().is_some_and(|held| held == requested) {
            debug!("Data directory {} already held", requested.display());
        } else {
            let lease = match self.directory.prepare(requested) {
                Ok(lease) => lease,
                Err(e) => {
                    warn!("Data directory rejected: {}", e);
                    return Err(e);
                }
            };
            info!("Selected data directory {}", lease.path().display());
            self.data_dir = Some(lease);
        }
        self.leave_network_select();
        self.persist();
        Ok(self.step)
    }

    fn leave_network_select(&mut self) {
        if self.step == OnboardingStep::NetworkSelect && self.network.is_some() && self.data_dir.is_some() {
            self.advance(OnboardingStep::DataDirSelect);
        }
    }

    /// Confirm network and directory and move on to the wallet choice
    pub fn continue_setup(&mut self) -> Result<OnboardingStep> {
        self.require("continue setup", &[OnboardingStep::DataDirSelect])?;
        self.advance(OnboardingStep::WalletChoice);
        self.persist();
        Ok(self.step)
    }

    /// Start a new wallet: generate a phrase and pick the hidden positions
    pub fn create_new_wallet(&mut self) -> Result<OnboardingStep> {
        self.require("create a new wallet", &[OnboardingStep::WalletChoice])?;

        let (network, data_dir) = match (self.network, self.data_dir().map(Path::to_path_buf)) {
            (Some(network), Some(data_dir)) => (network, data_dir),
            _ => {
                return Err(Error::InvalidTransition {
                    action: "create a new wallet",
                    step: self.step,
                })
            }
        };

        let phrase = match self.generator.generate() {
            Ok(phrase) => phrase,
            Err(e) => {
                error!("Cannot generate recovery phrase, onboarding halted: {}", e);
                self.session = None;
                return Err(e);
            }
        };
        let mask = conceal(&phrase, &self.policy)?;

        self.session = Some(WalletSetupSession::new(network, data_dir, phrase, mask));
        self.advance(OnboardingStep::MnemonicDisplay);
        Ok(self.step)
    }

    /// Restoring from an existing phrase is not part of this wizard
    pub fn choose_restore(&mut self) -> Result<OnboardingStep> {
        self.require("restore a wallet", &[OnboardingStep::WalletChoice])?;
        Err(Error::NotSupported(
            "restoring an existing wallet from its recovery phrase".to_string(),
        ))
    }

    /// The full phrase; only while it is being displayed
    pub fn display_words(&self) -> Result<Vec<&str>> {
        self.require("display the recovery phrase", &[OnboardingStep::MnemonicDisplay])?;
        let session = self.live_session("display the recovery phrase")?;
        Ok(session.phrase().words().collect())
    }

    /// The user has written the phrase down
    pub fn acknowledge_phrase(&mut self) -> Result<OnboardingStep> {
        self.require("acknowledge the recovery phrase", &[OnboardingStep::MnemonicDisplay])?;
        self.advance(OnboardingStep::MnemonicConfirm);
        Ok(self.step)
    }

    /// Visible words plus inputs for the hidden ones
    pub fn confirm_view(&self) -> Result<ConfirmView> {
        self.require("view the confirmation", &[OnboardingStep::MnemonicConfirm])?;
        let session = self.live_session("view the confirmation")?;

        let slots = (0..session.phrase().len())
            .map(|position| {
                if session.mask().is_hidden(position) {
                    ConfirmSlot::Hidden {
                        position,
                        input: session.attempt().get(position).unwrap_or_default().to_string(),
                    }
                } else {
                    ConfirmSlot::Visible {
                        position,
                        word: session.phrase().word(position).unwrap_or_default().to_string(),
                    }
                }
            })
            .collect();

        Ok(ConfirmView {
            slots,
            submittable: session.is_submittable(),
            failed_positions: session.failed_positions().to_vec(),
        })
    }

    /// Update the input for one hidden position; returns whether submit is enabled
    pub fn set_confirmation_word(&mut self, position: usize, text: impl Into<String>) -> Result<bool> {
        self.require("enter a confirmation word", &[OnboardingStep::MnemonicConfirm])?;
        let session = self.live_session_mut("enter a confirmation word")?;

        if !session.mask().is_hidden(position) {
            return Err(Error::InvalidInput(format!(
                "position {} is not a hidden word",
                position
            )));
        }

        Ok(session.set_word(position, text.into()))
    }

    /// Submit readiness, recomputed from the current inputs
    pub fn is_submittable(&self) -> bool {
        self.step == OnboardingStep::MnemonicConfirm
            && self.session.as_ref().is_some_and(WalletSetupSession::is_submittable)
    }

    /// Check the typed words; only a full match reaches passphrase setup
    pub fn submit_confirmation(&mut self) -> Result<OnboardingStep> {
        self.require("submit the confirmation", &[OnboardingStep::MnemonicConfirm])?;
        let session = self.live_session_mut("submit the confirmation")?;

        match session.submit() {
            ConfirmationResult::Confirmed => {
                info!("Recovery phrase confirmed");
                self.advance(OnboardingStep::PassphraseSetup);
                Ok(self.step)
            }
            ConfirmationResult::Rejected(positions) => {
                info!("Recovery phrase confirmation failed at positions {:?}", positions);
                Err(Error::ConfirmationMismatch { positions })
            }
        }
    }

    /// Accept the passphrase and finish the wizard
    pub fn submit_passphrase(&mut self, passphrase: &str, confirmation: &str) -> Result<CompletedSetup> {
        self.require("set the passphrase", &[OnboardingStep::PassphraseSetup])?;

        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(Error::InvalidInput(format!(
                "passphrase must be at least {} characters",
                MIN_PASSPHRASE_LEN
            )));
        }
        if passphrase != confirmation {
            return Err(Error::InvalidInput("passphrases do not match".to_string()));
        }

        let session = match self.session.take() {
            Some(session) if session.is_confirmed() => session,
            other => {
                self.session = other;
                return Err(Error::InvalidTransition {
                    action: "set the passphrase",
                    step: self.step,
                });
            }
        };

        let (network, data_dir, phrase) = session.into_parts();
        self.completed = true;
        info!("Wallet setup completed on {}", network);

        Ok(CompletedSetup {
            network,
            data_dir,
            phrase,
            passphrase: Zeroizing::new(passphrase.to_string()),
        })
    }

    /// Abandon the wallet being created and return to the wallet choice
    pub fn cancel(&mut self) -> Result<OnboardingStep> {
        self.require(
            "cancel wallet creation",
            &[
                OnboardingStep::MnemonicDisplay,
                OnboardingStep::MnemonicConfirm,
                OnboardingStep::PassphraseSetup,
            ],
        )?;

        self.scrub();
        self.step = OnboardingStep::WalletChoice;
        info!("Wallet creation cancelled");
        Ok(self.step)
    }

    /// Drop everything, including persisted progress and the directory
    /// lock, and start over
    pub fn reset(&mut self) {
        self.scrub();
        self.step = OnboardingStep::NetworkSelect;
        self.completed = false;
        self.network = None;
        self.data_dir = None;
        if let Some(store) = &self.progress {
            if let Err(e) = store.clear() {
                warn!("Could not clear setup progress: {}", e);
            }
        }
        info!("Wallet setup reset");
    }

    pub fn snapshot(&self) -> SetupSnapshot {
        let session = self.session.as_ref();
        SetupSnapshot {
            step: self.step,
            completed: self.completed,
            network: self.network.map(|n| n.to_string()),
            data_dir: self.data_dir().map(Path::to_path_buf),
            hidden_positions: session
                .map(|s| s.mask().hidden_positions().collect())
                .unwrap_or_default(),
            submittable: self.is_submittable(),
            failed_positions: session
                .map(|s| s.failed_positions().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Restore persisted progress, if any
    fn resume(&mut self) -> Result<()> {
        let Some(progress) = self.progress.as_ref().map(ProgressStore::load).transpose()?.flatten() else {
            return Ok(());
        };

        let network = progress.network.as_deref().and_then(|name| match parse_network(name) {
            Ok(network) => Some(network),
            Err(e) => {
                warn!("Ignoring saved network: {}", e);
                None
            }
        });
        let data_dir = progress.data_dir.as_deref().and_then(|path| match self.directory.prepare(path) {
            Ok(lease) => Some(lease),
            Err(e) => {
                warn!("Ignoring saved data directory: {}", e);
                None
            }
        });

        // A step needing a choice that was not saved falls back to where it is made
        let mut step = progress.resume_step();
        if step > OnboardingStep::NetworkSelect && (network.is_none() || data_dir.is_none()) {
            step = OnboardingStep::NetworkSelect;
        }

        self.network = network;
        self.data_dir = data_dir;
        self.step = step;
        info!("Resumed wallet setup at {}", step);
        Ok(())
    }

    /// Best effort: progress is a convenience and never blocks onboarding
    fn persist(&self) {
        let Some(store) = &self.progress else {
            return;
        };
        let step = if self.step.holds_secret() {
            OnboardingStep::WalletChoice
        } else {
            self.step
        };
        let progress = SetupProgress {
            step,
            network: self.network.map(|n| n.to_string()),
            data_dir: self.data_dir().map(Path::to_path_buf),
        };
        if let Err(e) = store.save(&progress) {
            warn!("Could not save setup progress: {}", e);
        }
    }

    fn require(&self, action: &'static str, allowed: &[OnboardingStep]) -> Result<()> {
        if self.completed || !allowed.contains(&self.step) {
            debug!("Rejected '{}' during {}", action, self.step);
            return Err(Error::InvalidTransition {
                action,
                step: self.step,
            });
        }
        Ok(())
    }

    fn live_session(&self, action: &'static str) -> Result<&WalletSetupSession> {
        self.session.as_ref().ok_or(Error::InvalidTransition {
            action,
            step: self.step,
        })
    }

    fn live_session_mut(&mut self, action: &'static str) -> Result<&mut WalletSetupSession> {
        let step = self.step;
        self.session
            .as_mut()
            .ok_or(Error::InvalidTransition { action, step })
    }

    fn advance(&mut self, to: OnboardingStep) {
        debug_assert_eq!(self.step.next(), Some(to));
        info!("Onboarding step {} -> {}", self.step, to);
        self.step = to;
    }

    fn scrub(&mut self) {
        if self.session.take().is_some() {
            debug!("Scrubbed wallet setup session");
        }
    }
}
