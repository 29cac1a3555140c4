//! Single-owner access to the wizard from async code
//!
//! `SetupController` is a cheap, cloneable handle. The state machine itself
//! lives inside one spawned task and every affordance is a message to it,
//! so mutations are serialized no matter how many handles exist.

use bitcoin::Network;
use rand::{CryptoRng, RngCore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::datadir::{DataDirSelected, DataDirectory};
use super::machine::{CompletedSetup, ConfirmView, OnboardingStateMachine, SetupSnapshot};
use super::step::OnboardingStep;
use crate::error::{Error, Result};

type Reply<T> = oneshot::Sender<Result<T>>;

enum SetupCommand {
    SelectNetwork(Network, Reply<OnboardingStep>),
    SelectDataDir(DataDirSelected, Reply<OnboardingStep>),
    ContinueSetup(Reply<OnboardingStep>),
    CreateNewWallet(Reply<OnboardingStep>),
    ChooseRestore(Reply<OnboardingStep>),
    DisplayWords(Reply<Zeroizing<Vec<String>>>),
    AcknowledgePhrase(Reply<OnboardingStep>),
    ConfirmView(Reply<ConfirmView>),
    SetConfirmationWord(usize, Zeroizing<String>, Reply<bool>),
    SubmitConfirmation(Reply<OnboardingStep>),
    SubmitPassphrase(Zeroizing<String>, Zeroizing<String>, Reply<CompletedSetup>),
    Cancel(Reply<OnboardingStep>),
    Reset(Reply<()>),
    Snapshot(oneshot::Sender<SetupSnapshot>),
}

/// Handle to the task owning an `OnboardingStateMachine`
#[derive(Clone)]
pub struct SetupController {
    tx: mpsc::Sender<SetupCommand>,
}

impl SetupController {
    /// Move `machine` into its own task and return a handle to it
    ///
    /// The task ends, dropping and scrubbing the machine, once every
    /// handle is gone.
    pub fn spawn<D, R>(machine: OnboardingStateMachine<D, R>) -> (Self, JoinHandle<()>)
    where
        D: DataDirectory + Send + 'static,
        R: RngCore + CryptoRng + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(run(machine, rx));
        (Self { tx }, handle)
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> SetupCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::ControllerStopped)?;
        response.await.map_err(|_| Error::ControllerStopped)?
    }

    pub async fn select_network(&self, network: Network) -> Result<OnboardingStep> {
        self.call(|r| SetupCommand::SelectNetwork(network, r)).await
    }

    /// Deliver the directory picker's choice
    pub async fn select_data_dir(&self, event: DataDirSelected) -> Result<OnboardingStep> {
        self.call(|r| SetupCommand::SelectDataDir(event, r)).await
    }

    pub async fn continue_setup(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::ContinueSetup).await
    }

    pub async fn create_new_wallet(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::CreateNewWallet).await
    }

    pub async fn choose_restore(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::ChooseRestore).await
    }

    /// Copy of the phrase for display, zeroized when dropped
    pub async fn display_words(&self) -> Result<Zeroizing<Vec<String>>> {
        self.call(SetupCommand::DisplayWords).await
    }

    pub async fn acknowledge_phrase(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::AcknowledgePhrase).await
    }

    pub async fn confirm_view(&self) -> Result<ConfirmView> {
        self.call(SetupCommand::ConfirmView).await
    }

    pub async fn set_confirmation_word(&self, position: usize, text: impl Into<String>) -> Result<bool> {
        let text = Zeroizing::new(text.into());
        self.call(|r| SetupCommand::SetConfirmationWord(position, text, r)).await
    }

    pub async fn submit_confirmation(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::SubmitConfirmation).await
    }

    pub async fn submit_passphrase(
        &self,
        passphrase: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Result<CompletedSetup> {
        let passphrase = Zeroizing::new(passphrase.into());
        let confirmation = Zeroizing::new(confirmation.into());
        self.call(|r| SetupCommand::SubmitPassphrase(passphrase, confirmation, r))
            .await
    }

    pub async fn cancel(&self) -> Result<OnboardingStep> {
        self.call(SetupCommand::Cancel).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.call(SetupCommand::Reset).await
    }

    pub async fn snapshot(&self) -> Result<SetupSnapshot> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SetupCommand::Snapshot(reply))
            .await
            .map_err(|_| Error::ControllerStopped)?;
        response.await.map_err(|_| Error::ControllerStopped)
    }
}

async fn run<D, R>(mut machine: OnboardingStateMachine<D, R>, mut rx: mpsc::Receiver<SetupCommand>)
where
    D: DataDirectory,
    R: RngCore + CryptoRng,
{
    info!("Setup controller started");

    while let Some(command) = rx.recv().await {
        // A dropped reply receiver only means the caller stopped waiting
        match command {
            SetupCommand::SelectNetwork(network, reply) => {
                let _ = reply.send(machine.select_network(network));
            }
            SetupCommand::SelectDataDir(event, reply) => {
                let _ = reply.send(machine.select_data_dir(event));
            }
            SetupCommand::ContinueSetup(reply) => {
                let _ = reply.send(machine.continue_setup());
            }
            SetupCommand::CreateNewWallet(reply) => {
                let _ = reply.send(machine.create_new_wallet());
            }
            SetupCommand::ChooseRestore(reply) => {
                let _ = reply.send(machine.choose_restore());
            }
            SetupCommand::DisplayWords(reply) => {
                let words = machine.display_words().map(|words| {
                    Zeroizing::new(words.into_iter().map(str::to_string).collect())
                });
                let _ = reply.send(words);
            }
            SetupCommand::AcknowledgePhrase(reply) => {
                let _ = reply.send(machine.acknowledge_phrase());
            }
            SetupCommand::ConfirmView(reply) => {
                let _ = reply.send(machine.confirm_view());
            }
            SetupCommand::SetConfirmationWord(position, text, reply) => {
                let _ = reply.send(machine.set_confirmation_word(position, text.as_str()));
            }
            SetupCommand::SubmitConfirmation(reply) => {
                let _ = reply.send(machine.submit_confirmation());
            }
            SetupCommand::SubmitPassphrase(passphrase, confirmation, reply) => {
                let _ = reply.send(machine.submit_passphrase(&passphrase, &confirmation));
            }
            SetupCommand::Cancel(reply) => {
                let _ = reply.send(machine.cancel());
            }
            SetupCommand::Reset(reply) => {
                machine.reset();
                let _ = reply.send(Ok(()));
            }
            SetupCommand::Snapshot(reply) => {
                let _ = reply.send(machine.snapshot());
            }
        }
    }

    debug!("All setup handles dropped, scrubbing wizard");
    drop(machine);
    info!("Setup controller stopped");
}
