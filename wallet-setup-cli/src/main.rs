//! Wallet Setup CLI
//!
//! Interactive first-run setup: walks the user through network and data
//! directory selection, shows the new recovery phrase, asks for the
//! concealed words back, and sets the passphrase.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use wallet_setup::onboarding::{parse_network, ConfirmSlot, DataDirSelected, SetupSnapshot};
use wallet_setup::{Error, OnboardingStateMachine, OnboardingStep, SetupConfig, SetupController};

#[derive(Parser)]
#[command(name = "wallet-setup")]
#[command(about = "First-run setup for a new wallet")]
#[command(version)]
struct Cli {
    /// Print a JSON snapshot of the wizard after every step
    #[arg(long)]
    test_print: bool,

    /// Discard saved progress and start a fresh setup
    #[arg(long)]
    reinitialize: bool,

    /// Network to use (bitcoin, testnet, signet, regtest)
    #[arg(long)]
    network: Option<String>,

    /// Absolute path of the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// File holding saved setup progress
    #[arg(long)]
    progress_file: Option<PathBuf>,
}

/// Terminal for the wizard
///
/// Snapshots go to `json` only when one is given; prompts and messages go
/// to `human`. In test-print mode `human` is stderr so stdout carries
/// nothing but one JSON snapshot per line.
struct Console<I, J, H> {
    input: Lines<I>,
    json: Option<J>,
    human: H,
}

impl<I, J, H> Console<I, J, H>
where
    I: AsyncBufRead + Unpin,
    J: Write,
    H: Write,
{
    fn new(input: I, json: Option<J>, human: H) -> Self {
        Self {
            input: input.lines(),
            json,
            human,
        }
    }

    fn snapshot(&mut self, snapshot: &SetupSnapshot) -> anyhow::Result<()> {
        if let Some(json) = &mut self.json {
            serde_json::to_writer(&mut *json, snapshot)?;
            writeln!(json)?;
            json.flush()?;
        }
        Ok(())
    }

    async fn prompt(&mut self, message: &str) -> std::io::Result<String> {
        write!(self.human, "{}", message)?;
        self.human.flush()?;

        match self.input.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed before setup finished",
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SetupConfig::from_env();
    config.test_mode |= cli.test_print;
    config.reinitialize |= cli.reinitialize;
    if cli.network.is_some() {
        config.network = cli.network.clone();
    }
    if cli.progress_file.is_some() {
        config.progress_file = cli.progress_file.clone();
    }

    info!("Starting wallet setup {}", wallet_setup::VERSION);

    let machine = OnboardingStateMachine::from_config(&config).context("cannot start wallet setup")?;
    let (controller, handle) = SetupController::spawn(machine);

    let human: Box<dyn Write> = if config.test_mode {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };
    let mut console = Console::new(
        BufReader::new(tokio::io::stdin()),
        config.test_mode.then(std::io::stdout),
        human,
    );

    let result = run_wizard(&controller, cli.data_dir, &mut console).await;

    drop(controller);
    handle.await.context("setup controller panicked")?;
    result
}

async fn run_wizard<I, J, H>(
    controller: &SetupController,
    mut data_dir: Option<PathBuf>,
    console: &mut Console<I, J, H>,
) -> anyhow::Result<()>
where
    I: AsyncBufRead + Unpin,
    J: Write,
    H: Write,
{
    loop {
        let snapshot = controller.snapshot().await?;
        console.snapshot(&snapshot)?;
        if snapshot.completed {
            return Ok(());
        }

        writeln!(console.human)?;
        writeln!(console.human, "Step {}/6: {}", snapshot.step.number(), snapshot.step.title())?;

        let outcome = match snapshot.step {
            OnboardingStep::NetworkSelect => {
                if snapshot.network.is_none() {
                    let name = console.prompt("Network [regtest]: ").await?;
                    let name = if name.is_empty() { "regtest".to_string() } else { name };
                    match parse_network(&name) {
                        Ok(network) => controller.select_network(network).await.map(|_| ()),
                        Err(e) => Err(e),
                    }
                } else {
                    let path = match data_dir.take() {
                        Some(path) => path.to_string_lossy().into_owned(),
                        None => console.prompt("Data directory (absolute path): ").await?,
                    };
                    controller
                        .select_data_dir(DataDirSelected::new(path))
                        .await
                        .map(|_| ())
                }
            }
            OnboardingStep::DataDirSelect => {
                writeln!(console.human, "Network:        {}", snapshot.network.unwrap_or_default())?;
                if let Some(dir) = &snapshot.data_dir {
                    writeln!(console.human, "Data directory: {}", dir.display())?;
                }
                console.prompt("Press enter to continue").await?;
                controller.continue_setup().await.map(|_| ())
            }
            OnboardingStep::WalletChoice => {
                let choice = console
                    .prompt("Create a new wallet or restore one? [create/restore]: ")
                    .await?;
                if choice.eq_ignore_ascii_case("restore") {
                    controller.choose_restore().await.map(|_| ())
                } else {
                    controller.create_new_wallet().await.map(|_| ())
                }
            }
            OnboardingStep::MnemonicDisplay => {
                let words = controller.display_words().await?;
                writeln!(console.human, "Write these words down in order and keep them safe:")?;
                for (n, word) in words.iter().enumerate() {
                    writeln!(console.human, "  {:>2}. {}", n + 1, word)?;
                }
                drop(words);
                console.prompt("Press enter once you have written them down").await?;
                controller.acknowledge_phrase().await.map(|_| ())
            }
            OnboardingStep::MnemonicConfirm => confirm_words(controller, console).await,
            OnboardingStep::PassphraseSetup => {
                let passphrase = Zeroizing::new(console.prompt("Passphrase: ").await?);
                let confirmation = Zeroizing::new(console.prompt("Repeat passphrase: ").await?);
                match controller
                    .submit_passphrase(passphrase.as_str(), confirmation.as_str())
                    .await
                {
                    Ok(completed) => {
                        writeln!(
                            console.human,
                            "Wallet created on {} in {}",
                            completed.network,
                            completed.data_dir.display()
                        )?;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                error!("Wallet setup cannot continue: {}", e);
                bail!(e);
            }
            Err(Error::ConfirmationMismatch { positions }) => {
                let numbers: Vec<String> = positions.iter().map(|p| (p + 1).to_string()).collect();
                writeln!(
                    console.human,
                    "Words {} do not match, please try again.",
                    numbers.join(", ")
                )?;
            }
            Err(e) => writeln!(console.human, "{}", e)?,
        }
    }
}

async fn confirm_words<I, J, H>(
    controller: &SetupController,
    console: &mut Console<I, J, H>,
) -> wallet_setup::Result<()>
where
    I: AsyncBufRead + Unpin,
    J: Write,
    H: Write,
{
    let view = controller.confirm_view().await?;
    writeln!(console.human, "Fill in the missing words:")?;

    for slot in &view.slots {
        match slot {
            ConfirmSlot::Visible { position, word } => {
                writeln!(console.human, "  {:>2}. {}", position + 1, word)?
            }
            ConfirmSlot::Hidden { position, input } if input.is_empty() => {
                let typed = Zeroizing::new(console.prompt(&format!("  {:>2}. ", position + 1)).await?);
                controller
                    .set_confirmation_word(*position, typed.as_str())
                    .await?;
            }
            ConfirmSlot::Hidden { position, .. } => {
                writeln!(console.human, "  {:>2}. (kept)", position + 1)?
            }
        }
    }

    if !controller.snapshot().await?.submittable {
        writeln!(console.human, "Every missing word needs an entry.")?;
        return Ok(());
    }
    controller.submit_confirmation().await.map(|_| ())
}
