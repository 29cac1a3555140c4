//! Onboarding wizard for a new wallet
//!
//! This module sequences network and data directory selection, creation
//! of the recovery phrase, its confirmation, and passphrase setup.

mod step;
mod session;
pub mod datadir;
pub mod progress;
pub mod machine;
pub mod controller;

pub use step::OnboardingStep;
pub use session::WalletSetupSession;
pub use datadir::{DataDirSelected, DataDirectory, DirectoryLease, FsDataDirectory, LOCK_FILE, OWNERSHIP_MARKER};
pub use progress::{ProgressStore, SetupProgress};
pub use machine::*;
pub use controller::SetupController;
