//! Wallet Setup - onboarding wizard and recovery phrase lifecycle
//!
//! This library drives the first-run setup of a wallet: choosing a network
//! and data directory, generating a 24-word recovery phrase, making the
//! user retype a concealed subset of it, and gating passphrase setup on
//! that confirmation.

pub mod error;
pub mod config;
pub mod crypto;
pub mod onboarding;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use config::SetupConfig;
pub use onboarding::{OnboardingStateMachine, OnboardingStep, SetupController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
