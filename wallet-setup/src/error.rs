//! Error types for the wallet-setup library

use std::path::PathBuf;

use thiserror::Error;

use crate::onboarding::OnboardingStep;

/// Custom error type for wallet-setup operations
#[derive(Error, Debug)]
pub enum Error {
    /// The secure random source could not be read
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// The chosen data directory cannot be created or used
    #[error("Directory unavailable: {}: {reason}", .path.display())]
    DirectoryUnavailable { path: PathBuf, reason: String },

    /// One or more hidden words were typed incorrectly
    #[error("Confirmation mismatch at positions {positions:?}")]
    ConfirmationMismatch { positions: Vec<usize> },

    /// An affordance was invoked out of the allowed step order
    #[error("Invalid transition: cannot {action} during {step}")]
    InvalidTransition {
        action: &'static str,
        step: OnboardingStep,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The task owning the wizard is no longer running
    #[error("Setup controller stopped")]
    ControllerStopped,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn directory(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether onboarding can no longer proceed after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EntropyUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for wallet-setup operations
pub type Result<T> = std::result::Result<T, Error>;
