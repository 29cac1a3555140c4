//! Persisted, non-secret wizard progress

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::step::OnboardingStep;
use crate::error::Result;

/// What survives a restart: choices made before any phrase exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupProgress {
    pub step: OnboardingStep,
    pub network: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl SetupProgress {
    /// Step to resume at; never past the wallet choice since phrases are not stored
    pub fn resume_step(&self) -> OnboardingStep {
        self.step.min(OnboardingStep::WalletChoice)
    }
}

/// JSON file holding `SetupProgress`
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SetupProgress>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let progress = serde_json::from_slice(&bytes)?;
                debug!("Loaded setup progress from {}", self.path.display());
                Ok(Some(progress))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, progress: &SetupProgress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(progress)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved setup progress at step {}", progress.step);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared setup progress at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
