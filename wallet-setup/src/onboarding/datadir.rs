//! Data directory selection and preparation

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Marker file identifying a directory created by wallet setup
pub const OWNERSHIP_MARKER: &str = ".wallet-setup";

/// Lock file held by the session using a directory
pub const LOCK_FILE: &str = ".wallet-setup.lock";

/// Message from the directory picker carrying the chosen absolute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDirSelected {
    pub path: String,
}

impl DataDirSelected {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Exclusive hold on a prepared data directory
///
/// Only one lease per directory exists at a time, across processes. The
/// lock is released when the lease is dropped.
#[derive(Debug)]
pub struct DirectoryLease {
    path: PathBuf,
    _lock: File,
}

impl DirectoryLease {
    /// Lock `dir` for this session
    pub fn acquire(dir: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))
            .map_err(|e| Error::directory(dir, format!("cannot open lock file: {}", e)))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: dir.to_path_buf(),
                _lock: file,
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                warn!("Data directory {} is locked by another setup", dir.display());
                Err(Error::directory(dir, "directory is in use by another wallet setup"))
            }
            Err(e) => Err(Error::directory(dir, format!("cannot lock directory: {}", e))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Filesystem collaborator that makes a chosen directory usable
pub trait DataDirectory {
    /// Ensure `path` exists and belongs to this wallet, creating it if
    /// needed, and lock it for the calling session
    fn prepare(&self, path: &Path) -> Result<DirectoryLease>;
}

/// `DataDirectory` backed by the local filesystem
///
/// An existing directory is accepted when empty or when it carries the
/// ownership marker. A missing one is created exclusively. Either way the
/// directory is then locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDataDirectory;

impl DataDirectory for FsDataDirectory {
    fn prepare(&self, path: &Path) -> Result<DirectoryLease> {
        if !path.is_absolute() {
            return Err(Error::directory(path, "path must be absolute"));
        }

        match fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => Err(Error::directory(path, "not a directory")),
            Ok(_) => {
                let owned = path.join(OWNERSHIP_MARKER).is_file();
                let mut entries = fs::read_dir(path)
                    .map_err(|e| Error::directory(path, format!("cannot read directory: {}", e)))?;

                if !owned && entries.next().is_some() {
                    warn!("Refusing non-empty data directory {}", path.display());
                    return Err(Error::directory(
                        path,
                        "directory is not empty and was not created by wallet setup",
                    ));
                }
                if !owned {
                    write_marker(path)?;
                }

                let lease = DirectoryLease::acquire(path)?;
                debug!("Reusing data directory {}", path.display());
                Ok(lease)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::directory(path, format!("cannot create parent directory: {}", e))
                    })?;
                }
                // create_dir fails if someone else created it in the meantime
                fs::create_dir(path)
                    .map_err(|e| Error::directory(path, format!("cannot create directory: {}", e)))?;
                write_marker(path)?;
                let lease = DirectoryLease::acquire(path)?;

                info!("Created data directory {}", path.display());
                Ok(lease)
            }
            Err(e) => Err(Error::directory(path, format!("cannot access directory: {}", e))),
        }
    }
}

fn write_marker(dir: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dir.join(OWNERSHIP_MARKER))
        .map_err(|e| Error::directory(dir, format!("cannot claim directory: {}", e)))?;
    file.write_all(env!("CARGO_PKG_VERSION").as_bytes())
        .map_err(|e| Error::directory(dir, format!("cannot claim directory: {}", e)))?;
    Ok(())
}
