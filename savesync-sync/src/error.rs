//! Error types for savesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use savesync_core::{ClockError, ConfigError};
use savesync_store::StoreError;

/// All errors that can arise from reconciliation and session operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the remote store.
    #[error("remote error: {0}")]
    Store(#[from] StoreError),

    /// A timestamp could not be encoded or decoded.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// An error from configuration loading.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No local save file matches the artifact name.
    #[error("no save file for '{name}' in {dir}")]
    ArtifactMissing { name: String, dir: PathBuf },

    /// The save directory could not be located.
    #[error("save directory not found at {path}; is the game installed?")]
    SaveDirNotFound { path: PathBuf },

    /// The remote group holds no snapshots.
    #[error("no snapshots of '{group}' on the remote")]
    NoSnapshots { group: String },

    /// An initial pull would replace existing local saves.
    #[error("{} local save file(s) already exist for this name (first: {}); pass --force to back them up and replace them", paths.len(), paths.first().map(|p| p.display().to_string()).unwrap_or_default())]
    WouldOverwrite { paths: Vec<PathBuf> },
}

impl SyncError {
    /// `true` when the remote simply was not reachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_connectivity())
    }
}

/// Errors from running the external application.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("{process} did not start within {waited_secs}s")]
    NeverStarted { process: String, waited_secs: u64 },

    #[error("cannot query running processes: {0}")]
    Probe(#[source] std::io::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
