//! Error types for savesync-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a remote store can raise.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote cannot be reached or refused authentication.
    #[error("cannot reach {remote}: {reason}")]
    Unreachable { remote: String, reason: String },

    /// A list/read/write/mkdir request reached the remote and failed there.
    #[error("{op} failed on {target}: {reason}")]
    Transfer {
        op: &'static str,
        target: String,
        reason: String,
    },

    /// The named snapshot does not exist in the group.
    #[error("snapshot {group}/{name} not found")]
    MissingSnapshot { group: String, name: String },

    /// Snapshots are immutable; a write targeted an existing name.
    #[error("snapshot {group}/{name} already exists")]
    SnapshotExists { group: String, name: String },

    /// A local I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// `true` for failures that mean "the remote is not available right now".
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unreachable { .. })
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
