//! Local safety copies.
//!
//! A backup lives next to the artifact at `<artifact path>.backup`. There is
//! one slot per save file: a new backup fully replaces the previous one. The
//! engine never reads backups back; they exist for the player to recover from.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SyncError;
use crate::locator::{sibling_with_suffix, LocalArtifacts};

pub const BACKUP_SUFFIX: &str = ".backup";

/// A backup that was just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    pub path: PathBuf,
    /// `true` when an older backup occupied the slot.
    pub replaced: bool,
}

/// `<artifact path>.backup` — pure, no I/O.
pub fn backup_path(artifact: &Path) -> PathBuf {
    sibling_with_suffix(artifact, BACKUP_SUFFIX)
}

/// Copy `artifact` into its backup slot.
pub fn take_backup(artifacts: &dyn LocalArtifacts, artifact: &Path) -> Result<Backup, SyncError> {
    let path = backup_path(artifact);
    let replaced = artifacts.exists(&path);
    artifacts.copy(artifact, &path)?;
    if replaced {
        tracing::info!("replaced previous backup: {}", path.display());
    } else {
        tracing::info!("backed up: {}", path.display());
    }
    Ok(Backup { path, replaced })
}
