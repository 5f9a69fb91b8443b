//! Read-only views of local and remote state.
//!
//! Relation precedence:
//! 1. `NoRemote` (group missing or empty)
//! 2. `Current` (local token equals the latest snapshot token)
//! 3. `RemoteNewer` (the next pre-use pass would fetch)
//! 4. `LocalNewer` (the next publish would upload)

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use savesync_core::{ArtifactName, GroupName, SnapshotName, Token};
use savesync_store::RemoteStore;

use crate::engine::latest_snapshot;
use crate::error::SyncError;
use crate::locator::{resolve_artifact, FsArtifacts, LocalArtifacts};

/// How the local save relates to the latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    NoRemote,
    Current,
    RemoteNewer,
    LocalNewer,
}

impl Relation {
    pub fn between(local: Token, remote: Option<Token>) -> Self {
        match remote {
            None => Relation::NoRemote,
            Some(remote) if remote == local => Relation::Current,
            Some(remote) if remote > local => Relation::RemoteNewer,
            Some(_) => Relation::LocalNewer,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Relation::NoRemote => "no-remote",
            Relation::Current => "current",
            Relation::RemoteNewer => "remote-newer",
            Relation::LocalNewer => "local-newer",
        }
    }
}

/// One snapshot with its decoded time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub name: SnapshotName,
    pub time: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub artifact: ArtifactName,
    pub path: PathBuf,
    pub local: Token,
    pub remote: Option<SnapshotInfo>,
    pub relation: Relation,
    /// SHA-256 comparison of local and remote bytes, when requested.
    pub identical: Option<bool>,
}

/// Compare the local save against the latest snapshot without changing either.
pub fn check(
    store: &dyn RemoteStore,
    artifacts: &FsArtifacts,
    name: &ArtifactName,
    compare_contents: bool,
) -> Result<StatusReport, SyncError> {
    let artifact = resolve_artifact(artifacts, name, artifacts.save_dir())?;
    let group = name.group();

    let latest = if store.group_exists(&group)? {
        latest_snapshot(store, &group)?
    } else {
        None
    };
    let relation = Relation::between(artifact.token, latest.as_ref().map(|l| l.name.token()));

    let identical = match (&latest, compare_contents) {
        (Some(latest), true) => {
            let remote = store.read_snapshot(&group, &latest.name.to_string())?;
            let local = artifacts.read_bytes(&artifact.path)?;
            Some(digest(&local) == digest(&remote))
        }
        _ => None,
    };

    Ok(StatusReport {
        artifact: name.clone(),
        path: artifact.path,
        local: artifact.token,
        remote: latest.map(|l| SnapshotInfo {
            time: l.name.token().instant(),
            name: l.name,
            size: l.size,
        }),
        relation,
        identical,
    })
}

/// Valid snapshots of `group`, oldest first. Foreign entries are skipped.
pub fn list_snapshots(
    store: &dyn RemoteStore,
    group: &GroupName,
) -> Result<Vec<SnapshotInfo>, SyncError> {
    if !store.group_exists(group)? {
        return Ok(Vec::new());
    }
    let mut snapshots: Vec<SnapshotInfo> = store
        .list_snapshots(group)?
        .into_iter()
        .filter_map(|entry| {
            let name = SnapshotName::parse(&entry.name).ok()?;
            Some(SnapshotInfo {
                time: name.token().instant(),
                name,
                size: entry.size,
            })
        })
        .collect();
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(snapshots)
}

/// Hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// How long ago `timestamp` was, in its largest whole unit (`42s`, `5m`, `3h`, `2d`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);
    const UNITS: [(i64, &str); 3] = [(86_400, "d"), (3_600, "h"), (60, "m")];
    UNITS
        .iter()
        .find(|(size, _)| seconds >= *size)
        .map(|(size, unit)| format!("{}{unit}", seconds / size))
        .unwrap_or_else(|| format!("{seconds}s"))
}
