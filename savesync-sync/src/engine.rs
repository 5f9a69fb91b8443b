//! Reconciliation engine.
//!
//! Two independent passes over one artifact / group pair:
//!
//! **Pre-use** ([`pre_use`]) — fetch or skip:
//! 1. Group absent or empty → `NoRemote`.
//! 2. Latest snapshot newer than the local save → download and replace → `Fetched`.
//! 3. Otherwise → `Current`.
//!
//! **Post-use** ([`post_use`]) — publish or refuse:
//! 1. Save not modified during the use interval → `Unchanged`.
//! 2. Create the group if needed.
//! 3. Local older than the latest snapshot → back up, do not publish → `Conflict`.
//! 4. Local equal to the latest snapshot → `AlreadyPublished`.
//! 5. Otherwise upload a new snapshot named by the local token → `Published`.
//!
//! All comparisons use [`Token`]s, so instants inside the same second are equal.

use std::path::PathBuf;

use serde::Serialize;

use savesync_core::{GroupName, SnapshotName, Token};
use savesync_store::RemoteStore;

use crate::backup::{take_backup, Backup};
use crate::error::SyncError;
use crate::locator::{Artifact, LocalArtifacts};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of the pre-use pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The group does not exist or holds no snapshots.
    NoRemote { group: GroupName },
    /// The local save is as new as the latest snapshot, or newer.
    Current { local: Token, remote: Token },
    /// The latest snapshot replaced the local save.
    Fetched {
        snapshot: SnapshotName,
        path: PathBuf,
        bytes: u64,
        backup: Option<Backup>,
    },
}

/// Result of the post-use pass or a standalone publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// The save was not modified during the use interval.
    Unchanged { start: Token, end: Token },
    /// A snapshot with the local token already exists.
    AlreadyPublished { snapshot: SnapshotName },
    /// A new snapshot was uploaded.
    Published {
        snapshot: SnapshotName,
        bytes: u64,
        created_group: bool,
    },
    /// The local save is older than the latest snapshot; it was backed up instead.
    Conflict {
        local: Token,
        remote: Token,
        backup: Backup,
    },
}

/// The newest valid snapshot in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestSnapshot {
    pub name: SnapshotName,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Latest snapshot lookup
// ---------------------------------------------------------------------------

/// Newest snapshot of `group` by name. Entries that are not `<token>.sav`
/// are ignored.
pub fn latest_snapshot(
    store: &dyn RemoteStore,
    group: &GroupName,
) -> Result<Option<LatestSnapshot>, SyncError> {
    let latest = store
        .list_snapshots(group)?
        .into_iter()
        .filter_map(|entry| match SnapshotName::parse(&entry.name) {
            Ok(name) => Some(LatestSnapshot {
                name,
                size: entry.size,
            }),
            Err(err) => {
                tracing::warn!("ignoring remote entry in {group}: {err}");
                None
            }
        })
        .max_by(|a, b| a.name.cmp(&b.name));
    Ok(latest)
}

// ---------------------------------------------------------------------------
// Pre-use pass
// ---------------------------------------------------------------------------

/// Fetch the latest snapshot if it is newer than the local save.
///
/// The snapshot is read completely before the local file is touched, so a
/// failed download leaves the save as it was.
pub fn pre_use(
    store: &dyn RemoteStore,
    artifacts: &dyn LocalArtifacts,
    artifact: &Artifact,
    backup_before_fetch: bool,
) -> Result<FetchOutcome, SyncError> {
    let group = artifact.name.group();
    if !store.group_exists(&group)? {
        tracing::info!("no remote group for {}", artifact.name);
        return Ok(FetchOutcome::NoRemote { group });
    }
    let Some(latest) = latest_snapshot(store, &group)? else {
        return Ok(FetchOutcome::NoRemote { group });
    };

    let remote = latest.name.token();
    if remote <= artifact.token {
        tracing::debug!("local {} is current (remote {remote})", artifact.token);
        return Ok(FetchOutcome::Current {
            local: artifact.token,
            remote,
        });
    }

    let bytes = store.read_snapshot(&group, &latest.name.to_string())?;
    let backup = if backup_before_fetch {
        Some(take_backup(artifacts, &artifact.path)?)
    } else {
        None
    };
    artifacts.write_bytes(&artifact.path, &bytes, remote.instant())?;
    tracing::info!("fetched {group}/{} into {}", latest.name, artifact.path.display());

    Ok(FetchOutcome::Fetched {
        snapshot: latest.name,
        path: artifact.path.clone(),
        bytes: bytes.len() as u64,
        backup,
    })
}

// ---------------------------------------------------------------------------
// Post-use pass
// ---------------------------------------------------------------------------

/// Publish the save if it was modified after `start`.
///
/// `artifact` is the save as resolved after the use interval. A token equal
/// to or older than `start` counts as unchanged.
pub fn post_use(
    store: &dyn RemoteStore,
    artifacts: &dyn LocalArtifacts,
    artifact: &Artifact,
    start: Token,
) -> Result<PublishOutcome, SyncError> {
    if let Some(unchanged) = unchanged_since(artifact, start) {
        return Ok(unchanged);
    }
    publish(store, artifacts, artifact)
}

/// `Some(Unchanged)` when the save was not modified after `start`.
pub fn unchanged_since(artifact: &Artifact, start: Token) -> Option<PublishOutcome> {
    if artifact.token > start {
        return None;
    }
    tracing::debug!("{} unchanged ({start} -> {})", artifact.name, artifact.token);
    Some(PublishOutcome::Unchanged {
        start,
        end: artifact.token,
    })
}

/// Publish the save as a new snapshot unless the remote already has something
/// at least as new.
pub fn publish(
    store: &dyn RemoteStore,
    artifacts: &dyn LocalArtifacts,
    artifact: &Artifact,
) -> Result<PublishOutcome, SyncError> {
    let group = artifact.name.group();
    let created_group = if store.group_exists(&group)? {
        false
    } else {
        store.create_group(&group)?;
        tracing::info!("created remote group {group}");
        true
    };

    if !created_group {
        if let Some(latest) = latest_snapshot(store, &group)? {
            let remote = latest.name.token();
            if artifact.token < remote {
                tracing::warn!(
                    "{} local {} is older than remote {remote}; refusing to publish",
                    artifact.name,
                    artifact.token
                );
                let backup = take_backup(artifacts, &artifact.path)?;
                return Ok(PublishOutcome::Conflict {
                    local: artifact.token,
                    remote,
                    backup,
                });
            }
            if artifact.token == remote {
                return Ok(PublishOutcome::AlreadyPublished {
                    snapshot: latest.name,
                });
            }
        }
    }

    let bytes = artifacts.read_bytes(&artifact.path)?;
    let snapshot = SnapshotName::new(artifact.token);
    store.write_snapshot(&group, &snapshot.to_string(), &bytes)?;
    tracing::info!("published {group}/{snapshot}");

    Ok(PublishOutcome::Published {
        snapshot,
        bytes: bytes.len() as u64,
        created_group,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_path;
    use crate::locator::{resolve_artifact, FsArtifacts};
    use chrono::{TimeZone, Utc};
    use filetime::{set_file_mtime, FileTime};
    use savesync_core::ArtifactName;
    use savesync_store::DirStore;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const T1: i64 = 1_709_802_301; // 2024-03-07 09:05:01 UTC

    struct Fixture {
        remote: TempDir,
        saves: TempDir,
        store: DirStore,
        artifacts: FsArtifacts,
    }

    impl Fixture {
        fn new() -> Self {
            let remote = TempDir::new().unwrap();
            let saves = TempDir::new().unwrap();
            let store = DirStore::open(remote.path()).unwrap();
            let artifacts = FsArtifacts::new(saves.path(), "_autosave_", "sav");
            Self {
                remote,
                saves,
                store,
                artifacts,
            }
        }

        fn save_path(&self) -> std::path::PathBuf {
            self.saves.path().join("MyWorld_autosave_0.sav")
        }

        fn write_save(&self, content: &str, unix: i64) {
            let path = self.save_path();
            fs::write(&path, content).unwrap();
            set_file_mtime(&path, FileTime::from_unix_time(unix, 0)).unwrap();
        }

        fn artifact(&self) -> Artifact {
            resolve_artifact(&self.artifacts, &name(), self.saves.path()).unwrap()
        }

        fn put_snapshot(&self, unix: i64, content: &str) -> SnapshotName {
            let token = token(unix);
            let snapshot = SnapshotName::new(token);
            let group = name().group();
            if !self.store.group_exists(&group).unwrap() {
                self.store.create_group(&group).unwrap();
            }
            self.store
                .write_snapshot(&group, &snapshot.to_string(), content.as_bytes())
                .unwrap();
            snapshot
        }

        fn snapshot_count(&self) -> usize {
            let group = name().group();
            if !self.store.group_exists(&group).unwrap() {
                return 0;
            }
            self.store.list_snapshots(&group).unwrap().len()
        }
    }

    fn name() -> ArtifactName {
        ArtifactName::from("MyWorld")
    }

    fn token(unix: i64) -> Token {
        Token::from_instant(Utc.timestamp_opt(unix, 0).unwrap()).unwrap()
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn pre_use_without_group_reports_no_remote() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), false).unwrap();
        assert!(matches!(outcome, FetchOutcome::NoRemote { .. }));
        assert_eq!(read(&fx.save_path()), "local");
    }

    #[test]
    fn pre_use_with_empty_group_reports_no_remote() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        fx.store.create_group(&name().group()).unwrap();
        let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), false).unwrap();
        assert!(matches!(outcome, FetchOutcome::NoRemote { .. }));
    }

    #[test]
    fn pre_use_fetches_newer_snapshot_without_backup() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        fx.put_snapshot(T1 - 100, "older");
        let newest = fx.put_snapshot(T1 + 60, "remote-newest");

        let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), false).unwrap();
        match outcome {
            FetchOutcome::Fetched {
                snapshot, backup, ..
            } => {
                assert_eq!(snapshot, newest);
                assert!(backup.is_none());
            }
            other => panic!("expected fetched, got {other:?}"),
        }
        assert_eq!(read(&fx.save_path()), "remote-newest");
        assert!(!backup_path(&fx.save_path()).exists());
        assert_eq!(fx.artifact().token, token(T1 + 60));
    }

    #[test]
    fn pre_use_backs_up_when_configured() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        fx.put_snapshot(T1 + 60, "remote");

        let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), true).unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Fetched { backup: Some(_), .. }
        ));
        assert_eq!(read(&backup_path(&fx.save_path())), "local");
    }

    #[test]
    fn pre_use_keeps_newer_or_equal_local() {
        for remote_unix in [T1 - 1, T1] {
            let fx = Fixture::new();
            fx.write_save("local", T1);
            fx.put_snapshot(remote_unix, "remote");
            let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), false).unwrap();
            assert!(matches!(outcome, FetchOutcome::Current { .. }), "{outcome:?}");
            assert_eq!(read(&fx.save_path()), "local");
        }
    }

    #[test]
    fn pre_use_ignores_foreign_entries_when_picking_latest() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        fx.put_snapshot(T1 - 10, "old");
        fs::write(fx.remote.path().join("MyWorld").join("zzz-notes.txt"), "x").unwrap();

        let outcome = pre_use(&fx.store, &fx.artifacts, &fx.artifact(), false).unwrap();
        assert!(matches!(outcome, FetchOutcome::Current { .. }));
    }

    #[test]
    fn post_use_unchanged_when_token_did_not_increase() {
        let fx = Fixture::new();
        fx.write_save("local", T1);
        let artifact = fx.artifact();
        let outcome = post_use(&fx.store, &fx.artifacts, &artifact, token(T1)).unwrap();
        assert!(matches!(outcome, PublishOutcome::Unchanged { .. }));

        let outcome = post_use(&fx.store, &fx.artifacts, &artifact, token(T1 + 5)).unwrap();
        assert!(matches!(outcome, PublishOutcome::Unchanged { .. }));
        assert_eq!(fx.snapshot_count(), 0);
    }

    #[test]
    fn post_use_creates_group_and_publishes() {
        let fx = Fixture::new();
        fx.write_save("played", T1);
        let outcome = post_use(&fx.store, &fx.artifacts, &fx.artifact(), token(T1 - 600)).unwrap();
        match outcome {
            PublishOutcome::Published {
                snapshot,
                created_group,
                bytes,
            } => {
                assert!(created_group);
                assert_eq!(bytes, 6);
                assert_eq!(snapshot.to_string(), "240307-090501.sav");
            }
            other => panic!("expected published, got {other:?}"),
        }
        assert_eq!(
            fx.store
                .read_snapshot(&name().group(), "240307-090501.sav")
                .unwrap(),
            b"played"
        );
    }

    #[test]
    fn post_use_conflict_backs_up_and_leaves_remote_alone() {
        let fx = Fixture::new();
        fx.write_save("stale-local", T1);
        fx.put_snapshot(T1 + 3600, "remote");
        let before = fx.snapshot_count();

        let outcome = post_use(&fx.store, &fx.artifacts, &fx.artifact(), token(T1 - 10)).unwrap();
        match outcome {
            PublishOutcome::Conflict { backup, local, remote } => {
                assert_eq!(backup.path, backup_path(&fx.save_path()));
                assert_eq!(local, token(T1));
                assert_eq!(remote, token(T1 + 3600));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(fx.snapshot_count(), before);
        assert_eq!(read(&backup_path(&fx.save_path())), "stale-local");
        assert_eq!(read(&fx.save_path()), "stale-local");
    }

    #[test]
    fn publish_equal_token_is_already_published() {
        let fx = Fixture::new();
        fx.write_save("same", T1);
        let existing = fx.put_snapshot(T1, "same");
        let outcome = publish(&fx.store, &fx.artifacts, &fx.artifact()).unwrap();
        assert_eq!(outcome, PublishOutcome::AlreadyPublished { snapshot: existing });
        assert_eq!(fx.snapshot_count(), 1);
    }

    #[test]
    fn publish_is_append_only() {
        let fx = Fixture::new();
        fx.write_save("newer", T1);
        fx.put_snapshot(T1 - 60, "older");
        publish(&fx.store, &fx.artifacts, &fx.artifact()).unwrap();
        assert_eq!(fx.snapshot_count(), 2);
        assert_eq!(
            fx.store
                .read_snapshot(&name().group(), &SnapshotName::new(token(T1 - 60)).to_string())
                .unwrap(),
            b"older"
        );
    }
}
