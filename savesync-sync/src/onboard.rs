//! First-time setup helpers.
//!
//! Onboarding produces a configuration and optionally seeds one side from the
//! other. Seeding goes through the same store and locator capabilities as a
//! session; nothing here alters how the engine decides.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use savesync_core::{ArtifactName, SnapshotName};
use savesync_store::RemoteStore;

use crate::backup::{backup_path, Backup};
use crate::engine::latest_snapshot;
use crate::error::{io_err, SyncError};
use crate::locator::{FsArtifacts, LocalArtifacts};

/// Result of [`pull_initial`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitialPull {
    pub snapshot: SnapshotName,
    pub path: PathBuf,
    pub bytes: u64,
    /// Saves that were moved aside to make room.
    pub backups: Vec<Backup>,
}

/// Download the latest snapshot of `name` as a fresh local save.
///
/// Existing saves for `name` are left alone unless `force` is set, in which
/// case each one is moved to its backup slot first so the downloaded file is
/// the only candidate afterwards.
pub fn pull_initial(
    store: &dyn RemoteStore,
    artifacts: &FsArtifacts,
    name: &ArtifactName,
    force: bool,
) -> Result<InitialPull, SyncError> {
    let group = name.group();
    let no_snapshots = || SyncError::NoSnapshots {
        group: group.0.clone(),
    };
    if !store.group_exists(&group)? {
        return Err(no_snapshots());
    }
    let latest = latest_snapshot(store, &group)?.ok_or_else(no_snapshots)?;

    let existing = artifacts.candidates(name)?;
    if !existing.is_empty() && !force {
        return Err(SyncError::WouldOverwrite { paths: existing });
    }

    let bytes = store.read_snapshot(&group, &latest.name.to_string())?;

    let mut backups = Vec::with_capacity(existing.len());
    for path in &existing {
        let target = backup_path(path);
        let replaced = target.exists();
        std::fs::rename(path, &target).map_err(|e| io_err(path, e))?;
        tracing::info!("moved {} to {}", path.display(), target.display());
        backups.push(Backup {
            path: target,
            replaced,
        });
    }

    let path = artifacts.fresh_path(name);
    artifacts.write_bytes(&path, &bytes, latest.name.token().instant())?;
    tracing::info!("downloaded {group}/{} to {}", latest.name, path.display());

    Ok(InitialPull {
        snapshot: latest.name,
        path,
        bytes: bytes.len() as u64,
        backups,
    })
}

/// Logical names of the saves in the save directory: the part of each
/// `<name><marker>…<ext>` file name before the marker.
pub fn local_save_names(
    save_dir: &std::path::Path,
    marker: &str,
    extension: &str,
) -> Result<Vec<String>, SyncError> {
    let suffix = format!(".{extension}");
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(save_dir).map_err(|e| io_err(save_dir, e))? {
        let entry = entry.map_err(|e| io_err(save_dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(&suffix) {
            continue;
        }
        if let Some(idx) = file_name.find(marker) {
            if idx > 0 {
                names.insert(file_name[..idx].to_string());
            }
        }
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::resolve_artifact;
    use chrono::{TimeZone, Utc};
    use filetime::{set_file_mtime, FileTime};
    use savesync_core::{GroupName, Token};
    use savesync_store::DirStore;
    use std::fs;
    use tempfile::TempDir;

    const T1: i64 = 1_709_802_301;

    fn snapshot(unix: i64) -> String {
        SnapshotName::new(Token::from_instant(Utc.timestamp_opt(unix, 0).unwrap()).unwrap())
            .to_string()
    }

    fn setup() -> (TempDir, TempDir, DirStore, FsArtifacts) {
        let remote = TempDir::new().expect("remote");
        let saves = TempDir::new().expect("saves");
        let store = DirStore::open(remote.path()).expect("store");
        let artifacts = FsArtifacts::new(saves.path(), "_autosave_", "sav");
        (remote, saves, store, artifacts)
    }

    fn seed(store: &DirStore) {
        let group = GroupName::from("MyWorld");
        store.create_group(&group).unwrap();
        store.write_snapshot(&group, &snapshot(T1), b"old").unwrap();
        store.write_snapshot(&group, &snapshot(T1 + 60), b"new").unwrap();
    }

    #[test]
    fn pulls_latest_into_fresh_save() {
        let (_remote, saves, store, artifacts) = setup();
        seed(&store);
        let name = ArtifactName::from("MyWorld");

        let pulled = pull_initial(&store, &artifacts, &name, false).unwrap();
        assert_eq!(pulled.path, saves.path().join("MyWorld_autosave_0.sav"));
        assert_eq!(fs::read(&pulled.path).unwrap(), b"new");
        assert!(pulled.backups.is_empty());

        let artifact = resolve_artifact(&artifacts, &name, saves.path()).unwrap();
        assert_eq!(artifact.token, pulled.snapshot.token());
    }

    #[test]
    fn refuses_to_replace_existing_saves() {
        let (_remote, saves, store, artifacts) = setup();
        seed(&store);
        let existing = saves.path().join("MyWorld_autosave_1.sav");
        fs::write(&existing, "mine").unwrap();

        let err = pull_initial(&store, &artifacts, &ArtifactName::from("MyWorld"), false)
            .unwrap_err();
        match err {
            SyncError::WouldOverwrite { paths } => assert_eq!(paths, vec![existing.clone()]),
            other => panic!("expected WouldOverwrite, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(existing).unwrap(), "mine");
    }

    #[test]
    fn force_moves_existing_saves_aside() {
        let (_remote, saves, store, artifacts) = setup();
        seed(&store);
        let existing = saves.path().join("MyWorld_autosave_1.sav");
        fs::write(&existing, "mine").unwrap();
        // Newer than any snapshot; must not win resolution afterwards.
        set_file_mtime(&existing, FileTime::from_unix_time(T1 + 9999, 0)).unwrap();
        let name = ArtifactName::from("MyWorld");

        let pulled = pull_initial(&store, &artifacts, &name, true).unwrap();
        assert_eq!(pulled.backups.len(), 1);
        assert!(!existing.exists());
        assert_eq!(fs::read_to_string(&pulled.backups[0].path).unwrap(), "mine");
        assert_eq!(artifacts.candidates(&name).unwrap(), vec![pulled.path]);
    }

    #[test]
    fn missing_group_has_no_snapshots() {
        let (_remote, _saves, store, artifacts) = setup();
        let err = pull_initial(&store, &artifacts, &ArtifactName::from("MyWorld"), false)
            .unwrap_err();
        assert!(matches!(err, SyncError::NoSnapshots { .. }));
    }

    #[test]
    fn lists_distinct_local_names() {
        let saves = TempDir::new().unwrap();
        for file in [
            "Alpha_autosave_0.sav",
            "Alpha_autosave_1.sav",
            "Beta_autosave_2.sav",
            "Beta_autosave_2.sav.backup",
            "notes.txt",
        ] {
            fs::write(saves.path().join(file), "x").unwrap();
        }
        let names = local_save_names(saves.path(), "_autosave_", "sav").unwrap();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
