//! Directory-backed store.
//!
//! ```text
//! <root>/
//!   <group>/
//!     240307-090501.sav
//!     240309-211744.sav
//! ```
//!
//! Writes go to a hidden `.<name>.tmp` sibling and are renamed into place, so
//! a reader never sees a half-written snapshot.

use std::io::ErrorKind;
use std::path::PathBuf;

use savesync_core::GroupName;

use crate::error::{io_err, StoreError};
use crate::{RemoteEntry, RemoteStore};

/// A store rooted at a local or mounted directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open the store. A missing root is a connectivity failure: for a
    /// mounted share it usually means the mount is down.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Unreachable {
                remote: root.display().to_string(),
                reason: "directory does not exist".to_string(),
            });
        }
        Ok(Self { root })
    }

    fn group_dir(&self, group: &GroupName) -> PathBuf {
        self.root.join(&group.0)
    }
}

impl RemoteStore for DirStore {
    fn list_groups(&self) -> Result<Vec<GroupName>, StoreError> {
        let mut groups = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))? {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            groups.push(GroupName(name));
        }
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(groups)
    }

    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError> {
        Ok(self.group_dir(group).is_dir())
    }

    fn list_snapshots(&self, group: &GroupName) -> Result<Vec<RemoteEntry>, StoreError> {
        let dir = self.group_dir(group);
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().map_err(|e| io_err(entry.path(), e))?;
            if !meta.is_file() {
                continue;
            }
            entries.push(RemoteEntry {
                name,
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_group(&self, group: &GroupName) -> Result<(), StoreError> {
        let dir = self.group_dir(group);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))
    }

    fn read_snapshot(&self, group: &GroupName, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.group_dir(group).join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::MissingSnapshot {
                group: group.0.clone(),
                name: name.to_string(),
            }),
            Err(e) => Err(io_err(path, e)),
        }
    }

    fn write_snapshot(
        &self,
        group: &GroupName,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        let dir = self.group_dir(group);
        let path = dir.join(name);
        if path.exists() {
            return Err(StoreError::SnapshotExists {
                group: group.0.clone(),
                name: name.to_string(),
            });
        }

        let tmp = dir.join(format!(".{name}.tmp"));
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        tracing::debug!("stored snapshot: {}", path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
