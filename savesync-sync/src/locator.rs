//! Local artifact locator — where the save file lives and when it last changed.
//!
//! The game writes rotating autosaves (`MyWorld_autosave_0.sav`,
//! `MyWorld_autosave_1.sav`, …). The artifact is whichever matching file was
//! modified most recently, so the resolved path can change across a session.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;

use savesync_core::{ArtifactConfig, ArtifactName, Token};

use crate::error::{io_err, SyncError};

/// Capabilities the engine needs from the local side.
pub trait LocalArtifacts {
    /// Current file for `name`, or `None` when no save exists.
    fn resolve(&self, name: &ArtifactName) -> Result<Option<PathBuf>, SyncError>;

    fn modified(&self, path: &Path) -> Result<DateTime<Utc>, SyncError>;

    fn exists(&self, path: &Path) -> bool;

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, SyncError>;

    /// Replace `path` with `bytes` and stamp it with `modified`.
    ///
    /// Either the old or the new content is on disk afterwards, never a mix.
    fn write_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<(), SyncError>;

    /// Copy `from` to `to`, replacing whatever `to` held.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), SyncError>;
}

/// The artifact as seen at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: ArtifactName,
    pub path: PathBuf,
    pub token: Token,
}

/// Resolve `name` and read its modification token.
///
/// Returns `SyncError::ArtifactMissing` when no save file matches.
pub fn resolve_artifact(
    artifacts: &dyn LocalArtifacts,
    name: &ArtifactName,
    search_dir: &Path,
) -> Result<Artifact, SyncError> {
    let path = artifacts
        .resolve(name)?
        .ok_or_else(|| SyncError::ArtifactMissing {
            name: name.0.clone(),
            dir: search_dir.to_path_buf(),
        })?;
    let token = Token::from_instant(artifacts.modified(&path)?)?;
    Ok(Artifact {
        name: name.clone(),
        path,
        token,
    })
}

// ---------------------------------------------------------------------------
// Filesystem implementation
// ---------------------------------------------------------------------------

/// Save files in one directory, matched by `<name>*<marker>*.<extension>`.
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    save_dir: PathBuf,
    marker: String,
    extension: String,
}

impl FsArtifacts {
    pub fn new(save_dir: impl Into<PathBuf>, marker: &str, extension: &str) -> Self {
        Self {
            save_dir: save_dir.into(),
            marker: marker.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Build from config, falling back to the game's default save location.
    pub fn from_config(config: &ArtifactConfig) -> Result<Self, SyncError> {
        let save_dir = match &config.save_dir {
            Some(dir) => dir.clone(),
            None => default_save_dir()?,
        };
        if !save_dir.is_dir() {
            return Err(SyncError::SaveDirNotFound { path: save_dir });
        }
        Ok(Self::new(save_dir, &config.marker, &config.extension))
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// All save files belonging to `name`, newest first (ties by name).
    ///
    /// A file belongs to `name` only when it reads `<name><marker>…<ext>`, so
    /// `MyWorld2_autosave_0.sav` is not a `MyWorld` save.
    pub fn candidates(&self, name: &ArtifactName) -> Result<Vec<PathBuf>, SyncError> {
        let suffix = format!(".{}", self.extension);
        let mut found: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();

        for entry in std::fs::read_dir(&self.save_dir).map_err(|e| io_err(&self.save_dir, e))? {
            let entry = entry.map_err(|e| io_err(&self.save_dir, e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(rest) = file_name.strip_prefix(name.0.as_str()) else {
                continue;
            };
            if !rest.starts_with(&self.marker) || !file_name.ends_with(&suffix) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            found.push((self.modified(&path)?, path));
        }

        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(found.into_iter().map(|(_, p)| p).collect())
    }

    /// Path for a save that does not exist yet: `<name><marker>0.<ext>`.
    pub fn fresh_path(&self, name: &ArtifactName) -> PathBuf {
        self.save_dir
            .join(format!("{}{}0.{}", name.0, self.marker, self.extension))
    }
}

impl LocalArtifacts for FsArtifacts {
    fn resolve(&self, name: &ArtifactName) -> Result<Option<PathBuf>, SyncError> {
        Ok(self.candidates(name)?.into_iter().next())
    }

    fn modified(&self, path: &Path) -> Result<DateTime<Utc>, SyncError> {
        let meta = std::fs::metadata(path).map_err(|e| io_err(path, e))?;
        let mtime = meta.modified().map_err(|e| io_err(path, e))?;
        Ok(DateTime::<Utc>::from(mtime))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, SyncError> {
        std::fs::read(path).map_err(|e| io_err(path, e))
    }

    fn write_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let tmp = sibling_with_suffix(path, ".savesync.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;

        let stamp = FileTime::from_unix_time(modified.timestamp(), 0);
        if let Err(e) = filetime::set_file_mtime(&tmp, stamp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&tmp, e));
        }
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        tracing::info!("wrote: {}", path.display());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), SyncError> {
        std::fs::copy(from, to).map_err(|e| io_err(to, e))?;
        Ok(())
    }
}

/// `<path><suffix>` in the same directory (same filesystem, so rename is atomic).
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// First subdirectory of `<local data dir>/FactoryGame/Saved/SaveGames`.
///
/// The game keeps one subdirectory per account; the first one is used.
pub fn default_save_dir() -> Result<PathBuf, SyncError> {
    let root = dirs::data_local_dir()
        .map(|d| d.join("FactoryGame").join("Saved").join("SaveGames"))
        .ok_or_else(|| SyncError::SaveDirNotFound {
            path: PathBuf::from("FactoryGame/Saved/SaveGames"),
        })?;
    first_subdir(&root)?.ok_or(SyncError::SaveDirNotFound { path: root })
}

fn first_subdir(root: &Path) -> Result<Option<PathBuf>, SyncError> {
    if !root.is_dir() {
        return Ok(None);
    }
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| io_err(root, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    Ok(dirs.into_iter().next())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
