//! Session configuration — the single immutable value a sync session runs on.
//!
//! # Storage layout
//!
//! ```text
//! <config dir>/
//!   savesync/                 (mode 0700)
//!     config.yaml             (mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every I/O function has two forms:
//! - `fn_at(root: &Path, …)` — explicit config root; used in tests with `TempDir`
//! - `fn(…)` — derives the root from `dirs::config_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ArtifactName;

/// Default Steam app id and process name (Satisfactory).
pub const DEFAULT_APP_ID: u32 = 526870;
pub const DEFAULT_PROCESS_NAME: &str = "FactoryGame";
/// Seconds to wait for the game process to appear after launching it.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Everything one `savesync` invocation needs. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub artifact: ArtifactConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
}

/// Which local files make up the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Logical save name; also the remote group name.
    pub name: ArtifactName,
    /// Directory holding the save files. `None` = the game's default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
    /// Substring every candidate save file name must contain.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Save file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Copy the local save aside before a fetch replaces it.
    #[serde(default)]
    pub backup_before_fetch: bool,
}

impl ArtifactConfig {
    pub fn new(name: ArtifactName) -> Self {
        Self {
            name,
            save_dir: None,
            marker: default_marker(),
            extension: default_extension(),
            backup_before_fetch: false,
        }
    }
}

/// Where snapshots live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// An SFTP server reached with key authentication.
    Sftp {
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        username: String,
        identity_file: PathBuf,
        #[serde(default = "default_remote_root")]
        root: String,
    },
    /// A plain directory: local disk, network share or an sshfs mount.
    Directory { root: PathBuf },
}

impl RemoteConfig {
    /// Short human label, e.g. `alice@example.org:/saves`.
    pub fn describe(&self) -> String {
        match self {
            RemoteConfig::Sftp {
                host,
                username,
                root,
                ..
            } => format!("{username}@{host}:{root}"),
            RemoteConfig::Directory { root } => root.display().to_string(),
        }
    }
}

/// How the external application is started during `play`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LaunchConfig {
    /// Launch through Steam and wait for the game process to exit.
    Steam {
        app_id: u32,
        process_name: String,
        #[serde(default = "default_startup_timeout")]
        startup_timeout_secs: u64,
    },
    /// Run a program and wait for it to exit.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for LaunchConfig {
    fn default() -> Self {
        LaunchConfig::Steam {
            app_id: DEFAULT_APP_ID,
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_marker() -> String {
    "_autosave_".to_string()
}

fn default_extension() -> String {
    "sav".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_remote_root() -> String {
    "/saves".to_string()
}

fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}

// ---------------------------------------------------------------------------
// 2. Validation
// ---------------------------------------------------------------------------

impl SessionConfig {
    /// Reject values that would make a session misbehave later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.artifact.name.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "artifact name '{}' must be a non-empty single path segment",
                self.artifact.name
            )));
        }
        if self.artifact.marker.is_empty() {
            return Err(ConfigError::Invalid(
                "save marker is empty; it separates the save name from the slot".to_string(),
            ));
        }
        if self.artifact.extension.is_empty() || self.artifact.extension.contains('.') {
            return Err(ConfigError::Invalid(format!(
                "extension '{}' must be non-empty and have no dot",
                self.artifact.extension
            )));
        }
        match &self.remote {
            RemoteConfig::Sftp { host, username, .. } => {
                if host.trim().is_empty() {
                    return Err(ConfigError::Invalid("sftp host is empty".to_string()));
                }
                if username.trim().is_empty() {
                    return Err(ConfigError::Invalid("sftp username is empty".to_string()));
                }
            }
            RemoteConfig::Directory { root } => {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid("remote directory is empty".to_string()));
                }
            }
        }
        if let LaunchConfig::Command { program, .. } = &self.launch {
            if program.trim().is_empty() {
                return Err(ConfigError::Invalid("launch program is empty".to_string()));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Paths
// ---------------------------------------------------------------------------

/// `<root>/savesync/config.yaml` — pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join("savesync").join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&config_root()?))
}

// ---------------------------------------------------------------------------
// 4. Load
// ---------------------------------------------------------------------------

/// Load and validate the config from `<root>/savesync/config.yaml`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(root: &Path) -> Result<SessionConfig, ConfigError> {
    let path = config_path_at(root);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: SessionConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SessionConfig, ConfigError> {
    load_at(&config_root()?)
}

// ---------------------------------------------------------------------------
// 5. Save (atomic)
// ---------------------------------------------------------------------------

/// Validate and atomically save the config.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(root: &Path, config: &SessionConfig) -> Result<PathBuf, ConfigError> {
    config.validate()?;

    let path = config_path_at(root);
    let Some(dir) = path.parent() else {
        return Err(ConfigError::Invalid("config path has no parent".to_string()));
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        set_dir_permissions(dir)?;
    }

    let tmp_path = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &SessionConfig) -> Result<PathBuf, ConfigError> {
    save_at(&config_root()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn config_root() -> Result<PathBuf, ConfigError> {
    dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
