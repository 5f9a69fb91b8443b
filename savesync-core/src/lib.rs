//! savesync core library — domain types, version clock, session configuration.
//!
//! Public API surface:
//! - [`types`] — newtypes for artifact and group names
//! - [`clock`] — [`Token`] / [`SnapshotName`] encoding of modification instants
//! - [`config`] — [`SessionConfig`] load / save
//! - [`error`] — [`ClockError`], [`ConfigError`]

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{SnapshotName, Token, SNAPSHOT_SUFFIX};
pub use config::{ArtifactConfig, LaunchConfig, RemoteConfig, SessionConfig};
pub use error::{ClockError, ConfigError};
pub use types::{ArtifactName, GroupName};
