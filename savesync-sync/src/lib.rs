//! # savesync-sync
//!
//! Reconciliation between one local save and its remote snapshot group.
//!
//! [`run_session`] wraps a [`UseStep`] (usually the game) with a pre-use
//! fetch pass and a post-use publish pass. [`run_pull`] and [`run_push`] run
//! one side on its own; [`status::check`] only looks.

pub mod backup;
pub mod engine;
pub mod error;
pub mod launch;
pub mod locator;
pub mod onboard;
pub mod session;
pub mod status;

pub use backup::{backup_path, Backup, BACKUP_SUFFIX};
pub use engine::{FetchOutcome, PublishOutcome};
pub use error::{LaunchError, SyncError};
pub use launch::{launcher_from_config, CommandLauncher, SteamLauncher, UseStep};
pub use locator::{default_save_dir, resolve_artifact, Artifact, FsArtifacts, LocalArtifacts};
pub use session::{run_pull, run_push, run_session, PassReport, SessionReport};
pub use status::{Relation, SnapshotInfo, StatusReport};
