//! Session driver: pre-use pass, use step, post-use pass.
//!
//! The driver makes no reconciliation decisions. It resolves the artifact,
//! brackets the use step with a start and an end token, and turns pass
//! failures into reports. An unreachable remote never stops the use step.

use std::fmt;

use serde::Serialize;

use savesync_core::{ArtifactName, SessionConfig, Token};
use savesync_store::{RemoteStore, StoreError};

use crate::engine::{
    post_use, pre_use, publish, unchanged_since, FetchOutcome, PublishOutcome,
};
use crate::error::SyncError;
use crate::launch::UseStep;
use crate::locator::{resolve_artifact, Artifact, FsArtifacts};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pass", content = "detail", rename_all = "snake_case")]
pub enum PassReport<T> {
    Completed(T),
    /// The remote was not reachable; the pass did nothing.
    Skipped { reason: String },
    /// The pass started and failed. The local save was not partially written.
    Failed { reason: String },
}

impl<T> PassReport<T> {
    fn from_result(result: Result<T, SyncError>) -> Self {
        match result {
            Ok(outcome) => PassReport::Completed(outcome),
            Err(err) if err.is_connectivity() => {
                tracing::warn!("remote unavailable, skipping: {err}");
                PassReport::Skipped {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                tracing::error!("{err}");
                PassReport::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn from_store_error(err: &StoreError) -> Self {
        if err.is_connectivity() {
            PassReport::Skipped {
                reason: err.to_string(),
            }
        } else {
            PassReport::Failed {
                reason: err.to_string(),
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PassReport::Failed { .. })
    }
}

/// Everything one `play` session did.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub artifact: ArtifactName,
    pub pre: PassReport<FetchOutcome>,
    pub start: Token,
    /// Error text from the use step, if it failed.
    pub use_error: Option<String>,
    pub post: PassReport<PublishOutcome>,
}

impl SessionReport {
    /// `true` when a pass or the use step failed. Skips do not count.
    pub fn has_failures(&self) -> bool {
        self.pre.is_failed() || self.post.is_failed() || self.use_error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Status lines
// ---------------------------------------------------------------------------

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::NoRemote { group } => {
                write!(f, "no remote snapshots for '{group}', keeping local save")
            }
            FetchOutcome::Current { local, remote } if local == remote => {
                write!(f, "current: local save matches remote {remote}")
            }
            FetchOutcome::Current { local, remote } => {
                write!(f, "current: local save {local} is newer than remote {remote}")
            }
            FetchOutcome::Fetched {
                snapshot,
                path,
                bytes,
                backup,
            } => {
                write!(f, "fetched {snapshot} into {} ({bytes} bytes)", path.display())?;
                if let Some(backup) = backup {
                    write!(f, ", previous save at {}", backup.path.display())?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Unchanged { .. } => {
                write!(f, "current: save not modified, nothing to publish")
            }
            PublishOutcome::AlreadyPublished { snapshot } => {
                write!(f, "current: {snapshot} is already on the remote")
            }
            PublishOutcome::Published {
                snapshot,
                bytes,
                created_group,
            } => {
                write!(f, "published {snapshot} ({bytes} bytes)")?;
                if *created_group {
                    write!(f, " into a new group")?;
                }
                Ok(())
            }
            PublishOutcome::Conflict {
                local,
                remote,
                backup,
            } => write!(
                f,
                "conflict: local save {local} is older than remote {remote}; not published, backed up to {}",
                backup.path.display()
            ),
        }
    }
}

impl<T: fmt::Display> fmt::Display for PassReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassReport::Completed(outcome) => outcome.fmt(f),
            PassReport::Skipped { reason } => write!(f, "skipped: {reason}"),
            PassReport::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Run a full session around `use_step`.
///
/// `connect` is called once up front and, if that failed, once more before
/// the post-use pass. A missing save at the start is the only fatal error.
pub fn run_session<C>(
    config: &SessionConfig,
    artifacts: &FsArtifacts,
    mut connect: C,
    use_step: &mut dyn UseStep,
) -> Result<SessionReport, SyncError>
where
    C: FnMut() -> Result<Box<dyn RemoteStore>, StoreError>,
{
    let name = &config.artifact.name;
    let initial = resolve(artifacts, name)?;
    tracing::info!("session for {name}: {}", initial.path.display());

    let mut store = None;
    let pre = match connect() {
        Ok(remote) => {
            let report = PassReport::from_result(pre_use(
                remote.as_ref(),
                artifacts,
                &initial,
                config.artifact.backup_before_fetch,
            ));
            if !matches!(report, PassReport::Skipped { .. }) {
                store = Some(remote);
            }
            report
        }
        Err(err) => {
            tracing::warn!("cannot connect, skipping pre-use pass: {err}");
            PassReport::from_store_error(&err)
        }
    };

    // A fetch restamps the save, so the start token is read after the pass.
    let start = resolve(artifacts, name)?.token;

    tracing::info!("starting {}", use_step.describe());
    let use_error = match use_step.run() {
        Ok(()) => None,
        Err(err) => {
            tracing::warn!("use step failed: {err}");
            Some(err.to_string())
        }
    };

    let post = match resolve(artifacts, name) {
        Ok(end) => post_pass(&mut store, &mut connect, artifacts, &end, start),
        Err(err) => PassReport::from_result(Err(err)),
    };

    Ok(SessionReport {
        artifact: name.clone(),
        pre,
        start,
        use_error,
        post,
    })
}

fn post_pass<C>(
    store: &mut Option<Box<dyn RemoteStore>>,
    connect: &mut C,
    artifacts: &FsArtifacts,
    end: &Artifact,
    start: Token,
) -> PassReport<PublishOutcome>
where
    C: FnMut() -> Result<Box<dyn RemoteStore>, StoreError>,
{
    // Nothing to publish; no need to touch the network.
    if let Some(unchanged) = unchanged_since(end, start) {
        return PassReport::Completed(unchanged);
    }

    if store.is_none() {
        match connect() {
            Ok(remote) => *store = Some(remote),
            Err(err) => {
                tracing::warn!("cannot connect, skipping post-use pass: {err}");
                return PassReport::from_store_error(&err);
            }
        }
    }
    match store.as_deref() {
        Some(remote) => PassReport::from_result(post_use(remote, artifacts, end, start)),
        None => PassReport::Skipped {
            reason: "no remote connection".to_string(),
        },
    }
}

/// Pre-use pass on its own.
pub fn run_pull(
    config: &SessionConfig,
    artifacts: &FsArtifacts,
    store: &dyn RemoteStore,
) -> Result<FetchOutcome, SyncError> {
    let artifact = resolve(artifacts, &config.artifact.name)?;
    pre_use(
        store,
        artifacts,
        &artifact,
        config.artifact.backup_before_fetch,
    )
}

/// Publish the current save, without the modified-during-use gate.
pub fn run_push(
    config: &SessionConfig,
    artifacts: &FsArtifacts,
    store: &dyn RemoteStore,
) -> Result<PublishOutcome, SyncError> {
    let artifact = resolve(artifacts, &config.artifact.name)?;
    publish(store, artifacts, &artifact)
}

fn resolve(artifacts: &FsArtifacts, name: &ArtifactName) -> Result<Artifact, SyncError> {
    resolve_artifact(artifacts, name, artifacts.save_dir())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
