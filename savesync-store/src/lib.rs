//! # savesync-store
//!
//! Remote snapshot storage behind the [`RemoteStore`] trait.
//!
//! A store is a flat namespace of groups, each holding immutable snapshot
//! files. Two backends ship here:
//! - [`DirStore`] — a directory tree (local disk, network share, sshfs mount)
//! - [`SftpStore`] — an SFTP server driven through the OpenSSH `sftp` client
//!
//! [`connect`] turns a [`RemoteConfig`] into a live, boxed store.

pub mod dir;
pub mod error;
pub mod sftp;

pub use dir::DirStore;
pub use error::StoreError;
pub use sftp::SftpStore;

use savesync_core::{GroupName, RemoteConfig};

/// One entry of a group listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub size: u64,
}

/// Capabilities the reconciliation engine needs from a remote store.
///
/// Implementations must never leave a partially written object under a
/// snapshot's final name, and must refuse to replace an existing snapshot.
pub trait RemoteStore {
    /// Every group under the store root, sorted by name.
    fn list_groups(&self) -> Result<Vec<GroupName>, StoreError>;

    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError>;

    /// Entries of `group`, sorted by name. Callers derive timestamps from names.
    fn list_snapshots(&self, group: &GroupName) -> Result<Vec<RemoteEntry>, StoreError>;

    fn create_group(&self, group: &GroupName) -> Result<(), StoreError>;

    fn read_snapshot(&self, group: &GroupName, name: &str) -> Result<Vec<u8>, StoreError>;

    fn write_snapshot(&self, group: &GroupName, name: &str, bytes: &[u8])
        -> Result<(), StoreError>;

    /// Human-readable location used in status lines.
    fn describe(&self) -> String;
}

/// Open a connection to the configured remote.
///
/// Fails with a connectivity error ([`StoreError::is_connectivity`]) when the
/// remote cannot be reached; the session treats that as a skipped pass.
pub fn connect(config: &RemoteConfig) -> Result<Box<dyn RemoteStore>, StoreError> {
    match config {
        RemoteConfig::Directory { root } => Ok(Box::new(DirStore::open(root)?)),
        RemoteConfig::Sftp {
            host,
            port,
            username,
            identity_file,
            root,
        } => {
            let store = SftpStore::new(host, *port, username, identity_file, root);
            store.verify()?;
            Ok(Box::new(store))
        }
    }
}
