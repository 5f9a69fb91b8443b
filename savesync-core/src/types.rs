//! Domain newtypes shared by every savesync crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical name of a synced artifact (the save name, e.g. `"MyWorld"`).
///
/// The same string names the local save files and the remote group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactName(pub String);

impl ArtifactName {
    /// Remote group holding this artifact's snapshots.
    pub fn group(&self) -> GroupName {
        GroupName(self.0.clone())
    }

    /// A name is usable when it is non-empty and is a single path segment.
    pub fn is_valid(&self) -> bool {
        let s = self.0.trim();
        !s.is_empty() && s == self.0 && !s.contains(['/', '\\']) && s != "." && s != ".."
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ArtifactName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArtifactName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of a remote group (one directory of snapshots).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(pub String);

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for GroupName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ArtifactName::from("MyWorld").to_string(), "MyWorld");
        assert_eq!(GroupName::from("MyWorld").to_string(), "MyWorld");
    }

    #[test]
    fn group_shares_the_artifact_name() {
        let name = ArtifactName::from(String::from("Factory 2"));
        assert_eq!(name.group(), GroupName::from("Factory 2"));
    }

    #[test]
    fn validity_rejects_path_segments() {
        assert!(ArtifactName::from("MyWorld").is_valid());
        assert!(!ArtifactName::from("").is_valid());
        assert!(!ArtifactName::from(" padded").is_valid());
        assert!(!ArtifactName::from("a/b").is_valid());
        assert!(!ArtifactName::from("..").is_valid());
    }
}
