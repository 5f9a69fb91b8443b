//! Error types for savesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from encoding or decoding version tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The instant cannot be represented by a two-digit-year token.
    #[error("instant {instant} is outside the supported token range (2000..=2099)")]
    OutOfRange { instant: String },

    /// The string is not a `yyMMdd-HHmmss` token.
    #[error("malformed version token '{0}'")]
    Malformed(String),

    /// The string is not `<token>.sav`.
    #[error("'{0}' is not a snapshot name")]
    NotASnapshot(String),
}

/// All errors that can arise from configuration loading and saving.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine config directory; set $HOME or equivalent")]
    ConfigDirNotFound,

    /// No config file has been written yet.
    #[error("no configuration at {path}; run `savesync setup` first")]
    NotFound { path: PathBuf },

    /// Config parsed but a value is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
