//! `savesync setup` — write the configuration, optionally seed one side.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use savesync_core::config::{
    self, DEFAULT_APP_ID, DEFAULT_PROCESS_NAME, DEFAULT_STARTUP_TIMEOUT_SECS,
};
use savesync_core::{ArtifactConfig, ArtifactName, LaunchConfig, RemoteConfig, SessionConfig};
use savesync_sync::onboard::{local_save_names, pull_initial};
use savesync_sync::{default_save_dir, run_push, FsArtifacts};

use super::{connect, print_line, publish_tone, Tone};

/// Arguments for `savesync setup`.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Save name, e.g. "MyWorld" for MyWorld_autosave_0.sav.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Directory holding the save files (defaults to the game's save folder).
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Use a plain directory as the remote (local disk, share, sshfs mount).
    #[arg(long, value_name = "PATH", conflicts_with_all = ["sftp_host", "username", "identity_file"])]
    pub dir: Option<PathBuf>,

    /// SFTP server host name.
    #[arg(long, value_name = "HOST")]
    pub sftp_host: Option<String>,

    /// SFTP server port.
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SFTP user name.
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Private key used to authenticate.
    #[arg(long, short = 'i', value_name = "KEY")]
    pub identity_file: Option<PathBuf>,

    /// Directory on the SFTP server that holds the save groups.
    #[arg(long, default_value = "/saves")]
    pub remote_root: String,

    /// Steam app id to launch.
    #[arg(long, conflicts_with = "command")]
    pub app_id: Option<u32>,

    /// Process to wait for after launching through Steam.
    #[arg(long, conflicts_with = "command")]
    pub process_name: Option<String>,

    /// Launch this program (and arguments) instead of going through Steam.
    #[arg(long, num_args = 1.., value_name = "PROGRAM")]
    pub command: Vec<String>,

    /// Keep a .backup copy of the local save before each fetch.
    #[arg(long)]
    pub backup_before_fetch: bool,

    /// Download the latest snapshot as the local save.
    #[arg(long, conflicts_with = "push")]
    pub pull: bool,

    /// Publish the local save.
    #[arg(long)]
    pub push: bool,

    /// With --pull, move existing local saves of this name aside.
    #[arg(long)]
    pub force: bool,
}

impl SetupArgs {
    pub fn run(self) -> Result<()> {
        let Some(name) = self.name.clone() else {
            return Err(missing_name(&self));
        };

        let config = SessionConfig {
            artifact: ArtifactConfig {
                save_dir: self.save_dir.clone(),
                backup_before_fetch: self.backup_before_fetch,
                ..ArtifactConfig::new(ArtifactName::from(name))
            },
            remote: self.remote()?,
            launch: self.launch(),
        };
        let path = config::save(&config).context("failed to save configuration")?;
        println!("✓ Saved configuration for '{}'", config.artifact.name);
        println!("  Config: {}", path.display());
        println!("  Remote: {}", config.remote.describe());

        if !self.pull && !self.push {
            return Ok(());
        }

        let artifacts = FsArtifacts::from_config(&config.artifact)
            .context("cannot locate save files")?;
        let store = connect(&config)?;

        if self.pull {
            let pulled = pull_initial(store.as_ref(), &artifacts, &config.artifact.name, self.force)
                .with_context(|| format!("initial pull failed for '{}'", config.artifact.name))?;
            for backup in &pulled.backups {
                print_line("moved", backup.path.display(), Tone::Warn);
            }
            print_line(
                "pull",
                format!(
                    "fetched {} into {} ({} bytes)",
                    pulled.snapshot,
                    pulled.path.display(),
                    pulled.bytes
                ),
                Tone::Good,
            );
        } else {
            let outcome = run_push(&config, &artifacts, store.as_ref())
                .with_context(|| format!("initial push failed for '{}'", config.artifact.name))?;
            print_line("push", &outcome, publish_tone(&outcome));
        }
        Ok(())
    }

    fn remote(&self) -> Result<RemoteConfig> {
        if let Some(root) = &self.dir {
            return Ok(RemoteConfig::Directory { root: root.clone() });
        }
        let (Some(host), Some(username)) = (&self.sftp_host, &self.username) else {
            bail!("choose a remote: --dir <path>, or --sftp-host <host> with --username <user>");
        };
        let identity_file = match &self.identity_file {
            Some(path) => path.clone(),
            None => dirs::home_dir()
                .context("could not determine home directory")?
                .join(".ssh")
                .join("id_ed25519"),
        };
        Ok(RemoteConfig::Sftp {
            host: host.clone(),
            port: self.port,
            username: username.clone(),
            identity_file,
            root: self.remote_root.clone(),
        })
    }

    fn launch(&self) -> LaunchConfig {
        if let Some((program, args)) = self.command.split_first() {
            return LaunchConfig::Command {
                program: program.clone(),
                args: args.to_vec(),
            };
        }
        LaunchConfig::Steam {
            app_id: self.app_id.unwrap_or(DEFAULT_APP_ID),
            process_name: self
                .process_name
                .clone()
                .unwrap_or_else(|| DEFAULT_PROCESS_NAME.to_string()),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
        }
    }
}

/// Error for a missing `--name`, listing the saves that could be meant.
fn missing_name(args: &SetupArgs) -> anyhow::Error {
    let save_dir = match &args.save_dir {
        Some(dir) => Some(dir.clone()),
        None => default_save_dir().ok(),
    };
    let defaults = ArtifactConfig::new(ArtifactName::from(""));
    let names = save_dir
        .and_then(|dir| local_save_names(&dir, &defaults.marker, &defaults.extension).ok())
        .unwrap_or_default();
    if names.is_empty() {
        anyhow::anyhow!("--name is required")
    } else {
        anyhow::anyhow!("--name is required; local saves: {}", names.join(", "))
    }
}
