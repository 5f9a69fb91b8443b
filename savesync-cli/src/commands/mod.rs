//! Subcommands and the helpers they share.

pub mod groups;
pub mod play;
pub mod pull;
pub mod push;
pub mod setup;
pub mod snapshots;
pub mod status;

use std::fmt::Display;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

use savesync_core::{config, SessionConfig};
use savesync_store::RemoteStore;
use savesync_sync::{FetchOutcome, FsArtifacts, PassReport, PublishOutcome};

/// Load the saved configuration.
pub(crate) fn load_config() -> Result<SessionConfig> {
    config::load().context("failed to load configuration")
}

/// Locate the save directory named by the config.
pub(crate) fn open_artifacts(config: &SessionConfig) -> Result<FsArtifacts> {
    FsArtifacts::from_config(&config.artifact).context("cannot locate save files")
}

/// Connect to the configured remote; failure is an error for one-shot commands.
pub(crate) fn connect(config: &SessionConfig) -> Result<Box<dyn RemoteStore>> {
    savesync_store::connect(&config.remote)
        .with_context(|| format!("cannot open remote {}", config.remote.describe()))
}

// ---------------------------------------------------------------------------
// Status lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) enum Tone {
    Good,
    Plain,
    Warn,
    Bad,
}

pub(crate) fn paint(text: impl Display, tone: Tone) -> ColoredString {
    let text = text.to_string();
    match tone {
        Tone::Good => text.green(),
        Tone::Plain => text.normal(),
        Tone::Warn => text.yellow(),
        Tone::Bad => text.red().bold(),
    }
}

pub(crate) fn fetch_tone(outcome: &FetchOutcome) -> Tone {
    match outcome {
        FetchOutcome::Fetched { .. } => Tone::Good,
        FetchOutcome::Current { .. } | FetchOutcome::NoRemote { .. } => Tone::Plain,
    }
}

pub(crate) fn publish_tone(outcome: &PublishOutcome) -> Tone {
    match outcome {
        PublishOutcome::Published { .. } => Tone::Good,
        PublishOutcome::Unchanged { .. } | PublishOutcome::AlreadyPublished { .. } => Tone::Plain,
        PublishOutcome::Conflict { .. } => Tone::Warn,
    }
}

pub(crate) fn pass_tone<T>(report: &PassReport<T>, completed: impl Fn(&T) -> Tone) -> Tone {
    match report {
        PassReport::Completed(outcome) => completed(outcome),
        PassReport::Skipped { .. } => Tone::Warn,
        PassReport::Failed { .. } => Tone::Bad,
    }
}

/// `label  line`, one per outcome.
pub(crate) fn print_line(label: &str, line: impl Display, tone: Tone) {
    println!("{} {}", format!("{label:<5}").bold(), paint(line, tone));
}
