//! `savesync pull` — pre-use pass only.

use anyhow::{Context, Result};
use clap::Args;

use savesync_sync::run_pull;

use super::{connect, fetch_tone, load_config, open_artifacts, print_line};

/// Arguments for `savesync pull`.
#[derive(Args, Debug)]
pub struct PullArgs {}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let artifacts = open_artifacts(&config)?;
        let store = connect(&config)?;
        let outcome = run_pull(&config, &artifacts, store.as_ref())
            .with_context(|| format!("pull failed for '{}'", config.artifact.name))?;
        print_line("pull", &outcome, fetch_tone(&outcome));
        Ok(())
    }
}
