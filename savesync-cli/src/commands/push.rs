//! `savesync push` — publish without a play session.

use anyhow::{Context, Result};
use clap::Args;

use savesync_sync::run_push;

use super::{connect, load_config, open_artifacts, print_line, publish_tone};

/// Arguments for `savesync push`.
#[derive(Args, Debug)]
pub struct PushArgs {}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let artifacts = open_artifacts(&config)?;
        let store = connect(&config)?;
        let outcome = run_push(&config, &artifacts, store.as_ref())
            .with_context(|| format!("push failed for '{}'", config.artifact.name))?;
        print_line("push", &outcome, publish_tone(&outcome));
        Ok(())
    }
}
