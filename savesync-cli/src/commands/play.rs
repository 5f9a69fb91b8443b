//! `savesync play` — one full session around the game.

use anyhow::{bail, Context, Result};
use clap::Args;

use savesync_sync::{launcher_from_config, run_session};

use super::{
    fetch_tone, load_config, open_artifacts, pass_tone, print_line, publish_tone, Tone,
};

/// Arguments for `savesync play`.
#[derive(Args, Debug, Default)]
pub struct PlayArgs {
    /// Emit the session report as JSON instead of status lines.
    #[arg(long)]
    pub json: bool,
}

impl PlayArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let artifacts = open_artifacts(&config)?;
        let mut launcher = launcher_from_config(&config.launch);

        let report = run_session(
            &config,
            &artifacts,
            || savesync_store::connect(&config.remote),
            launcher.as_mut(),
        )
        .with_context(|| format!("cannot start a session for '{}'", config.artifact.name))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_line("pull", &report.pre, pass_tone(&report.pre, fetch_tone));
            match &report.use_error {
                Some(err) => print_line("play", format!("failed: {err}"), Tone::Bad),
                None => print_line("play", "finished", Tone::Plain),
            }
            print_line("push", &report.post, pass_tone(&report.post, publish_tone));
        }

        if report.has_failures() {
            bail!("session for '{}' finished with errors", report.artifact);
        }
        Ok(())
    }
}
