//! `savesync groups` — every save published to the remote.

use anyhow::{Context, Result};
use clap::Args;

use super::{connect, load_config};

/// Arguments for `savesync groups`.
#[derive(Args, Debug)]
pub struct GroupsArgs {}

impl GroupsArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let store = connect(&config)?;
        let groups = store.list_groups().context("cannot list remote groups")?;
        if groups.is_empty() {
            println!("No saves on {}.", store.describe());
            return Ok(());
        }
        for group in groups {
            let marker = if group == config.artifact.name.group() { "*" } else { " " };
            println!("{marker} {group}");
        }
        Ok(())
    }
}
