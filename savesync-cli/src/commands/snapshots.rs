//! `savesync snapshots` — the published history of a save.

use anyhow::{bail, Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use savesync_core::ArtifactName;
use savesync_sync::status::{format_datetime_age, list_snapshots};

use super::{connect, load_config};

/// Arguments for `savesync snapshots`.
#[derive(Args, Debug)]
pub struct SnapshotsArgs {
    /// Save name to list (defaults to the configured one).
    #[arg(long)]
    pub name: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "snapshot")]
    name: String,
    #[tabled(rename = "time (UTC)")]
    time: String,
    #[tabled(rename = "age")]
    age: String,
    #[tabled(rename = "bytes")]
    size: u64,
}

impl SnapshotsArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let name = match self.name {
            Some(name) => ArtifactName::from(name.as_str()),
            None => config.artifact.name.clone(),
        };
        if !name.is_valid() {
            bail!("invalid save name '{name}': must be a single path segment");
        }
        let group = name.group();
        let store = connect(&config)?;

        let snapshots = list_snapshots(store.as_ref(), &group)
            .with_context(|| format!("cannot list snapshots of '{group}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshots)
                    .context("failed to serialize snapshots JSON")?
            );
            return Ok(());
        }

        if snapshots.is_empty() {
            println!("No snapshots of '{group}' on {}.", store.describe());
            return Ok(());
        }

        println!("{} snapshot(s) of '{group}' on {}", snapshots.len(), store.describe());
        let rows: Vec<SnapshotRow> = snapshots
            .iter()
            .rev()
            .map(|s| SnapshotRow {
                name: s.name.to_string(),
                time: s.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                age: format_datetime_age(s.time),
                size: s.size,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
