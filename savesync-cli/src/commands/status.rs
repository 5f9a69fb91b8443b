//! `savesync status` — where the local save stands against the remote.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use savesync_sync::status::{check, format_datetime_age};
use savesync_sync::{Relation, StatusReport};

use super::{connect, load_config, open_artifacts, paint, Tone};

/// Arguments for `savesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Skip downloading the latest snapshot to compare contents.
    #[arg(long)]
    pub no_compare: bool,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    remote: String,
    #[serde(flatten)]
    report: &'a StatusReport,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let artifacts = open_artifacts(&config)?;
        let store = connect(&config)?;
        let report = check(
            store.as_ref(),
            &artifacts,
            &config.artifact.name,
            !self.no_compare,
        )
        .with_context(|| format!("status check failed for '{}'", config.artifact.name))?;

        if self.json {
            let payload = StatusJson {
                remote: store.describe(),
                report: &report,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_report(&report, &store.describe());
        Ok(())
    }
}

fn print_report(report: &StatusReport, remote: &str) {
    println!("{} {}", "save  ".bold(), report.artifact);
    println!("{} {}", "file  ".bold(), report.path.display());
    println!("{} {}", "remote".bold(), remote);
    println!(
        "{} {} ({} ago)",
        "local ".bold(),
        report.local,
        format_datetime_age(report.local.instant())
    );
    match &report.remote {
        Some(latest) => println!(
            "{} {} ({} ago, {} bytes)",
            "latest".bold(),
            latest.name,
            format_datetime_age(latest.time),
            latest.size
        ),
        None => println!("{} {}", "latest".bold(), "none".bright_black()),
    }
    println!(
        "{} {}",
        "state ".bold(),
        paint(report.relation.key().to_uppercase(), relation_tone(report.relation))
    );
    match report.identical {
        Some(true) => println!("{} {}", "bytes ".bold(), "identical".green()),
        Some(false) => println!("{} {}", "bytes ".bold(), "different".yellow()),
        None => {}
    }
    println!("{}", hint(report.relation).bright_black());
}

fn relation_tone(relation: Relation) -> Tone {
    match relation {
        Relation::Current => Tone::Good,
        Relation::NoRemote => Tone::Plain,
        Relation::RemoteNewer | Relation::LocalNewer => Tone::Warn,
    }
}

fn hint(relation: Relation) -> &'static str {
    match relation {
        Relation::NoRemote => "Nothing published yet. Run 'savesync push' to publish this save.",
        Relation::Current => "Up to date.",
        Relation::RemoteNewer => "Remote is newer. Run 'savesync pull' or 'savesync play'.",
        Relation::LocalNewer => "Local save is newer. Run 'savesync push' to publish it.",
    }
}
