//! savesync — keep a game save in step with a remote snapshot store.
//!
//! # Usage
//!
//! ```text
//! savesync [play]                       fetch, launch the game, publish
//! savesync pull | push
//! savesync status [--json] [--no-compare]
//! savesync snapshots [--name <name>] [--json]
//! savesync groups
//! savesync setup --name <name> (--sftp-host <host> --username <user> --identity-file <key> | --dir <path>)
//!                [--app-id <id> | --command <program> [args]...] [--pull | --push] [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    groups::GroupsArgs, play::PlayArgs, pull::PullArgs, push::PushArgs, setup::SetupArgs,
    snapshots::SnapshotsArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "savesync",
    version,
    about = "Sync a game save with remote snapshots around each play session",
    long_about = None,
)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch newer remote save, run the game, publish the result (default).
    Play(PlayArgs),

    /// Fetch the latest snapshot if it is newer than the local save.
    Pull(PullArgs),

    /// Publish the local save as a new snapshot.
    Push(PushArgs),

    /// Compare the local save with the latest snapshot.
    Status(StatusArgs),

    /// List the remote snapshots of a save.
    Snapshots(SnapshotsArgs),

    /// List every save group on the remote.
    Groups(GroupsArgs),

    /// Write the configuration and optionally seed one side.
    Setup(SetupArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command.unwrap_or(Commands::Play(PlayArgs::default())) {
        Commands::Play(args) => args.run(),
        Commands::Pull(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Snapshots(args) => args.run(),
        Commands::Groups(args) => args.run(),
        Commands::Setup(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
