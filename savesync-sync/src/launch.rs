//! The use step: run the game and block until it exits.

use std::process::Command;
use std::thread::sleep;
use std::time::{Duration, Instant};

use savesync_core::LaunchConfig;

use crate::error::LaunchError;

/// An opaque, blocking interval during which the artifact may change.
pub trait UseStep {
    fn run(&mut self) -> Result<(), LaunchError>;

    fn describe(&self) -> String;
}

/// Build the configured launcher.
pub fn launcher_from_config(config: &LaunchConfig) -> Box<dyn UseStep> {
    match config {
        LaunchConfig::Steam {
            app_id,
            process_name,
            startup_timeout_secs,
        } => Box::new(SteamLauncher::new(
            *app_id,
            process_name,
            Duration::from_secs(*startup_timeout_secs),
        )),
        LaunchConfig::Command { program, args } => {
            Box::new(CommandLauncher::new(program, args.clone()))
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Runs a program directly and waits for it.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }
}

impl UseStep for CommandLauncher {
    fn run(&mut self) -> Result<(), LaunchError> {
        tracing::info!("running {} {:?}", self.program, self.args);
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(LaunchError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.program.clone()
    }
}

// ---------------------------------------------------------------------------
// Steam
// ---------------------------------------------------------------------------

type Opener = fn(&str) -> Result<(), LaunchError>;
type Probe = fn(&str) -> Result<bool, LaunchError>;

/// Starts a game through its `steam://` URL, then follows the game process.
///
/// Steam returns immediately, so the launcher polls for `process_name` to
/// appear (bounded by the startup timeout) and then to disappear (unbounded).
#[derive(Debug, Clone)]
pub struct SteamLauncher {
    app_id: u32,
    process_name: String,
    startup_timeout: Duration,
    poll_interval: Duration,
    opener: Opener,
    probe: Probe,
}

impl SteamLauncher {
    pub fn new(app_id: u32, process_name: &str, startup_timeout: Duration) -> Self {
        Self {
            app_id,
            process_name: process_name.to_string(),
            startup_timeout,
            poll_interval: Duration::from_secs(1),
            opener: open_uri,
            probe: process_running,
        }
    }

    /// Swap the platform hooks; used by tests.
    pub fn with_hooks(mut self, opener: Opener, probe: Probe, poll_interval: Duration) -> Self {
        self.opener = opener;
        self.probe = probe;
        self.poll_interval = poll_interval;
        self
    }

    pub fn uri(&self) -> String {
        format!("steam://rungameid/{}", self.app_id)
    }
}

impl UseStep for SteamLauncher {
    fn run(&mut self) -> Result<(), LaunchError> {
        (self.opener)(&self.uri())?;

        let started = Instant::now();
        while !(self.probe)(&self.process_name)? {
            if started.elapsed() >= self.startup_timeout {
                return Err(LaunchError::NeverStarted {
                    process: self.process_name.clone(),
                    waited_secs: self.startup_timeout.as_secs(),
                });
            }
            sleep(self.poll_interval);
        }
        tracing::info!("{} started", self.process_name);

        while (self.probe)(&self.process_name)? {
            sleep(self.poll_interval);
        }
        tracing::info!("{} exited", self.process_name);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} (steam app {})", self.process_name, self.app_id)
    }
}

#[cfg(target_os = "windows")]
fn open_uri(uri: &str) -> Result<(), LaunchError> {
    spawn_opener("cmd", &["/c", "start", "", uri])
}

#[cfg(target_os = "macos")]
fn open_uri(uri: &str) -> Result<(), LaunchError> {
    spawn_opener("open", &[uri])
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn open_uri(uri: &str) -> Result<(), LaunchError> {
    spawn_opener("xdg-open", &[uri])
}

fn spawn_opener(program: &str, args: &[&str]) -> Result<(), LaunchError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| LaunchError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(LaunchError::Failed {
            program: program.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn process_running(name: &str) -> Result<bool, LaunchError> {
    // Linux process names are cut to 15 bytes; `-x` compares against that.
    let comm: String = name.chars().take(15).collect();
    let status = Command::new("pgrep")
        .arg("-x")
        .arg(comm)
        .stdout(std::process::Stdio::null())
        .status()
        .map_err(LaunchError::Probe)?;
    Ok(status.success())
}

#[cfg(windows)]
fn process_running(name: &str) -> Result<bool, LaunchError> {
    let image = format!("{name}.exe");
    let output = Command::new("tasklist")
        .args(["/FI", &format!("IMAGENAME eq {image}"), "/NH"])
        .output()
        .map_err(LaunchError::Probe)?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_ascii_lowercase();
    Ok(stdout.contains(&image.to_ascii_lowercase()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
