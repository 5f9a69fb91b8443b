//! SFTP store driven through the OpenSSH `sftp` client in batch mode.
//!
//! Every operation is one `sftp -b -` invocation with key authentication and
//! `BatchMode=yes`, so a missing key or unknown host fails fast instead of
//! prompting. Commands are prefixed with `@` to suppress echo; a leading `-`
//! marks a command whose failure is expected and ignored.
//!
//! Exit status 255 (or a failure to spawn the client) means the server was
//! never reached and maps to [`StoreError::Unreachable`]. Any other failure
//! happened on a live connection and maps to [`StoreError::Transfer`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use savesync_core::GroupName;

use crate::error::{io_err, StoreError};
use crate::{RemoteEntry, RemoteStore};

const SSH_UNREACHABLE_STATUS: i32 = 255;
const CONNECT_TIMEOUT_SECS: u32 = 15;

/// A remote reached over SFTP.
#[derive(Debug, Clone)]
pub struct SftpStore {
    host: String,
    port: u16,
    username: String,
    identity_file: PathBuf,
    root: String,
    program: PathBuf,
}

impl SftpStore {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        identity_file: &Path,
        root: &str,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            identity_file: identity_file.to_path_buf(),
            root: root.trim_end_matches('/').to_string(),
            program: PathBuf::from("sftp"),
        }
    }

    /// Use a different client binary (tests, or a non-PATH OpenSSH install).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Check that the server accepts our key. Run once when connecting.
    pub fn verify(&self) -> Result<(), StoreError> {
        if !self.identity_file.exists() {
            return Err(StoreError::Unreachable {
                remote: self.describe(),
                reason: format!("identity file {} not found", self.identity_file.display()),
            });
        }
        self.batch("connect", &self.describe(), &["@pwd".to_string()])
            .map(|_| ())
    }

    fn group_path(&self, group: &GroupName) -> String {
        format!("{}/{}", self.root, group.0)
    }

    fn snapshot_path(&self, group: &GroupName, name: &str) -> String {
        format!("{}/{}", self.group_path(group), name)
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Run a batch of sftp commands and return stdout.
    fn batch(
        &self,
        op: &'static str,
        target: &str,
        commands: &[String],
    ) -> Result<String, StoreError> {
        let mut child = Command::new(&self.program)
            .arg("-b")
            .arg("-")
            .arg("-P")
            .arg(self.port.to_string())
            .arg("-i")
            .arg(&self.identity_file)
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"))
            .arg(self.destination())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::Unreachable {
                remote: self.describe(),
                reason: format!("cannot run {}: {e}", self.program.display()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let script = commands.join("\n") + "\n";
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| io_err(&self.program, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| io_err(&self.program, e))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        if output.status.code() == Some(SSH_UNREACHABLE_STATUS) || output.status.code().is_none()
        {
            return Err(StoreError::Unreachable {
                remote: self.describe(),
                reason: non_empty_or(stderr, "connection failed"),
            });
        }
        Err(StoreError::Transfer {
            op,
            target: target.to_string(),
            reason: non_empty_or(stderr, &format!("sftp exited with {}", output.status)),
        })
    }
}

impl RemoteStore for SftpStore {
    fn list_groups(&self) -> Result<Vec<GroupName>, StoreError> {
        let stdout = self.batch("list", &self.root, &[format!("@ls -ln {}", quote(&self.root))])?;
        let mut groups: Vec<GroupName> = parse_long_listing_dirs(&stdout)
            .into_iter()
            .map(GroupName)
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(groups)
    }

    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError> {
        // A missing root lists nothing; `-` keeps that from failing the batch.
        let stdout = self.batch(
            "list",
            &self.root,
            &[format!("-@ls -1a {}", quote(&self.root))],
        )?;
        let exists = listing_names(&stdout).any(|name| name == group.0);
        Ok(exists)
    }

    fn list_snapshots(&self, group: &GroupName) -> Result<Vec<RemoteEntry>, StoreError> {
        let dir = self.group_path(group);
        let stdout = self.batch("list", &dir, &[format!("@ls -ln {}", quote(&dir))])?;
        let mut entries = parse_long_listing(&stdout);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_group(&self, group: &GroupName) -> Result<(), StoreError> {
        let dir = self.group_path(group);
        self.batch(
            "mkdir",
            &dir,
            &[
                format!("-@mkdir {}", quote(&self.root)),
                format!("@mkdir {}", quote(&dir)),
            ],
        )
        .map(|_| ())
    }

    fn read_snapshot(&self, group: &GroupName, name: &str) -> Result<Vec<u8>, StoreError> {
        let remote = self.snapshot_path(group, name);
        let local = tempfile::NamedTempFile::new().map_err(|e| io_err(std::env::temp_dir(), e))?;
        self.batch(
            "get",
            &remote,
            &[format!(
                "@get {} {}",
                quote(&remote),
                quote(&local.path().to_string_lossy())
            )],
        )?;
        std::fs::read(local.path()).map_err(|e| io_err(local.path(), e))
    }

    fn write_snapshot(
        &self,
        group: &GroupName,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        if self.list_snapshots(group)?.iter().any(|e| e.name == name) {
            return Err(StoreError::SnapshotExists {
                group: group.0.clone(),
                name: name.to_string(),
            });
        }

        let remote = self.snapshot_path(group, name);
        let partial = format!("{remote}.partial");

        let mut local =
            tempfile::NamedTempFile::new().map_err(|e| io_err(std::env::temp_dir(), e))?;
        local
            .write_all(bytes)
            .and_then(|_| local.flush())
            .map_err(|e| io_err(local.path(), e))?;

        self.batch(
            "put",
            &remote,
            &upload_script(&local.path().to_string_lossy(), &partial, &remote),
        )?;
        tracing::debug!("uploaded snapshot: {remote}");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.root)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Upload to `partial`, then move it into place.
///
/// `rename -l` forces the plain SFTP rename, which fails when `remote` exists.
/// The client otherwise prefers `posix-rename@openssh.com`, which replaces it.
fn upload_script(local: &str, partial: &str, remote: &str) -> Vec<String> {
    vec![
        format!("@put {} {}", quote(local), quote(partial)),
        format!("@rename -l {} {}", quote(partial), quote(remote)),
    ]
}

/// Quote an argument for the sftp batch parser.
fn quote(arg: &str) -> String {
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn non_empty_or(s: String, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s
    }
}

/// Last path segment of each `ls -1` line, minus echo lines and dot entries.
fn listing_names(stdout: &str) -> impl Iterator<Item = &str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("sftp>"))
        .map(|line| line.rsplit('/').next().unwrap_or(line))
        .filter(|name| *name != "." && *name != "..")
}

/// Directory names from `ls -ln` output, minus dot entries.
fn parse_long_listing_dirs(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 9 || !fields[0].starts_with('d') {
                return None;
            }
            let path = fields[8..].join(" ");
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            (name != "." && name != "..").then_some(name)
        })
        .collect()
}

/// Parse `ls -ln` output into regular-file entries.
///
/// Line shape: `-rw-r--r--  1 1000 1000  1234 Mar  7 09:05 /saves/W/240307-090501.sav`
fn parse_long_listing(stdout: &str) -> Vec<RemoteEntry> {
    stdout
        .lines()
        .filter(|line| !line.starts_with("sftp>"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 9 || !fields[0].starts_with('-') {
                return None;
            }
            let size = fields[4].parse::<u64>().ok()?;
            let path = fields[8..].join(" ");
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            Some(RemoteEntry { name, size })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quote_escapes_quotes_and_backslashes() {
        assert_eq!(quote("/saves/My World"), "\"/saves/My World\"");
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn listing_names_strip_paths_and_echo() {
        let out = "sftp> ls -1a /saves\n/saves/.\n/saves/..\n/saves/MyWorld\nOther\n";
        let names: Vec<&str> = listing_names(out).collect();
        assert_eq!(names, vec!["MyWorld", "Other"]);
    }

    #[test]
    fn long_listing_keeps_files_only() {
        let out = "\
drwxr-xr-x    2 1000     1000         4096 Mar  7 09:05 /saves/W/old
-rw-r--r--    1 1000     1000      1048576 Mar  7 09:05 /saves/W/240307-090501.sav
-rw-r--r--    1 1000     1000           12 Mar  9 21:17 240309-211744.sav
garbage line
";
        assert_eq!(
            parse_long_listing(out),
            vec![
                RemoteEntry { name: "240307-090501.sav".into(), size: 1_048_576 },
                RemoteEntry { name: "240309-211744.sav".into(), size: 12 },
            ]
        );
    }

    #[test]
    fn long_listing_dirs_are_groups() {
        let out = "\
drwxr-xr-x    2 1000     1000         4096 Mar  7 09:05 /saves/My World
-rw-r--r--    1 1000     1000           12 Mar  9 21:17 /saves/readme.txt
drwxr-xr-x    2 1000     1000         4096 Mar  7 09:05 /saves/Other
";
        assert_eq!(parse_long_listing_dirs(out), vec!["My World", "Other"]);
    }

    #[test]
    fn missing_identity_file_is_connectivity_failure() {
        let tmp = TempDir::new().unwrap();
        let store = SftpStore::new("example.org", 22, "alice", &tmp.path().join("nokey"), "/saves");
        let err = store.verify().unwrap_err();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("identity file"));
    }

    #[test]
    fn missing_client_binary_is_connectivity_failure() {
        let tmp = TempDir::new().unwrap();
        let key = tmp.path().join("id_ed25519");
        std::fs::write(&key, "key").unwrap();
        let store = SftpStore::new("example.org", 22, "alice", &key, "/saves/")
            .with_program(tmp.path().join("no-such-sftp"));

        let err = store.group_exists(&GroupName::from("W")).unwrap_err();
        assert!(err.is_connectivity(), "got: {err}");
    }

    #[test]
    fn upload_uses_non_replacing_rename() {
        let script = upload_script("/tmp/x", "/saves/W/a.sav.partial", "/saves/W/a.sav");
        assert_eq!(script[0], r#"@put "/tmp/x" "/saves/W/a.sav.partial""#);
        assert_eq!(script[1], r#"@rename -l "/saves/W/a.sav.partial" "/saves/W/a.sav""#);
    }

    /// A stand-in client that logs its batch and always lists one snapshot.
    #[cfg(unix)]
    fn fake_client(dir: &Path) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("batch.log");
        let program = dir.join("fake-sftp");
        std::fs::write(
            &program,
            format!(
                "#!/bin/sh\ncat >> '{}'\necho '-rw-r--r--    1 1000 1000  12 Mar  9 21:17 /saves/W/240309-211744.sav'\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        (program, log)
    }

    #[cfg(unix)]
    #[test]
    fn write_refuses_existing_snapshot_before_upload() {
        let tmp = TempDir::new().unwrap();
        let (program, log) = fake_client(tmp.path());
        let store = SftpStore::new("h", 22, "u", Path::new("/k"), "/saves").with_program(program);

        let err = store
            .write_snapshot(&GroupName::from("W"), "240309-211744.sav", b"new")
            .unwrap_err();
        assert!(matches!(err, StoreError::SnapshotExists { .. }), "got: {err}");
        let batches = std::fs::read_to_string(&log).unwrap();
        assert!(!batches.contains("put"));
    }

    #[cfg(unix)]
    #[test]
    fn write_new_snapshot_uploads_then_renames() {
        let tmp = TempDir::new().unwrap();
        let (program, log) = fake_client(tmp.path());
        let store = SftpStore::new("h", 22, "u", Path::new("/k"), "/saves").with_program(program);

        store
            .write_snapshot(&GroupName::from("W"), "240310-080000.sav", b"new")
            .unwrap();
        let batches = std::fs::read_to_string(&log).unwrap();
        assert!(batches.contains("@rename -l \"/saves/W/240310-080000.sav.partial\""));
    }

    #[test]
    fn root_trailing_slash_is_trimmed() {
        let store = SftpStore::new("h", 22, "u", Path::new("/k"), "/saves/");
        assert_eq!(store.describe(), "u@h:/saves");
        assert_eq!(
            store.snapshot_path(&GroupName::from("W"), "240307-090501.sav"),
            "/saves/W/240307-090501.sav"
        );
    }
}
