//! Remote shell over the system ssh client
//!
//! One control master per session multiplexes every command over a single
//! authenticated connection. The control socket lives in a private temporary
//! directory removed when the session closes, together with any inline key
//! written next to it.

use crate::Shell;
use crate::capture;
use crate::connection::{Identity, SshParams, SshTarget};
use crate::error::{Error, Result};
use reconcile::{Bindings, CommandExecutor, CommandOutput, ExecFailure};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tempfile::TempDir;

/// ssh reserves this status for its own errors
const SSH_ERROR_STATUS: i32 = 255;

/// A multiplexed ssh session
pub struct SshShell {
    target: SshTarget,
    control_path: PathBuf,
    identity_file: Option<PathBuf>,
    control_dir: Mutex<Option<TempDir>>,
}

impl SshShell {
    /// Open the control master and check the host is reachable
    pub fn connect(params: &SshParams) -> Result<Self> {
        let target = params.normalize()?;
        let control_dir = tempfile::Builder::new()
            .prefix("shellkit-ssh-")
            .tempdir()?;
        let control_path = control_dir.path().join("master");
        let identity_file = match &target.identity {
            Identity::Default => None,
            Identity::File(path) => Some(path.clone()),
            Identity::Inline(key) => Some(write_identity(control_dir.path(), key)?),
        };

        let shell = Self {
            target,
            control_path,
            identity_file,
            control_dir: Mutex::new(Some(control_dir)),
        };

        log::info!("connecting to {}", shell.target);
        let output = shell
            .command()
            .arg("true")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: "ssh".to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::Unreachable {
                destination: shell.target.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(shell)
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// ssh invocation carrying the session options, up to the destination
    fn command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(session_options(
            &self.target,
            &self.control_path,
            self.identity_file.as_deref(),
        ));
        cmd.arg(self.target.destination());
        cmd
    }
}

/// Write an inline private key where only this user can read it
fn write_identity(dir: &Path, key: &str) -> Result<PathBuf> {
    let path = dir.join("identity");
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&path)?;
    file.write_all(key.as_bytes())?;
    if !key.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(path)
}

/// Options shared by every ssh call of a session
fn session_options(
    target: &SshTarget,
    control_path: &Path,
    identity_file: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "ControlMaster=auto".to_string(),
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
        "-o".to_string(),
        "ControlPersist=yes".to_string(),
        "-p".to_string(),
        target.port.to_string(),
    ];
    if let Some(flag) = target.protocol.flag() {
        args.push(flag.to_string());
    }
    if let Some(identity) = identity_file {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
        args.push("-o".to_string());
        args.push("IdentitiesOnly=yes".to_string());
    }
    args
}

/// Quote a value for a POSIX shell
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Script sent to the remote `sh -s`: exports, then the command itself
pub fn script(command: &str, bindings: &Bindings) -> String {
    let mut script = String::new();
    for (key, value) in bindings.iter() {
        script.push_str(&format!("export {}={}\n", key, quote(value)));
    }
    script.push_str(command);
    script.push('\n');
    script
}

impl CommandExecutor for SshShell {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
        let child = self
            .command()
            .args(["sh", "-s"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::failed(
                    ExecFailure::Transport(format!("failed to execute ssh: {}", e)),
                    "",
                );
            }
        };

        let mut output = capture::collect(child, Some(script(command, bindings).as_bytes()));
        if output.failure == Some(ExecFailure::Exit(SSH_ERROR_STATUS)) {
            output.failure = Some(ExecFailure::Transport(format!(
                "ssh to {} failed: {}",
                self.target,
                output.stderr.trim()
            )));
        }
        output
    }
}

impl Shell for SshShell {
    fn describe(&self) -> String {
        self.target.to_string()
    }

    fn close(&self) {
        let dir = match self.control_dir.lock() {
            Ok(mut locked) => locked.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(dir) = dir else {
            return;
        };

        log::debug!("closing ssh session to {}", self.target);
        let status = Command::new("ssh")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .args(["-O", "exit"])
            .arg(self.target.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = status {
            log::warn!("could not stop ssh control master for {}: {}", self.target, e);
        }

        if let Err(e) = dir.close() {
            log::warn!("could not remove ssh control directory: {}", e);
        }
    }
}

impl Drop for SshShell {
    fn drop(&mut self) {
        self.close();
    }
}
