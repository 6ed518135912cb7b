//! Output capture for child processes
//!
//! Stdout and stderr are drained on their own threads. Each stream goes into
//! its own buffer and into a shared combined buffer, so the combined output
//! keeps the order in which chunks arrived.

use reconcile::{CommandOutput, ExecFailure};
use std::io::{Read, Write};
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type Shared = Arc<Mutex<Vec<u8>>>;

/// Feed `stdin` to the child, wait for it and collect everything it printed
pub fn collect(mut child: Child, stdin: Option<&[u8]>) -> CommandOutput {
    let combined: Shared = Arc::new(Mutex::new(Vec::new()));

    let stdout = child.stdout.take().map(|s| drain(s, Arc::clone(&combined)));
    let stderr = child.stderr.take().map(|s| drain(s, Arc::clone(&combined)));

    if let Some(mut pipe) = child.stdin.take() {
        if let Some(input) = stdin {
            if let Err(e) = pipe.write_all(input) {
                log::debug!("child closed stdin early: {}", e);
            }
        }
    }

    let status = child.wait();
    let stdout = join(stdout);
    let stderr = join(stderr);
    let combined = into_bytes(combined);

    let failure = match status {
        Ok(status) => failure_of(status),
        Err(e) => Some(ExecFailure::Transport(e.to_string())),
    };

    CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        combined: String::from_utf8_lossy(&combined).into_owned(),
        failure,
    }
}

/// Map an exit status to a failure, `None` on success
pub fn failure_of(status: ExitStatus) -> Option<ExecFailure> {
    if status.success() {
        return None;
    }
    Some(match status.code() {
        Some(code) => ExecFailure::Exit(code),
        None => ExecFailure::Signal,
    })
}

fn drain<R: Read + Send + 'static>(mut stream: R, combined: Shared) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut own = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    own.extend_from_slice(&chunk[..n]);
                    append(&combined, &chunk[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("stopped reading child output: {}", e);
                    break;
                }
            }
        }
        own
    })
}

fn append(combined: &Shared, bytes: &[u8]) {
    match combined.lock() {
        Ok(mut locked) => locked.extend_from_slice(bytes),
        Err(poisoned) => poisoned.into_inner().extend_from_slice(bytes),
    }
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn into_bytes(combined: Shared) -> Vec<u8> {
    match Arc::try_unwrap(combined) {
        Ok(mutex) => match mutex.into_inner() {
            Ok(bytes) => bytes,
            Err(poisoned) => poisoned.into_inner(),
        },
        Err(shared) => match shared.lock() {
            Ok(locked) => locked.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        },
    }
}
