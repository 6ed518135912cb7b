//! Session registry
//!
//! Sessions are keyed by their normalized connection parameters, opened on
//! first use and reused by every later caller asking for the same key.

use crate::Shell;
use crate::connection::Connection;
use crate::error::Result;
use crate::local::LocalShell;
use crate::ssh::SshShell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Sessions = HashMap<String, Arc<dyn Shell>>;

/// Shared pool of open shells
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shell for `connection`, opening it if this is the first request
    pub fn get_or_connect(&self, connection: &Connection) -> Result<Arc<dyn Shell>> {
        let key = connection.normalized_key()?;
        self.get_or_insert_with(key, || {
            let shell: Arc<dyn Shell> = match connection {
                Connection::Local => Arc::new(LocalShell),
                Connection::Ssh(params) => Arc::new(SshShell::connect(params)?),
            };
            Ok(shell)
        })
    }

    /// Lookup under the lock so one key never gets two sessions
    fn get_or_insert_with<F>(&self, key: String, connect: F) -> Result<Arc<dyn Shell>>
    where
        F: FnOnce() -> Result<Arc<dyn Shell>>,
    {
        let mut sessions = self.lock();
        if let Some(shell) = sessions.get(&key) {
            log::debug!("reusing session {}", key);
            return Ok(Arc::clone(shell));
        }

        let shell = connect()?;
        log::debug!("opened session {}", key);
        sessions.insert(key, Arc::clone(&shell));
        Ok(shell)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close every session and forget it
    pub fn shutdown(&self) {
        let sessions: Vec<_> = self.lock().drain().collect();
        for (key, shell) in sessions {
            log::debug!("closing session {}", key);
            shell.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        match self.sessions.lock() {
            Ok(locked) => locked,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
