//! Connection parameters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_USERNAME: &str = "root";

/// Where commands run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Connection {
    /// `sh -c` on this machine
    #[default]
    Local,
    /// `sh -s` on a remote host through the system ssh client
    Ssh(SshParams),
}

/// ssh connection parameters as declared
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshParams {
    #[serde(default)]
    pub hostname: String,
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub username: Option<String>,
    /// Path to a private key
    #[serde(alias = "keyfile")]
    pub identity_file: Option<PathBuf>,
    /// Private key given inline; wins over `identity_file`
    pub key: Option<String>,
    /// Only declared so it can be refused with a clear message
    pub password: Option<String>,
    /// Only declared so it can be refused with a clear message
    #[serde(alias = "keypassword")]
    pub key_password: Option<String>,
}

impl fmt::Debug for SshParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |set: bool| if set { Some("..") } else { None };
        f.debug_struct("SshParams")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("identity_file", &self.identity_file)
            .field("key", &redacted(self.key.is_some()))
            .field("password", &redacted(self.password.is_some()))
            .field("key_password", &redacted(self.key_password.is_some()))
            .finish()
    }
}

/// Address family used to reach the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Whatever the resolver returns
    #[default]
    Tcp,
    /// IPv4 only
    Tcp4,
    /// IPv6 only
    Tcp6,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
        }
    }

    /// ssh flag selecting the address family, if any
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::Tcp => None,
            Self::Tcp4 => Some("-4"),
            Self::Tcp6 => Some("-6"),
        }
    }
}

/// Where the private key of a session comes from
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// ssh agent or the client's default keys
    Default,
    /// Key file on disk
    File(PathBuf),
    /// Key material written to the session directory on connect
    Inline(String),
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// ssh parameters with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SshTarget {
    pub hostname: String,
    pub port: u16,
    pub protocol: Protocol,
    pub username: String,
    pub identity: Identity,
}

const BATCH_MODE: &str = "commands run with BatchMode=yes, use key or keyfile instead";

impl SshParams {
    /// Apply defaults; a missing hostname or a password is an error
    pub fn normalize(&self) -> Result<SshTarget> {
        let hostname = self.hostname.trim();
        if hostname.is_empty() {
            return Err(Error::MissingParameter("hostname"));
        }
        if self.password.is_some() {
            return Err(Error::UnsupportedParameter {
                parameter: "password",
                reason: BATCH_MODE,
            });
        }
        if self.key_password.is_some() {
            return Err(Error::UnsupportedParameter {
                parameter: "keypassword",
                reason: BATCH_MODE,
            });
        }

        let identity = match (&self.key, &self.identity_file) {
            (Some(key), _) if !key.trim().is_empty() => Identity::Inline(key.clone()),
            (_, Some(path)) => Identity::File(path.clone()),
            _ => Identity::Default,
        };

        Ok(SshTarget {
            hostname: hostname.to_string(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            protocol: self.protocol.unwrap_or_default(),
            username: self
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            identity,
        })
    }
}

impl SshTarget {
    /// `user@host` as passed to ssh
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.hostname)
    }

    /// Registry key: the display form, plus a fingerprint of an inline key
    fn key(&self) -> String {
        match &self.identity {
            Identity::Inline(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                format!("{}#key={:016x}", self, hasher.finish())
            }
            Identity::Default | Identity::File(_) => self.to_string(),
        }
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ssh://{}@{}:{}", self.username, self.hostname, self.port)?;
        let mut sep = '?';
        if self.protocol != Protocol::Tcp {
            write!(f, "{sep}protocol={}", self.protocol.as_str())?;
            sep = '&';
        }
        match &self.identity {
            Identity::File(path) => write!(f, "{sep}identity={}", path.display()),
            Identity::Inline(_) => write!(f, "{sep}identity=inline"),
            Identity::Default => Ok(()),
        }
    }
}

impl Connection {
    /// Registry key; connections differing only in defaulted fields share it
    pub fn normalized_key(&self) -> Result<String> {
        match self {
            Self::Local => Ok("local".to_string()),
            Self::Ssh(params) => Ok(params.normalize()?.key()),
        }
    }
}
