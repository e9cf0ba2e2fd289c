//! Ordered DNS server lists and the `Name=IP` loader.

use std::fmt;
use std::path::Path;

use crate::error::{DnsError, Result};
use crate::ip::is_valid_ipv4;

/// Maximum number of servers applied (primary, secondary, tertiary).
pub const MAX_SERVERS: usize = 3;

/// Ordered list of at most three validated IPv4 server addresses.
///
/// Order is significant and duplicates are kept. An empty list is a valid
/// value ("back to automatic") but is rejected by mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerList(Vec<String>);

impl ServerList {
    /// Builds a list from already-separated addresses.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::InvalidAddress`] for the first invalid entry and
    /// [`DnsError::InvalidConfig`] if more than three are given.
    pub fn new<I, S>(servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Vec::new();
        for server in servers {
            let server = server.into();
            if !is_valid_ipv4(&server) {
                return Err(DnsError::InvalidAddress(server));
            }
            list.push(server);
        }
        if list.len() > MAX_SERVERS {
            return Err(DnsError::InvalidConfig(format!(
                "{} servers given, at most {MAX_SERVERS} allowed",
                list.len()
            )));
        }
        Ok(Self(list))
    }

    /// The empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Addresses joined with `sep`, in order.
    #[must_use]
    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

impl fmt::Display for ServerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Parses `Name=IP` lines into a server list.
///
/// Blank lines and `#` comments are skipped. Lines without `=` and entries
/// that are not valid IPv4 addresses are skipped with a warning. Only the
/// first three valid entries are kept.
///
/// # Errors
///
/// Returns [`DnsError::InvalidConfig`] if no valid entry remains.
pub fn parse_server_list(content: &str) -> Result<ServerList> {
    let mut servers = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((_, value)) = line.split_once('=') else {
            tracing::warn!(line = %line, "Skipping malformed config line (missing '=')");
            continue;
        };
        let value = value.trim();
        if !is_valid_ipv4(value) {
            tracing::warn!(value = %value, "Skipping invalid IPv4 address in config");
            continue;
        }
        servers.push(value.to_string());
        if servers.len() == MAX_SERVERS {
            break;
        }
    }

    if servers.is_empty() {
        return Err(DnsError::InvalidConfig(
            "no valid DNS server addresses found".to_string(),
        ));
    }
    Ok(ServerList(servers))
}

/// Reads and parses a `Name=IP` file.
///
/// # Errors
///
/// Returns [`DnsError::InvalidConfig`] if the file is missing, empty or holds
/// no valid entry, and [`DnsError::Io`] for other read failures.
pub fn load_server_list(path: impl AsRef<Path>) -> Result<ServerList> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DnsError::InvalidConfig(format!(
                "config file {} not found",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Err(DnsError::InvalidConfig(format!(
            "config file {} is empty",
            path.display()
        )));
    }
    let servers = parse_server_list(&content)?;
    tracing::debug!(path = %path.display(), servers = %servers, "Loaded DNS server list");
    Ok(servers)
}
