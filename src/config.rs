//! Runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default snapshot document, relative to the working directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "original_dns_config.json";

/// Default shared resolver configuration file.
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Suffix appended to the resolver file name to form its backup.
pub const BACKUP_SUFFIX: &str = ".host-dns.bak";

/// Paths, timeouts and probe parameters used by every operation.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use host_dns::Settings;
///
/// let settings = Settings::default()
///     .with_resolv_conf("/tmp/resolv.conf")
///     .with_command_timeout(None);
///
/// assert_eq!(settings.backup_path().to_str(), Some("/tmp/resolv.conf.host-dns.bak"));
/// assert_eq!(settings.probe_timeout, Duration::from_secs(2));
/// assert!(settings.command_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where the snapshot document is saved and loaded.
    pub snapshot_path: PathBuf,

    /// The shared resolver file edited as a last resort on Linux.
    pub resolv_conf: PathBuf,

    /// Budget for capability probes (`--version` / `--help`).
    pub probe_timeout: Duration,

    /// Budget for mutation, restore and listing commands. `None` waits forever.
    pub command_timeout: Option<Duration>,

    /// External address whose route selects the default interface.
    pub route_probe_addr: String,

    /// Directory holding SysV init scripts used for cache-daemon restarts.
    pub init_dir: PathBuf,
}

impl Settings {
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    #[must_use]
    pub fn with_resolv_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolv_conf = path.into();
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_route_probe_addr(mut self, addr: impl Into<String>) -> Self {
        self.route_probe_addr = addr.into();
        self
    }

    #[must_use]
    pub fn with_init_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.init_dir = dir.into();
        self
    }

    /// Canonical backup location for the resolver file.
    ///
    /// Capture and restore both use this path.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        backup_path_for(&self.resolv_conf)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
            probe_timeout: Duration::from_secs(2),
            command_timeout: Some(Duration::from_secs(60)),
            route_probe_addr: "1.1.1.1".to_string(),
            init_dir: PathBuf::from("/etc/init.d"),
        }
    }
}

/// Backup location for the resolver file at `path`: a sibling with
/// [`BACKUP_SUFFIX`] appended.
#[must_use]
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
