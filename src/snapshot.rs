//! The "original DNS state" data model and its on-disk document.
//!
//! ```text
//! {
//!   "linux": {
//!     "eth0": { "servers": ["192.168.1.1"], "dhcp": true, "method": "nmcli" },
//!     "wlan0": { "servers": ["9.9.9.9"], "dhcp": "unknown", "method": "resolvectl" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DnsError, Result};
use crate::platform::Platform;

/// Which subsystem read (and must write back) an attachment point's DNS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MethodTag {
    /// `netsh` on Windows, `networksetup` on macOS.
    #[serde(
        rename = "native",
        alias = "netsh",
        alias = "networksetup",
        alias = "netsh_unknown_fallback_to_dhcp"
    )]
    Native,
    /// NetworkManager via `nmcli`.
    #[serde(rename = "nmcli", alias = "nmcli_unknown_fallback_to_dhcp")]
    NetworkManager,
    /// systemd-resolved via `resolvectl`.
    #[serde(rename = "resolvectl")]
    SystemdResolved,
    /// Direct edit of the shared resolver file.
    #[serde(rename = "resolv.conf")]
    ResolvConf,
    /// Anything unrecognised; cannot be restored.
    #[default]
    #[serde(rename = "unknown")]
    #[serde(other)]
    Unknown,
}

impl MethodTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::NetworkManager => "nmcli",
            Self::SystemdResolved => "resolvectl",
            Self::ResolvConf => "resolv.conf",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a point's DNS came from DHCP.
///
/// Stored as `true`/`false`, or as a marker string for methods that cannot
/// tell and revert through their own tool instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DhcpMode {
    Static,
    #[default]
    Automatic,
    /// Unknown; restore through the recording tool's revert operation.
    Unknown,
}

const UNKNOWN_DHCP_MARKER: &str = "unknown";

impl DhcpMode {
    #[must_use]
    pub const fn is_automatic(self) -> bool {
        matches!(self, Self::Automatic)
    }
}

impl Serialize for DhcpMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Static => serializer.serialize_bool(false),
            Self::Automatic => serializer.serialize_bool(true),
            Self::Unknown => serializer.serialize_str(UNKNOWN_DHCP_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for DhcpMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Marker(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Self::Automatic,
            Raw::Flag(false) => Self::Static,
            Raw::Marker(_) => Self::Unknown,
        })
    }
}

/// Captured DNS state of one attachment point.
///
/// With `dhcp` automatic, `servers` may still list the DHCP-supplied values;
/// they are informational and never reapplied as static.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachmentSnapshot {
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub dhcp: DhcpMode,
    #[serde(default)]
    pub method: MethodTag,
}

impl AttachmentSnapshot {
    #[must_use]
    pub const fn new(servers: Vec<String>, dhcp: DhcpMode, method: MethodTag) -> Self {
        Self {
            servers,
            dhcp,
            method,
        }
    }

    /// Placeholder for a point whose DNS state could not be discovered.
    /// Restoring it means "back to automatic".
    #[must_use]
    pub const fn automatic(method: MethodTag) -> Self {
        Self::new(Vec::new(), DhcpMode::Automatic, method)
    }
}

/// Attachment point identifier to captured state.
pub type PlatformSnapshot = BTreeMap<String, AttachmentSnapshot>;

/// Captured state for a host, keyed by platform then attachment point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostSnapshot {
    platforms: BTreeMap<Platform, PlatformSnapshot>,
}

impl HostSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps one platform's entries.
    #[must_use]
    pub fn for_host(platform: Platform, points: PlatformSnapshot) -> Self {
        let mut platforms = BTreeMap::new();
        platforms.insert(platform, points);
        Self { platforms }
    }

    pub fn insert(&mut self, platform: Platform, point: impl Into<String>, entry: AttachmentSnapshot) {
        self.platforms
            .entry(platform)
            .or_default()
            .insert(point.into(), entry);
    }

    #[must_use]
    pub fn platform(&self, platform: Platform) -> Option<&PlatformSnapshot> {
        self.platforms.get(&platform)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platforms.values().all(BTreeMap::is_empty)
    }

    /// Total number of attachment points across platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.platforms.values().map(BTreeMap::len).sum()
    }
}

/// Wholesale persistence of a [`HostSnapshot`] as pretty JSON.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the whole document, replacing any previous one.
    ///
    /// The document is written to a sibling temp file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Json`] or [`DnsError::Io`].
    pub fn save(&self, snapshot: &HostSnapshot) -> Result<()> {
        let mut json = serde_json::to_string_pretty(snapshot)?;
        json.push('\n');

        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            points = snapshot.len(),
            "Saved original DNS settings"
        );
        Ok(())
    }

    /// Reads the whole document.
    ///
    /// # Errors
    ///
    /// [`DnsError::SnapshotUnavailable`] if the file does not exist,
    /// [`DnsError::Json`] if it cannot be parsed, [`DnsError::Io`] otherwise.
    pub fn load(&self) -> Result<HostSnapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DnsError::SnapshotUnavailable(format!(
                    "{} not found",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), "Loaded original DNS settings");
        Ok(snapshot)
    }

    /// Deletes the document. A missing file is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed original DNS settings file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> HostSnapshot {
        let mut s = HostSnapshot::new();
        s.insert(
            Platform::Linux,
            "eth0",
            AttachmentSnapshot::new(
                vec!["192.168.1.1".into()],
                DhcpMode::Automatic,
                MethodTag::NetworkManager,
            ),
        );
        s.insert(
            Platform::Linux,
            "wlan0",
            AttachmentSnapshot::new(
                vec!["9.9.9.9".into(), "1.1.1.1".into()],
                DhcpMode::Unknown,
                MethodTag::SystemdResolved,
            ),
        );
        s.insert(
            Platform::Linux,
            "/etc/resolv.conf",
            AttachmentSnapshot::new(vec!["8.8.8.8".into()], DhcpMode::Static, MethodTag::ResolvConf),
        );
        s.insert(Platform::Linux, "tun0", AttachmentSnapshot::automatic(MethodTag::Unknown));
        s
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("original_dns_config.json"));
        let snapshot = mixed();

        store.save(&snapshot).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), snapshot);

        store.remove().unwrap();
        assert!(!store.exists());
        store.remove().unwrap();
    }

    #[test]
    fn document_shape() {
        let json = serde_json::to_value(mixed()).unwrap();
        let eth0 = &json["linux"]["eth0"];
        assert_eq!(eth0["dhcp"], true);
        assert_eq!(eth0["method"], "nmcli");
        assert_eq!(json["linux"]["wlan0"]["dhcp"], "unknown");
        assert_eq!(json["linux"]["/etc/resolv.conf"]["dhcp"], false);
        assert_eq!(json["linux"]["/etc/resolv.conf"]["method"], "resolv.conf");
    }

    #[test]
    fn legacy_method_names_load() {
        let json = r#"{
            "windows": {
                "Ethernet": {"servers": ["8.8.8.8"], "dhcp": false, "method": "netsh"},
                "Wi-Fi": {"servers": [], "dhcp": true, "method": "netsh_unknown_fallback_to_dhcp"}
            },
            "linux": {
                "eth0": {"servers": [], "dhcp": "unknown_revert_to_resolvectl", "method": "resolvectl"},
                "eth1": {"servers": [], "dhcp": true, "method": "carrier-pigeon"},
                "eth2": {"servers": []}
            }
        }"#;
        let s: HostSnapshot = serde_json::from_str(json).unwrap();
        let win = s.platform(Platform::Windows).unwrap();
        assert_eq!(win["Ethernet"].method, MethodTag::Native);
        assert_eq!(win["Wi-Fi"].method, MethodTag::Native);
        let linux = s.platform(Platform::Linux).unwrap();
        assert_eq!(linux["eth0"].dhcp, DhcpMode::Unknown);
        assert_eq!(linux["eth1"].method, MethodTag::Unknown);
        assert_eq!(linux["eth2"].method, MethodTag::Unknown);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("none.json"));
        assert!(matches!(store.load(), Err(DnsError::SnapshotUnavailable(_))));
    }

    #[test]
    fn corrupt_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SnapshotStore::new(path).load(), Err(DnsError::Json(_))));
    }
}
