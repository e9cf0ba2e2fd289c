//! Host operating system identification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating systems with a DNS method table.
///
/// Serialized lowercase; used as the top-level key of a snapshot document so
/// a snapshot taken on one OS is never replayed on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    #[serde(rename = "macos")]
    MacOs,
}

impl Platform {
    /// The platform this binary was compiled for, if supported.
    #[must_use]
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Self::MacOs)
        } else {
            None
        }
    }

    /// Maps a kernel/system name (`Linux`, `Darwin`, `Windows_NT`, `Win32NT`)
    /// to a platform. Matching is case-insensitive and by substring.
    #[must_use]
    pub fn from_system_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.contains("windows") || name.starts_with("win32") {
            Some(Self::Windows)
        } else if name.contains("linux") {
            Some(Self::Linux)
        } else if name.contains("darwin") || name.contains("macos") {
            Some(Self::MacOs)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_names() {
        assert_eq!(Platform::from_system_name("Windows"), Some(Platform::Windows));
        assert_eq!(Platform::from_system_name("Win32NT"), Some(Platform::Windows));
        assert_eq!(Platform::from_system_name("Linux"), Some(Platform::Linux));
        assert_eq!(Platform::from_system_name("Darwin"), Some(Platform::MacOs));
        assert_eq!(Platform::from_system_name("SunOS"), None);
        assert_eq!(Platform::from_system_name("FreeBSD"), None);
    }

    #[test]
    fn current_matches_target() {
        #[cfg(target_os = "linux")]
        assert_eq!(Platform::current(), Some(Platform::Linux));
        #[cfg(target_os = "macos")]
        assert_eq!(Platform::current(), Some(Platform::MacOs));
        #[cfg(target_os = "windows")]
        assert_eq!(Platform::current(), Some(Platform::Windows));
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Platform::MacOs).unwrap(), "\"macos\"");
        assert_eq!(
            serde_json::from_str::<Platform>("\"linux\"").unwrap(),
            Platform::Linux
        );
    }
}
