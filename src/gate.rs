//! Pre-flight checks before editing the shared resolver file directly.
//!
//! A resolver file owned by NetworkManager, systemd-resolved or resolvconf is
//! regenerated on the owner's next cycle, so editing it silently does
//! nothing useful. The gate refuses such edits.

use std::io::Read;
use std::path::Path;

use crate::error::{DnsError, Result};

/// Symlink target fragments of daemon-generated resolver files.
const MANAGED_LINK_TARGETS: &[&str] = &[
    "systemd/resolve/stub-resolv.conf",
    "systemd/resolve/resolv.conf",
    "NetworkManager/resolv.conf",
    "run/resolvconf/resolv.conf",
];

/// Header markers written by resolver-managing daemons.
const GENERATOR_MARKERS: &[&str] = &[
    "# Generated by NetworkManager",
    "# Generated by resolvconf",
    "# Generated by systemd-resolved",
    "# This file is managed by man:systemd-resolved(8)",
    "generated by resolvconf(8)",
    "DO NOT EDIT THIS FILE BY HAND",
];

/// Only the head of the file is inspected for markers.
const HEADER_LEN: u64 = 1024;

/// Veto for direct resolver-file edits.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    link_targets: Vec<String>,
    markers: Vec<String>,
}

impl SafetyGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            link_targets: MANAGED_LINK_TARGETS.iter().map(ToString::to_string).collect(),
            markers: GENERATOR_MARKERS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Checks `path`, short-circuiting on the first failure:
    ///
    /// 1. a symlink whose target matches a daemon-managed path is refused;
    /// 2. a file whose head carries a generator marker is refused.
    ///
    /// # Errors
    ///
    /// [`DnsError::SafetyRefusal`] on a veto, [`DnsError::Io`] if the file
    /// cannot be inspected (including when it does not exist).
    pub fn check(&self, path: &Path) -> Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(path)?;
            let target = target.to_string_lossy();
            if let Some(hit) = self.link_targets.iter().find(|t| target.contains(t.as_str())) {
                tracing::warn!(
                    path = %path.display(),
                    target = %target,
                    "Resolver file is a symlink to a managed location"
                );
                return Err(DnsError::SafetyRefusal {
                    path: path.to_path_buf(),
                    reason: format!("managed by another service (symlink to {hit})"),
                });
            }
        }

        let mut bytes = Vec::new();
        std::fs::File::open(path)?
            .take(HEADER_LEN)
            .read_to_end(&mut bytes)?;
        let head = String::from_utf8_lossy(&bytes);

        if let Some(marker) = self.markers.iter().find(|m| head.contains(m.as_str())) {
            tracing::warn!(path = %path.display(), marker = %marker, "Resolver file is auto-generated");
            return Err(DnsError::SafetyRefusal {
                path: path.to_path_buf(),
                reason: format!("managed by another service (found {marker:?})"),
            });
        }
        Ok(())
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new()
    }
}
