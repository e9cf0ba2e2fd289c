//! Direct edits of the shared resolver file, the Linux last resort.
//!
//! Every write is preceded by the [`SafetyGate`] and a byte-identical backup
//! at the canonical sibling path, which is also where restore looks.

use std::path::{Path, PathBuf};

use super::{DnsMethod, Host, Reading, Scope};
use crate::config::backup_path_for;
use crate::error::{DnsError, Result};
use crate::gate::SafetyGate;
use crate::ip::is_valid_ipv4;
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

const HEADER: &str = "# DNS configuration written by host-dns (manual override)";

/// Directives carried over from the current file into the new one.
const KEPT_DIRECTIVES: &[&str] = &["search", "domain", "options", "sortlist"];

/// The attachment point is the resolver file path itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvConf;

impl DnsMethod for ResolvConf {
    fn tag(&self) -> MethodTag {
        MethodTag::ResolvConf
    }

    fn tool(&self) -> &'static str {
        "resolv.conf"
    }

    fn scope(&self) -> Scope {
        Scope::HostWide
    }

    fn is_available(&self, host: &Host<'_>) -> bool {
        std::fs::symlink_metadata(&host.settings.resolv_conf).is_ok()
    }

    fn attachment_points(&self, host: &Host<'_>) -> Result<Vec<String>> {
        Ok(vec![host.settings.resolv_conf.to_string_lossy().into_owned()])
    }

    fn read(&self, _host: &Host<'_>, point: &str) -> Result<Option<Reading>> {
        let path = Path::new(point);
        SafetyGate::new().check(path)?;
        let servers = parse_nameservers(&std::fs::read_to_string(path)?);
        Ok((!servers.is_empty()).then(|| Reading::new(servers, DhcpMode::Static)))
    }

    fn apply(&self, _host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()> {
        let path = Path::new(point);
        SafetyGate::new().check(path)?;

        let current = std::fs::read_to_string(path)?;
        let backup = backup_path_for(path);
        if backup.exists() {
            tracing::info!(
                backup = %backup.display(),
                "Keeping existing backup of the original resolver file"
            );
        } else {
            std::fs::copy(path, &backup)?;
            tracing::info!(path = %path.display(), backup = %backup.display(), "Backed up resolver file");
        }

        // A link the gate let through stays a link; its target is rewritten.
        let target = live_target(path)?;
        let mut tmp = target.as_os_str().to_os_string();
        tmp.push(".host-dns.tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, render(&current, servers))?;
        std::fs::rename(&tmp, &target)?;

        tracing::warn!(
            path = %path.display(),
            "Wrote resolver file directly; other network tooling may replace it later"
        );
        Ok(())
    }

    fn restore(&self, _host: &Host<'_>, point: &str, _entry: &AttachmentSnapshot) -> Result<()> {
        let path = Path::new(point);
        let backup = backup_path_for(path);
        if !backup.exists() {
            return Err(DnsError::BackupMissing { path: backup });
        }
        let target = live_target(path)?;
        if target.as_path() == path {
            std::fs::rename(&backup, path)?;
        } else {
            // The target may live on another filesystem than the backup.
            std::fs::copy(&backup, &target)?;
            std::fs::remove_file(&backup)?;
        }
        tracing::info!(path = %path.display(), target = %target.display(), "Restored resolver file from backup");
        Ok(())
    }
}

/// The file actually holding the content: `path` itself, or the resolved
/// target when `path` is a symlink.
fn live_target(path: &Path) -> Result<PathBuf> {
    if std::fs::symlink_metadata(path)?.file_type().is_symlink() {
        Ok(std::fs::canonicalize(path)?)
    } else {
        Ok(path.to_path_buf())
    }
}

/// `nameserver` addresses in file order.
fn parse_nameservers(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            (words.next() == Some("nameserver")).then(|| words.next()).flatten()
        })
        .filter(|s| is_valid_ipv4(s))
        .map(String::from)
        .collect()
}

/// New file content: header, the servers in order, then the kept directives
/// of the current file.
fn render(current: &str, servers: &ServerList) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for server in servers.iter() {
        out.push_str("nameserver ");
        out.push_str(server);
        out.push('\n');
    }
    for line in current.lines() {
        let keyword = line.split_whitespace().next().unwrap_or_default();
        if KEPT_DIRECTIVES.contains(&keyword) {
            out.push_str(line.trim());
            out.push('\n');
        }
    }
    out
}
