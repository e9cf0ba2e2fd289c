//! systemd-resolved links via `resolvectl`.
//!
//! Only the interface carrying the default route is configured; it is found
//! by asking the kernel which device reaches an external probe address.

use super::{DnsMethod, Host, Reading, ipv4_tokens};
use crate::error::{DnsError, Result};
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

const TOOL: &str = "resolvectl";

#[derive(Debug, Clone, Copy, Default)]
pub struct Resolvectl;

impl DnsMethod for Resolvectl {
    fn tag(&self) -> MethodTag {
        MethodTag::SystemdResolved
    }

    fn tool(&self) -> &'static str {
        TOOL
    }

    fn is_available(&self, host: &Host<'_>) -> bool {
        host.prober().is_available(TOOL)
    }

    fn attachment_points(&self, host: &Host<'_>) -> Result<Vec<String>> {
        Ok(vec![default_interface(host)?])
    }

    fn read(&self, host: &Host<'_>, point: &str) -> Result<Option<Reading>> {
        let out = host.run(TOOL, &["status", point])?;
        let servers = parse_status(&out.stdout);
        // resolved cannot say where its servers came from; `revert` handles both.
        Ok((!servers.is_empty()).then(|| Reading::new(servers, DhcpMode::Unknown)))
    }

    fn apply(&self, host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()> {
        let mut args = vec!["dns", point];
        args.extend(servers.iter());
        host.run(TOOL, &args)?;
        Ok(())
    }

    fn restore(&self, host: &Host<'_>, point: &str, _entry: &AttachmentSnapshot) -> Result<()> {
        host.run(TOOL, &["revert", point])?;
        Ok(())
    }
}

/// Device of the route to the configured probe address.
///
/// # Errors
///
/// Fails if `ip` cannot run or prints no `dev` token.
pub fn default_interface(host: &Host<'_>) -> Result<String> {
    let addr = host.settings.route_probe_addr.as_str();
    let out = host.run_with("ip", &["route", "get", addr], Some(host.settings.probe_timeout))?;
    parse_route_dev(&out.stdout).ok_or_else(|| DnsError::parse("ip", "no `dev` in route output"))
}

/// `1.1.1.1 via 192.168.0.1 dev eth0 src 192.168.0.100 uid 1000` -> `eth0`.
fn parse_route_dev(output: &str) -> Option<String> {
    let mut words = output.split_whitespace();
    while let Some(word) = words.next() {
        if word == "dev" {
            return words.next().map(String::from);
        }
    }
    None
}

/// Servers under `Current DNS Server:` and `DNS Servers:`, including
/// continuation lines, deduplicated in order of appearance.
fn parse_status(output: &str) -> Vec<String> {
    let mut servers: Vec<String> = Vec::new();
    let mut in_block = false;

    for line in output.lines() {
        let (label, rest) = match line.split_once(':') {
            // IPv6 continuation lines also contain ':'; labels are not hex.
            Some((label, rest)) if label.trim().chars().any(|c| !c.is_ascii_hexdigit()) => {
                (Some(label.trim()), rest)
            }
            _ => (None, line),
        };
        if let Some(label) = label {
            in_block = matches!(label, "DNS Servers" | "Current DNS Server");
        }
        if in_block {
            for server in ipv4_tokens(rest) {
                if !servers.iter().any(|s| s == server) {
                    servers.push(server.to_string());
                }
            }
        }
    }
    servers
}
