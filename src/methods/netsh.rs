//! Windows interfaces via `netsh interface ipv4`.

use super::{DnsMethod, Host, Reading, ipv4_tokens};
use crate::error::{DnsError, Result};
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

const TOOL: &str = "netsh";

/// `netsh` ships with every Windows install; it is never probed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Netsh;

impl DnsMethod for Netsh {
    fn tag(&self) -> MethodTag {
        MethodTag::Native
    }

    fn tool(&self) -> &'static str {
        TOOL
    }

    fn is_available(&self, _host: &Host<'_>) -> bool {
        true
    }

    fn attachment_points(&self, host: &Host<'_>) -> Result<Vec<String>> {
        let out = host.run(TOOL, &["interface", "show", "interface"])?;
        Ok(parse_interfaces(&out.stdout))
    }

    fn read(&self, host: &Host<'_>, point: &str) -> Result<Option<Reading>> {
        let name = format!("name={point}");
        let out = host.run(TOOL, &["interface", "ipv4", "show", "dnsservers", &name])?;
        Ok(parse_dns_servers(&out.stdout))
    }

    fn apply(&self, host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()> {
        set_static(host, point, servers.as_slice())
    }

    fn restore(&self, host: &Host<'_>, point: &str, entry: &AttachmentSnapshot) -> Result<()> {
        match entry.dhcp {
            DhcpMode::Automatic | DhcpMode::Unknown => {
                let name = format!("name={point}");
                host.run(
                    TOOL,
                    &["interface", "ipv4", "set", "dnsservers", &name, "source=dhcp"],
                )?;
                Ok(())
            }
            DhcpMode::Static if entry.servers.is_empty() => Err(DnsError::NotRestorable {
                point: point.to_string(),
                reason: "static entry without servers".to_string(),
            }),
            DhcpMode::Static => set_static(host, point, &entry.servers),
        }
    }
}

/// One `set` for the primary, then index-addressed `add`s in list order.
fn set_static(host: &Host<'_>, point: &str, servers: &[String]) -> Result<()> {
    let Some((primary, rest)) = servers.split_first() else {
        return Err(DnsError::InvalidConfig("empty server list".to_string()));
    };
    let name = format!("name={point}");
    let addr = format!("addr={primary}");
    host.run(
        TOOL,
        &["interface", "ipv4", "set", "dnsserver", &name, "static", &addr, "validate=no"],
    )?;
    tracing::debug!(point = %point, server = %primary, "Set primary DNS server");

    for (i, server) in rest.iter().enumerate() {
        let addr = format!("addr={server}");
        let index = format!("index={}", i + 2);
        host.run(
            TOOL,
            &["interface", "ipv4", "add", "dnsserver", &name, &addr, &index, "validate=no"],
        )?;
        tracing::debug!(point = %point, server = %server, index = i + 2, "Added DNS server");
    }
    Ok(())
}

/// Names of interfaces that are `Enabled` and `Connected`.
///
/// ```text
/// Admin State    State          Type             Interface Name
/// -------------------------------------------------------------------------
/// Enabled        Connected      Dedicated        Ethernet
/// Enabled        Disconnected   Dedicated        Wi-Fi
/// ```
fn parse_interfaces(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 4 && parts[0] == "Enabled" && parts[1] == "Connected" {
                Some(parts[3..].join(" "))
            } else {
                None
            }
        })
        .collect()
}

/// Reads the DNS server block of `show dnsservers`.
///
/// ```text
/// Configuration for interface "Ethernet"
///     Statically Configured DNS Servers:    8.8.8.8
///                                           8.8.4.4
///     Register with which suffix:           Primary only
/// ```
///
/// A DHCP block yields an automatic reading with whatever servers DHCP
/// supplied; a static block with no servers yields `None`.
fn parse_dns_servers(output: &str) -> Option<Reading> {
    let mut servers = Vec::new();
    let mut dhcp = false;
    let mut in_block = false;

    for line in output.lines() {
        if let Some((label, value)) = line.split_once(':') {
            let label = label.to_ascii_lowercase();
            in_block = label.contains("dns servers");
            if in_block {
                dhcp |= label.contains("dhcp");
                servers.extend(ipv4_tokens(value).map(String::from));
            }
        } else if in_block {
            servers.extend(ipv4_tokens(line).map(String::from));
        }
    }

    if dhcp {
        Some(Reading::new(servers, DhcpMode::Automatic))
    } else if servers.is_empty() {
        None
    } else {
        Some(Reading::new(servers, DhcpMode::Static))
    }
}
