//! NetworkManager devices via `nmcli`.

use super::{DnsMethod, Host, Reading, ipv4_tokens};
use crate::error::{DnsError, Result};
use crate::ip::is_valid_ipv4;
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

const TOOL: &str = "nmcli";

#[derive(Debug, Clone, Copy, Default)]
pub struct Nmcli;

impl DnsMethod for Nmcli {
    fn tag(&self) -> MethodTag {
        MethodTag::NetworkManager
    }

    fn tool(&self) -> &'static str {
        TOOL
    }

    fn is_available(&self, host: &Host<'_>) -> bool {
        host.prober().is_available(TOOL)
    }

    fn attachment_points(&self, host: &Host<'_>) -> Result<Vec<String>> {
        let out = host.run(TOOL, &["-t", "-f", "DEVICE,STATE", "dev"])?;
        Ok(parse_connected_devices(&out.stdout))
    }

    fn read(&self, host: &Host<'_>, point: &str) -> Result<Option<Reading>> {
        let out = host.run(TOOL, &["dev", "show", point])?;
        Ok(parse_device_show(&out.stdout))
    }

    fn apply(&self, host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()> {
        let list = servers.join(",");
        host.run(TOOL, &["dev", "mod", point, "ipv4.dns", &list])?;
        if let Err(e) = host.run(TOOL, &["dev", "mod", point, "ipv4.ignore-auto-dns", "yes"]) {
            tracing::warn!(point = %point, error = %e, "Could not disable automatic DNS");
        }
        host.run(TOOL, &["dev", "reapply", point])?;
        Ok(())
    }

    fn restore(&self, host: &Host<'_>, point: &str, entry: &AttachmentSnapshot) -> Result<()> {
        let (dns, ignore_auto) = match entry.dhcp {
            DhcpMode::Automatic | DhcpMode::Unknown => (String::new(), "no"),
            DhcpMode::Static if entry.servers.is_empty() => {
                return Err(DnsError::NotRestorable {
                    point: point.to_string(),
                    reason: "static entry without servers".to_string(),
                });
            }
            DhcpMode::Static => (entry.servers.join(","), "yes"),
        };
        host.run(TOOL, &["dev", "mod", point, "ipv4.dns", &dns])?;
        host.run(TOOL, &["dev", "mod", point, "ipv4.ignore-auto-dns", ignore_auto])?;
        host.run(TOOL, &["dev", "reapply", point])?;
        Ok(())
    }
}

/// Devices in state `connected` from terse `DEVICE,STATE` output.
///
/// Terse mode escapes `:` inside fields as `\:`.
fn parse_connected_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (device, state) = line.trim().rsplit_once(':')?;
            (state == "connected" && !device.is_empty()).then(|| device.replace("\\:", ":"))
        })
        .collect()
}

/// DNS state from `nmcli dev show <dev>`.
///
/// `IP4.DNS[n]` lists what the device is using; DHCP-supplied servers show
/// up as a `domain_name_servers` option. Servers present in `IP4.DNS` that
/// DHCP did not supply mean a static configuration.
fn parse_device_show(output: &str) -> Option<Reading> {
    let mut configured = Vec::new();
    let mut from_dhcp: Vec<String> = Vec::new();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key.starts_with("IP4.DNS[") {
            if is_valid_ipv4(value) {
                configured.push(value.to_string());
            }
        } else if key.starts_with("DHCP4.OPTION") {
            if let Some(servers) = value.strip_prefix("domain_name_servers") {
                let servers = servers.trim_start().trim_start_matches('=');
                from_dhcp.extend(ipv4_tokens(servers).map(String::from));
            }
        }
    }

    if !configured.is_empty() && configured.iter().any(|s| !from_dhcp.contains(s)) {
        Some(Reading::new(configured, DhcpMode::Static))
    } else if !from_dhcp.is_empty() {
        Some(Reading::new(from_dhcp, DhcpMode::Automatic))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::command::fake::ScriptedRunner;
    use crate::config::Settings;

    const DHCP_SHOW: &str = "GENERAL.DEVICE:                         eth0
GENERAL.STATE:                          100 (connected)
IP4.ADDRESS[1]:                         192.168.1.20/24
IP4.DNS[1]:                             192.168.1.1
DHCP4.OPTION[4]:                        domain_name_servers = 192.168.1.1
DHCP4.OPTION[5]:                        expiry = 1700000000
";

    #[test]
    fn connected_devices_only() {
        let out = "eth0:connected\nwlan0:disconnected\nlo:connected (externally)\nbr\\:0:connected\n";
        assert_eq!(parse_connected_devices(out), ["eth0", "br:0"]);
    }

    #[test]
    fn dhcp_supplied_dns_is_automatic() {
        assert_eq!(
            parse_device_show(DHCP_SHOW),
            Some(Reading::new(vec!["192.168.1.1".into()], DhcpMode::Automatic))
        );
    }

    #[test]
    fn manual_dns_is_static() {
        let out = "IP4.DNS[1]:  9.9.9.9\nIP4.DNS[2]:  1.1.1.1\nDHCP4.OPTION[4]: domain_name_servers = 192.168.1.1\n";
        assert_eq!(
            parse_device_show(out),
            Some(Reading::new(vec!["9.9.9.9".into(), "1.1.1.1".into()], DhcpMode::Static))
        );
    }

    #[test]
    fn nothing_found() {
        assert_eq!(parse_device_show("GENERAL.DEVICE: eth0\n"), None);
    }

    #[test]
    fn apply_tolerates_ignore_auto_failure() {
        let runner = ScriptedRunner::new()
            .installed(TOOL)
            .on("nmcli dev mod eth0 ipv4.dns 9.9.9.9,1.1.1.1", CommandOutput::ok(""))
            .on("nmcli dev reapply eth0", CommandOutput::ok(""));
        let settings = Settings::default();
        let host = Host::new(&runner, &settings);
        let servers = ServerList::new(["9.9.9.9", "1.1.1.1"]).unwrap();
        Nmcli.apply(&host, "eth0", &servers).unwrap();
        assert!(runner.called("nmcli dev mod eth0 ipv4.ignore-auto-dns yes"));
    }

    #[test]
    fn restore_automatic_clears_and_reapplies() {
        let runner = ScriptedRunner::new()
            .on("nmcli dev mod eth0 ipv4.dns ", CommandOutput::ok(""))
            .on("nmcli dev mod eth0 ipv4.ignore-auto-dns no", CommandOutput::ok(""))
            .on("nmcli dev reapply eth0", CommandOutput::ok(""));
        let settings = Settings::default();
        let host = Host::new(&runner, &settings);
        let entry = AttachmentSnapshot::new(
            vec!["192.168.1.1".into()],
            DhcpMode::Automatic,
            MethodTag::NetworkManager,
        );
        Nmcli.restore(&host, "eth0", &entry).unwrap();
        assert_eq!(runner.calls().last().map(String::as_str), Some("nmcli dev reapply eth0"));
    }
}
