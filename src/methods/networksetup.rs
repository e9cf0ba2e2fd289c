//! macOS network services via `networksetup`.

use super::{DnsMethod, Host, Reading};
use crate::error::{DnsError, Result};
use crate::ip::is_valid_ipv4;
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

const TOOL: &str = "networksetup";

/// Argument that clears a service's DNS list back to DHCP.
const EMPTY: &str = "empty";

/// `networksetup` is part of the base system; it is never probed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkSetup;

impl DnsMethod for NetworkSetup {
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
        let out = host.run(TOOL, &["-listallnetworkservices"])?;
        Ok(parse_services(&out.stdout))
    }

    fn read(&self, host: &Host<'_>, point: &str) -> Result<Option<Reading>> {
        let out = host.run(TOOL, &["-getdnsservers", point])?;
        Ok(Some(parse_dns_servers(&out.stdout)))
    }

    fn apply(&self, host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()> {
        set_servers(host, point, servers.iter())
    }

    fn restore(&self, host: &Host<'_>, point: &str, entry: &AttachmentSnapshot) -> Result<()> {
        match entry.dhcp {
            DhcpMode::Automatic | DhcpMode::Unknown => set_servers(host, point, [EMPTY]),
            DhcpMode::Static if entry.servers.is_empty() => Err(DnsError::NotRestorable {
                point: point.to_string(),
                reason: "static entry without servers".to_string(),
            }),
            DhcpMode::Static => set_servers(host, point, entry.servers.iter().map(String::as_str)),
        }
    }
}

/// The whole list goes in one call, in order.
fn set_servers<'s>(host: &Host<'_>, service: &'s str, servers: impl IntoIterator<Item = &'s str>) -> Result<()> {
    let mut args = vec!["-setdnsservers", service];
    args.extend(servers);
    host.run(TOOL, &args)?;
    Ok(())
}

/// Enabled service names.
///
/// ```text
/// An asterisk (*) denotes that a network service is disabled.
/// Wi-Fi
/// *Bluetooth PAN
/// Thunderbolt Bridge
/// ```
fn parse_services(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("An asterisk") && !l.starts_with('*'))
        .map(String::from)
        .collect()
}

/// Counts the addresses listed; none means the service takes DNS from DHCP.
///
/// The "There aren't any DNS Servers set on Wi-Fi." message is simply a line
/// without an address, so no text matching is needed.
fn parse_dns_servers(output: &str) -> Reading {
    let servers: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|l| is_valid_ipv4(l))
        .map(String::from)
        .collect();
    if servers.is_empty() {
        Reading::new(servers, DhcpMode::Automatic)
    } else {
        Reading::new(servers, DhcpMode::Static)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::command::fake::ScriptedRunner;
    use crate::config::Settings;

    #[test]
    fn lists_enabled_services() {
        let out = "An asterisk (*) denotes that a network service is disabled.\nWi-Fi\n*Bluetooth PAN\nUSB 10/100/1000 LAN\n\n";
        assert_eq!(parse_services(out), ["Wi-Fi", "USB 10/100/1000 LAN"]);
    }

    #[test]
    fn empty_list_in_any_language_is_dhcp() {
        let en = parse_dns_servers("There aren't any DNS Servers set on Wi-Fi.\n");
        let de = parse_dns_servers("Für Wi-Fi sind keine DNS-Server festgelegt.\n");
        assert_eq!(en, Reading::new(Vec::new(), DhcpMode::Automatic));
        assert_eq!(de, en);
    }

    #[test]
    fn static_list_keeps_order() {
        let r = parse_dns_servers("1.1.1.1\n8.8.8.8\n2606:4700::1111\n");
        assert_eq!(r.servers, ["1.1.1.1", "8.8.8.8"]);
        assert_eq!(r.dhcp, DhcpMode::Static);
    }

    #[test]
    fn apply_and_restore_commands() {
        let runner = ScriptedRunner::new()
            .on("networksetup -setdnsservers Wi-Fi 9.9.9.9 1.1.1.1", CommandOutput::ok(""))
            .on("networksetup -setdnsservers Wi-Fi empty", CommandOutput::ok(""))
            .on("networksetup -setdnsservers Wi-Fi 192.168.0.1", CommandOutput::ok(""));
        let settings = Settings::default();
        let host = Host::new(&runner, &settings);

        let servers = ServerList::new(["9.9.9.9", "1.1.1.1"]).unwrap();
        NetworkSetup.apply(&host, "Wi-Fi", &servers).unwrap();
        NetworkSetup
            .restore(&host, "Wi-Fi", &AttachmentSnapshot::automatic(MethodTag::Native))
            .unwrap();
        NetworkSetup
            .restore(
                &host,
                "Wi-Fi",
                &AttachmentSnapshot::new(vec!["192.168.0.1".into()], DhcpMode::Static, MethodTag::Native),
            )
            .unwrap();
        assert_eq!(runner.calls().len(), 3);
    }
}
