//! Integration tests for `host-dns`.
//!
//! System tools are replaced by a scripted runner; resolver files live in
//! temp directories. Tests marked `#[ignore]` touch the live host:
//!
//! ```bash
//! sudo cargo test -- --ignored
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use host_dns::{
    CommandOutput, CommandRunner, DhcpMode, DnsError, DnsManager, MethodTag, Platform, Settings,
    SnapshotStore, SystemRunner, flow, servers,
};

/// Answers commands from a table keyed by the full command line and records
/// every call. Anything unscripted is reported as a missing tool.
#[derive(Default)]
struct Script {
    replies: HashMap<String, CommandOutput>,
    calls: RefCell<Vec<String>>,
}

impl Script {
    fn on(mut self, cmdline: &str, stdout: &str) -> Self {
        self.replies.insert(cmdline.to_string(), CommandOutput::ok(stdout));
        self
    }

    fn called(&self, cmdline: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == cmdline)
    }
}

impl CommandRunner for Script {
    fn run(&self, program: &str, args: &[&str], _: Option<Duration>) -> host_dns::Result<CommandOutput> {
        let line = std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
        self.calls.borrow_mut().push(line.clone());
        self.replies.get(&line).cloned().ok_or_else(|| DnsError::ToolAbsent {
            tool: program.to_string(),
        })
    }
}

fn settings_in(dir: &tempfile::TempDir) -> Settings {
    Settings::default()
        .with_snapshot_path(dir.path().join("original_dns_config.json"))
        .with_resolv_conf(dir.path().join("resolv.conf"))
        .with_init_dir(dir.path().join("init.d"))
}

// ---------------------------------------------------------------------------
// Scripted tests (no root required)
// ---------------------------------------------------------------------------

#[test]
fn networkmanager_set_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);
    let store = SnapshotStore::new(&settings.snapshot_path);
    let script = Script::default()
        .on("nmcli --version", "nmcli tool, version 1.46.0")
        .on("nmcli -t -f DEVICE,STATE dev", "eth0:connected\nlo:connected (externally)\n")
        .on(
            "nmcli dev show eth0",
            "IP4.DNS[1]: 192.168.1.1\nDHCP4.OPTION[7]: domain_name_servers = 192.168.1.1\n",
        )
        .on("nmcli dev mod eth0 ipv4.dns 9.9.9.9,149.112.112.112", "")
        .on("nmcli dev mod eth0 ipv4.ignore-auto-dns yes", "")
        .on("nmcli dev mod eth0 ipv4.dns ", "")
        .on("nmcli dev mod eth0 ipv4.ignore-auto-dns no", "")
        .on("nmcli dev reapply eth0", "");
    let manager = DnsManager::with_runner(Platform::Linux, script, settings);

    let list = servers::parse_server_list("Quad9=9.9.9.9\nQuad9b=149.112.112.112\n").unwrap();
    let outcome = flow::run_set(&manager, &store, &list).unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.report.applied.len(), 1);
    assert_eq!(outcome.report.applied[0].method, MethodTag::NetworkManager);

    let saved = store.load().unwrap();
    let eth0 = &saved.platform(Platform::Linux).unwrap()["eth0"];
    assert_eq!(eth0.dhcp, DhcpMode::Automatic);
    assert_eq!(eth0.method, MethodTag::NetworkManager);

    let outcome = flow::run_restore(&manager, &store).unwrap();
    assert!(outcome.report.is_complete());
    assert!(!store.exists());
    assert!(manager.runner().called("nmcli dev mod eth0 ipv4.ignore-auto-dns no"));
}

#[test]
fn resolv_conf_cycle_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);
    let original = "# hand written\nnameserver 192.168.1.1\nsearch home.arpa\n";
    std::fs::write(&settings.resolv_conf, original).unwrap();
    let store = SnapshotStore::new(&settings.snapshot_path);
    let manager = DnsManager::with_runner(Platform::Linux, Script::default(), settings.clone());

    let list = servers::parse_server_list("A=1.1.1.1\nB=8.8.8.8\n").unwrap();
    let outcome = flow::run_set(&manager, &store, &list).unwrap();
    assert!(outcome.is_success());

    let written = std::fs::read_to_string(&settings.resolv_conf).unwrap();
    assert!(written.contains("nameserver 1.1.1.1\nnameserver 8.8.8.8\n"));
    assert!(written.contains("search home.arpa"));
    assert_eq!(std::fs::read_to_string(settings.backup_path()).unwrap(), original);

    flow::run_restore(&manager, &store).unwrap();
    assert_eq!(std::fs::read_to_string(&settings.resolv_conf).unwrap(), original);
    assert!(!settings.backup_path().exists());
}

#[test]
fn windows_snapshot_with_legacy_tags_restores() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);
    std::fs::write(
        &settings.snapshot_path,
        r#"{
  "windows": {
    "Ethernet 2": {"servers": ["10.0.0.1", "10.0.0.2"], "dhcp": false, "method": "netsh"},
    "Wi-Fi": {"servers": [], "dhcp": true, "method": "netsh_unknown_fallback_to_dhcp"}
  }
}"#,
    )
    .unwrap();
    let store = SnapshotStore::new(&settings.snapshot_path);
    let script = Script::default()
        .on(
            "netsh interface ipv4 set dnsserver name=Ethernet 2 static addr=10.0.0.1 validate=no",
            "",
        )
        .on(
            "netsh interface ipv4 add dnsserver name=Ethernet 2 addr=10.0.0.2 index=2 validate=no",
            "",
        )
        .on("netsh interface ipv4 set dnsservers name=Wi-Fi source=dhcp", "")
        .on("ipconfig /flushdns", "");
    let manager = DnsManager::with_runner(Platform::Windows, script, settings);

    let outcome = flow::run_restore(&manager, &store).unwrap();
    assert_eq!(outcome.report.restored, ["Ethernet 2", "Wi-Fi"]);
    assert!(outcome.flushed);
    assert!(outcome.snapshot_removed);
}

#[test]
fn server_list_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dnsConf.txt");
    std::fs::write(
        &path,
        "# upstreams\nGoogle=8.8.8.8\nbogus line\nBad=999.1.1.1\nCloudflare=1.1.1.1\nQuad9=9.9.9.9\nExtra=4.4.4.4\n",
    )
    .unwrap();

    let list = servers::load_server_list(&path).unwrap();
    assert_eq!(list.as_slice(), ["8.8.8.8", "1.1.1.1", "9.9.9.9"]);

    std::fs::write(&path, "").unwrap();
    assert!(matches!(
        servers::load_server_list(&path),
        Err(DnsError::InvalidConfig(_))
    ));
}

// ---------------------------------------------------------------------------
// Live-host tests
// ---------------------------------------------------------------------------

#[test]
#[ignore = "reads the live network configuration"]
fn real_snapshot() {
    let platform = Platform::current().expect("supported platform");
    let manager = DnsManager::new(platform, Settings::default());
    let snapshot = manager.snapshot().unwrap();
    assert!(snapshot.platform(platform).is_some_and(|points| !points.is_empty()));
}

#[test]
#[ignore = "requires root and changes the host's DNS servers"]
fn real_set_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Platform::current().expect("supported platform");
    let settings = Settings::default().with_snapshot_path(dir.path().join("snapshot.json"));
    let store = SnapshotStore::new(&settings.snapshot_path);
    let manager = DnsManager::with_runner(platform, SystemRunner, settings);

    let list = servers::parse_server_list("Cloudflare=1.1.1.1\n").unwrap();
    let outcome = flow::run_set(&manager, &store, &list).unwrap();
    assert!(outcome.is_success());

    let outcome = flow::run_restore(&manager, &store).unwrap();
    assert!(outcome.report.is_complete());
    assert!(!store.exists());
}
