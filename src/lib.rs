//! # host-dns
//!
//! Point a host's DNS resolvers at a chosen set of IPv4 servers, and put the
//! previous settings back later.
//!
//! Each platform has an ordered table of methods (`netsh` on Windows,
//! `networksetup` on macOS, and `nmcli`, `resolvectl` then a direct edit of
//! `/etc/resolv.conf` on Linux). The current state of every attachment point
//! (adapter, network service or link) is captured into a [`HostSnapshot`]
//! before anything is changed. Every captured entry records the method that
//! read it, and restore writes it back through that same method.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use host_dns::{DnsManager, Settings, SnapshotStore, flow, servers};
//!
//! let settings = Settings::default();
//! let manager = DnsManager::for_current_host(settings.clone())?;
//! let store = SnapshotStore::new(&settings.snapshot_path);
//!
//! // Requires root / Administrator.
//! let servers = servers::load_server_list("dnsConf.txt")?;
//! let outcome = flow::run_set(&manager, &store, &servers)?;
//! assert!(outcome.is_success());
//!
//! // Later:
//! flow::run_restore(&manager, &store)?;
//! ```
//!
//! ## Shared resolver file
//!
//! On Linux `/etc/resolv.conf` is only edited when neither NetworkManager nor
//! systemd-resolved could be used, and never when it is a symlink into or a
//! file generated by one of those daemons (see [`gate::SafetyGate`]). The
//! original is kept byte-for-byte at `/etc/resolv.conf.host-dns.bak` and moved
//! back on restore.
//!
//! ## Permissions
//!
//! Every mutation requires administrative privilege. The binary checks this
//! first with [`util::is_elevated`]; library callers are expected to do the
//! same.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod config;
pub mod error;
pub mod flow;
pub mod flush;
pub mod gate;
pub mod ip;
pub mod manager;
pub mod methods;
pub mod platform;
pub mod probe;
pub mod servers;
pub mod snapshot;
pub mod util;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::Settings;
pub use error::{DnsError, Result};
pub use manager::{ApplyReport, DnsManager, PointFailure, RestoreReport};
pub use platform::Platform;
pub use servers::ServerList;
pub use snapshot::{AttachmentSnapshot, DhcpMode, HostSnapshot, MethodTag, SnapshotStore};
