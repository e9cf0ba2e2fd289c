//! Per-platform DNS methods and their fallback order.
//!
//! Each method bundles a capability check, a listing facility, a reader with
//! its own narrow output parser, a writer and a restorer. The order of
//! [`method_table`] is the fallback order.

use std::time::Duration;

use crate::command::{CommandOutput, CommandRunner};
use crate::config::Settings;
use crate::error::Result;
use crate::platform::Platform;
use crate::probe::Prober;
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, DhcpMode, MethodTag};

pub mod netsh;
pub mod networksetup;
pub mod nmcli;
pub mod resolv_conf;
pub mod resolvectl;

pub use netsh::Netsh;
pub use networksetup::NetworkSetup;
pub use nmcli::Nmcli;
pub use resolv_conf::ResolvConf;
pub use resolvectl::Resolvectl;

/// Borrowed execution context handed to every method.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub runner: &'a dyn CommandRunner,
    pub settings: &'a Settings,
}

impl<'a> Host<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, settings: &'a Settings) -> Self {
        Self { runner, settings }
    }

    /// Runs a mutation/listing command under the command timeout and
    /// requires exit 0.
    ///
    /// # Errors
    ///
    /// Propagates runner errors; non-zero exit becomes `ToolFailed`.
    pub fn run(&self, tool: &str, args: &[&str]) -> Result<CommandOutput> {
        self.run_with(tool, args, self.settings.command_timeout)
    }

    /// Like [`run`](Self::run) with an explicit budget.
    ///
    /// # Errors
    ///
    /// Propagates runner errors; non-zero exit becomes `ToolFailed`.
    pub fn run_with(&self, tool: &str, args: &[&str], timeout: Option<Duration>) -> Result<CommandOutput> {
        self.runner.run(tool, args, timeout)?.check(tool)
    }

    #[must_use]
    pub fn prober(&self) -> Prober<'a> {
        Prober::new(self.runner, self.settings.probe_timeout)
    }
}

/// How far one successful application reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Configures a single interface or service.
    PerPoint,
    /// Configures resolution for the whole host.
    HostWide,
}

/// DNS state read from one attachment point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub servers: Vec<String>,
    pub dhcp: DhcpMode,
}

impl Reading {
    #[must_use]
    pub const fn new(servers: Vec<String>, dhcp: DhcpMode) -> Self {
        Self { servers, dhcp }
    }

    #[must_use]
    pub fn into_snapshot(self, method: MethodTag) -> AttachmentSnapshot {
        AttachmentSnapshot::new(self.servers, self.dhcp, method)
    }
}

/// One DNS-management subsystem.
pub trait DnsMethod {
    /// Tag recorded in snapshots taken through this method.
    fn tag(&self) -> MethodTag;

    /// Program name, for diagnostics.
    fn tool(&self) -> &'static str;

    fn scope(&self) -> Scope {
        Scope::PerPoint
    }

    /// Whether this method is installed and usable on the host.
    fn is_available(&self, host: &Host<'_>) -> bool;

    /// Active attachment points this method can address.
    ///
    /// # Errors
    ///
    /// Fails if the listing facility cannot run.
    fn attachment_points(&self, host: &Host<'_>) -> Result<Vec<String>>;

    /// Current DNS state of `point`, `None` if nothing is discoverable.
    ///
    /// # Errors
    ///
    /// Fails if the reader command fails.
    fn read(&self, host: &Host<'_>, point: &str) -> Result<Option<Reading>>;

    /// Applies `servers` to `point`, preserving order.
    ///
    /// # Errors
    ///
    /// Fails if any step of the write fails.
    fn apply(&self, host: &Host<'_>, point: &str, servers: &ServerList) -> Result<()>;

    /// Writes `entry` back to `point`.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be written back.
    fn restore(&self, host: &Host<'_>, point: &str, entry: &AttachmentSnapshot) -> Result<()>;
}

/// Methods for `platform`, highest priority first.
#[must_use]
pub fn method_table(platform: Platform) -> Vec<Box<dyn DnsMethod>> {
    match platform {
        Platform::Windows => vec![Box::new(Netsh)],
        Platform::MacOs => vec![Box::new(NetworkSetup)],
        Platform::Linux => vec![Box::new(Nmcli), Box::new(Resolvectl), Box::new(ResolvConf)],
    }
}

/// The method that restores entries tagged `tag` on `platform`.
///
/// Restore never re-probes: the method that read a value is the one that
/// writes it back.
#[must_use]
pub fn method_for_tag(platform: Platform, tag: MethodTag) -> Option<Box<dyn DnsMethod>> {
    method_table(platform).into_iter().find(|m| m.tag() == tag)
}

/// Extracts every dotted-quad token from `text`, in order.
pub(crate) fn ipv4_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| crate::ip::is_valid_ipv4(t))
}
