//! Capability probing for platform tools.

use std::time::Duration;

use crate::command::CommandRunner;

/// Answers "is this tool installed and minimally responsive".
///
/// Probing is conservative: a tool that exists but fails both its
/// `--version` and `--help` probes is reported absent, so mutation is never
/// routed to a method that cannot work.
pub struct Prober<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> Prober<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Returns `true` if `tool --version` or, failing that, `tool --help`
    /// exits successfully within the probe timeout.
    #[must_use]
    pub fn is_available(&self, tool: &str) -> bool {
        for flag in ["--version", "--help"] {
            match self.runner.run(tool, &[flag], Some(self.timeout)) {
                Ok(out) if out.success() => {
                    tracing::debug!(tool = %tool, flag = %flag, "Tool available");
                    return true;
                }
                Ok(out) => {
                    tracing::debug!(tool = %tool, flag = %flag, status = ?out.status, "Probe failed");
                }
                Err(e) if e.is_tool_absent() => {
                    tracing::debug!(tool = %tool, "Tool not installed");
                    return false;
                }
                Err(e) => tracing::debug!(tool = %tool, flag = %flag, error = %e, "Probe failed"),
            }
        }
        false
    }

    /// Returns `true` if systemd reports `service` as `active`.
    ///
    /// Always `false` when `systemctl` itself is unavailable.
    #[must_use]
    pub fn service_active(&self, service: &str) -> bool {
        if !self.is_available("systemctl") {
            return false;
        }
        match self
            .runner
            .run("systemctl", &["is-active", service], Some(self.timeout))
        {
            Ok(out) => out.success() && out.stdout.trim() == "active",
            Err(e) => {
                tracing::debug!(service = %service, error = %e, "Service check failed");
                false
            }
        }
    }
}
