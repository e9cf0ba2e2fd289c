//! Best-effort resolver cache invalidation.

use crate::methods::Host;
use crate::platform::Platform;

/// One cache-invalidation mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStep {
    /// Run a command; `probe` requires the tool to pass a capability probe first.
    Command {
        tool: &'static str,
        args: &'static [&'static str],
        probe: bool,
    },
    /// Restart a caching daemon through systemd when active, otherwise
    /// through its init script when present.
    RestartService { name: &'static str },
}

/// Mechanisms for `platform`, tried in order until one succeeds.
#[must_use]
pub fn flush_steps(platform: Platform) -> &'static [FlushStep] {
    match platform {
        Platform::Windows => &[FlushStep::Command {
            tool: "ipconfig",
            args: &["/flushdns"],
            probe: false,
        }],
        Platform::Linux => &[
            FlushStep::Command {
                tool: "resolvectl",
                args: &["flush-caches"],
                probe: true,
            },
            FlushStep::RestartService { name: "nscd" },
            FlushStep::RestartService { name: "dnsmasq" },
        ],
        Platform::MacOs => &[
            FlushStep::Command {
                tool: "killall",
                args: &["-HUP", "mDNSResponder"],
                probe: false,
            },
            FlushStep::Command {
                tool: "dscacheutil",
                args: &["-flushcache"],
                probe: false,
            },
        ],
    }
}

/// Tries each mechanism for `platform` in order; `true` once one succeeds.
///
/// Missing tools and failures are logged and never propagated.
#[must_use]
pub fn flush_cache(platform: Platform, host: &Host<'_>) -> bool {
    for step in flush_steps(platform) {
        if run_step(host, *step) {
            return true;
        }
    }
    tracing::warn!(platform = %platform, "No DNS cache flush mechanism succeeded");
    false
}

fn run_step(host: &Host<'_>, step: FlushStep) -> bool {
    match step {
        FlushStep::Command { tool, args, probe } => {
            if probe && !host.prober().is_available(tool) {
                tracing::debug!(tool = %tool, "Cache flush tool not available");
                return false;
            }
            match host.run(tool, args) {
                Ok(_) => {
                    tracing::info!(tool = %tool, "Flushed DNS cache");
                    true
                }
                Err(e) => {
                    tracing::debug!(tool = %tool, error = %e, "Cache flush failed");
                    false
                }
            }
        }
        FlushStep::RestartService { name } => restart_service(host, name),
    }
}

fn restart_service(host: &Host<'_>, name: &str) -> bool {
    let prober = host.prober();
    if !prober.is_available(name) {
        tracing::debug!(service = %name, "Caching daemon not installed");
        return false;
    }

    if prober.service_active(name) {
        match host.run("systemctl", &["restart", name]) {
            Ok(_) => {
                tracing::info!(service = %name, "Restarted caching daemon via systemctl");
                return true;
            }
            Err(e) => tracing::debug!(service = %name, error = %e, "systemctl restart failed"),
        }
    }

    let script = host.settings.init_dir.join(name);
    if script.exists() {
        let script = script.to_string_lossy();
        match host.run(&script, &["restart"]) {
            Ok(_) => {
                tracing::info!(service = %name, "Restarted caching daemon via init script");
                return true;
            }
            Err(e) => tracing::debug!(service = %name, error = %e, "Init script restart failed"),
        }
    }
    false
}
