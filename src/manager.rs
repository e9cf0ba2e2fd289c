//! Snapshot, mutation and restore across a platform's method table.
//!
//! Method choice is per attachment point: each point is handled by the
//! first method in [`method_table`] order that can read or write it, so
//! different points may be owned by different subsystems at the same time.

use std::collections::BTreeMap;
use std::fmt;

use crate::command::{CommandRunner, SystemRunner};
use crate::config::Settings;
use crate::error::{DnsError, Result};
use crate::flush;
use crate::methods::{Host, Scope, method_for_tag, method_table};
use crate::platform::Platform;
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, HostSnapshot, MethodTag, PlatformSnapshot};

/// A failure confined to one method, and to one point when known.
#[derive(Debug)]
pub struct PointFailure {
    /// `None` when the method failed before reaching any point (listing).
    pub point: Option<String>,
    pub method: MethodTag,
    pub error: DnsError,
}

impl fmt::Display for PointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.point {
            Some(point) => write!(f, "{} on {point}: {}", self.method, self.error),
            None => write!(f, "{}: {}", self.method, self.error),
        }
    }
}

/// A point that was reconfigured, and by which method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub point: String,
    pub method: MethodTag,
}

/// Outcome of [`DnsManager::apply`].
#[derive(Debug)]
pub struct ApplyReport {
    pub platform: Platform,
    pub applied: Vec<Applied>,
    /// Methods whose capability check failed.
    pub unavailable: Vec<MethodTag>,
    pub failures: Vec<PointFailure>,
}

impl ApplyReport {
    const fn new(platform: Platform) -> Self {
        Self {
            platform,
            applied: Vec::new(),
            unavailable: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// `true` iff at least one point was reconfigured.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.applied.is_empty()
    }

    fn has_point(&self, point: &str) -> bool {
        self.applied.iter().any(|a| a.point == point)
    }
}

/// Outcome of [`DnsManager::restore`].
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failures: Vec<PointFailure>,
}

impl RestoreReport {
    /// `true` iff every point restored without error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts a partial restore into [`DnsError::RestoreIncomplete`].
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::RestoreIncomplete`] naming the failed points.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_complete() {
            return Ok(self.restored);
        }
        Err(DnsError::RestoreIncomplete {
            failed: self
                .failures
                .into_iter()
                .map(|f| f.point.unwrap_or_else(|| f.method.to_string()))
                .collect(),
        })
    }
}

/// Drives one platform's DNS methods.
///
/// # Example
///
/// ```rust,ignore
/// use host_dns::{DnsManager, ServerList, Settings, SnapshotStore};
///
/// let manager = DnsManager::for_current_host(Settings::default())?;
/// let store = SnapshotStore::new("original_dns_config.json");
///
/// store.save(&manager.snapshot()?)?;
/// let report = manager.apply(&ServerList::new(["9.9.9.9", "1.1.1.1"])?)?;
/// assert!(report.is_success());
///
/// // Later:
/// let report = manager.restore(&store.load()?)?;
/// if report.is_complete() {
///     store.remove()?;
/// }
/// ```
pub struct DnsManager<R = SystemRunner> {
    platform: Platform,
    runner: R,
    settings: Settings,
}

impl DnsManager<SystemRunner> {
    /// Manager for `platform` running real commands.
    #[must_use]
    pub const fn new(platform: Platform, settings: Settings) -> Self {
        Self::with_runner(platform, SystemRunner, settings)
    }

    /// Manager for the compiled-for platform.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::UnsupportedPlatform`] outside Windows, Linux and macOS.
    pub fn for_current_host(settings: Settings) -> Result<Self> {
        let platform = Platform::current()
            .ok_or_else(|| DnsError::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
        Ok(Self::new(platform, settings))
    }
}

impl<R: CommandRunner> DnsManager<R> {
    /// Manager for `platform` running commands through `runner`.
    #[must_use]
    pub const fn with_runner(platform: Platform, runner: R, settings: Settings) -> Self {
        Self {
            platform,
            runner,
            settings,
        }
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    fn host(&self) -> Host<'_> {
        Host::new(&self.runner, &self.settings)
    }

    /// Captures the current DNS state of every discoverable attachment point.
    ///
    /// Points with nothing readable are recorded as automatic under the
    /// method that listed them. The host-wide resolver file is only read
    /// when no per-point method captured anything.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::SnapshotUnavailable`] when no attachment point
    /// could be discovered at all.
    pub fn snapshot(&self) -> Result<HostSnapshot> {
        let host = self.host();
        let mut captured = PlatformSnapshot::new();
        let mut undiscovered: BTreeMap<String, MethodTag> = BTreeMap::new();
        let mut last_error = None;

        for method in method_table(self.platform) {
            let tag = method.tag();
            let host_wide = method.scope() == Scope::HostWide;
            if host_wide && !(captured.is_empty() && undiscovered.is_empty()) {
                continue;
            }
            if !method.is_available(&host) {
                tracing::debug!(platform = %self.platform, method = %tag, "Method not available");
                continue;
            }
            let points = match method.attachment_points(&host) {
                Ok(points) => points,
                Err(e) => {
                    tracing::warn!(method = %tag, error = %e, "Could not list attachment points");
                    last_error = Some(e);
                    continue;
                }
            };

            for point in points {
                if captured.contains_key(&point) {
                    continue;
                }
                match method.read(&host, &point) {
                    Ok(Some(reading)) => {
                        tracing::info!(
                            point = %point,
                            method = %tag,
                            servers = ?reading.servers,
                            dhcp = ?reading.dhcp,
                            "Captured DNS settings"
                        );
                        undiscovered.remove(&point);
                        captured.insert(point, reading.into_snapshot(tag));
                    }
                    Ok(None) if !host_wide => {
                        tracing::debug!(point = %point, method = %tag, "No DNS state found");
                        undiscovered.entry(point).or_insert(tag);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(point = %point, method = %tag, error = %e, "Could not read DNS settings");
                        if !host_wide {
                            undiscovered.entry(point).or_insert(tag);
                        }
                    }
                }
            }
        }

        for (point, tag) in undiscovered {
            tracing::info!(point = %point, method = %tag, "Recording point as automatic");
            captured.insert(point, AttachmentSnapshot::automatic(tag));
        }

        if captured.is_empty() {
            let reason = last_error.map_or_else(
                || format!("no attachment points discovered on {}", self.platform),
                |e| e.to_string(),
            );
            return Err(DnsError::SnapshotUnavailable(reason));
        }
        Ok(HostSnapshot::for_host(self.platform, captured))
    }

    /// Applies `servers` to every active attachment point it can reach.
    ///
    /// Per-point methods are tried in priority order for each point not yet
    /// configured. The host-wide resolver file is only edited when no
    /// per-point method succeeded, and only past the Safety Gate. Method
    /// failures are collected in the report, never raised.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::InvalidConfig`] for an empty server list.
    pub fn apply(&self, servers: &ServerList) -> Result<ApplyReport> {
        if servers.is_empty() {
            return Err(DnsError::InvalidConfig("empty server list".to_string()));
        }
        let host = self.host();
        let mut report = ApplyReport::new(self.platform);

        for method in method_table(self.platform) {
            let tag = method.tag();
            let host_wide = method.scope() == Scope::HostWide;
            if host_wide && report.is_success() {
                tracing::debug!(method = %tag, "Per-point methods succeeded, leaving shared file alone");
                continue;
            }
            if !method.is_available(&host) {
                tracing::debug!(platform = %self.platform, method = %tag, "Method not available");
                report.unavailable.push(tag);
                continue;
            }
            let points = match method.attachment_points(&host) {
                Ok(points) if points.is_empty() => {
                    report.failures.push(PointFailure {
                        point: None,
                        method: tag,
                        error: DnsError::NoAttachmentPoints {
                            tool: method.tool().to_string(),
                        },
                    });
                    continue;
                }
                Ok(points) => points,
                Err(e) => {
                    tracing::warn!(method = %tag, error = %e, "Could not list attachment points");
                    report.failures.push(PointFailure {
                        point: None,
                        method: tag,
                        error: e,
                    });
                    continue;
                }
            };

            for point in points {
                if report.has_point(&point) {
                    continue;
                }
                match method.apply(&host, &point, servers) {
                    Ok(()) => {
                        tracing::info!(point = %point, method = %tag, servers = %servers, "Applied DNS servers");
                        report.applied.push(Applied { point, method: tag });
                        if host_wide {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(point = %point, method = %tag, error = %e, "Failed to apply DNS servers");
                        report.failures.push(PointFailure {
                            point: Some(point),
                            method: tag,
                            error: e,
                        });
                    }
                }
            }
        }

        if !report.is_success() {
            tracing::warn!(platform = %self.platform, "DNS servers could not be applied by any method");
        }
        Ok(report)
    }

    /// Writes every entry of this platform's section of `snapshot` back,
    /// dispatching strictly on its recorded method tag.
    ///
    /// One point's failure does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::SnapshotUnavailable`] if `snapshot` has no section
    /// for this platform.
    pub fn restore(&self, snapshot: &HostSnapshot) -> Result<RestoreReport> {
        let points = snapshot.platform(self.platform).ok_or_else(|| {
            DnsError::SnapshotUnavailable(format!("no saved settings for {}", self.platform))
        })?;
        let host = self.host();
        let mut report = RestoreReport::default();

        for (point, entry) in points {
            let result = method_for_tag(self.platform, entry.method).map_or_else(
                || {
                    Err(DnsError::NotRestorable {
                        point: point.clone(),
                        reason: format!("no {} method for tag `{}`", self.platform, entry.method),
                    })
                },
                |method| method.restore(&host, point, entry),
            );
            match result {
                Ok(()) => {
                    tracing::info!(point = %point, method = %entry.method, "Restored DNS settings");
                    report.restored.push(point.clone());
                }
                Err(e) => {
                    tracing::warn!(point = %point, method = %entry.method, error = %e, "Failed to restore DNS settings");
                    report.failures.push(PointFailure {
                        point: Some(point.clone()),
                        method: entry.method,
                        error: e,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Best-effort resolver cache flush; see [`flush::flush_cache`].
    #[must_use]
    pub fn flush_cache(&self) -> bool {
        flush::flush_cache(self.platform, &self.host())
    }
}
