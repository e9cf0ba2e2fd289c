//! The two top-level runs: set (snapshot, apply, flush) and restore
//! (load, restore, clean up, flush).

use crate::command::CommandRunner;
use crate::error::{DnsError, Result};
use crate::manager::{ApplyReport, DnsManager, RestoreReport};
use crate::servers::ServerList;
use crate::snapshot::{AttachmentSnapshot, HostSnapshot, SnapshotStore};

/// Refuses to continue without administrative privilege.
///
/// Called before anything else is touched.
///
/// # Errors
///
/// Returns [`DnsError::PrivilegeDenied`] when `elevated` is false.
pub const fn ensure_privileged(elevated: bool) -> Result<()> {
    if elevated {
        Ok(())
    } else {
        Err(DnsError::PrivilegeDenied)
    }
}

/// What happened to the snapshot during a set run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Captured and written to the store.
    Saved,
    /// A snapshot from an earlier run was still pending and was kept.
    KeptExisting,
    /// Nothing was captured or it could not be written; restore will not be possible.
    Missing,
}

/// Outcome of [`run_set`].
#[derive(Debug)]
pub struct SetOutcome {
    pub snapshot: SnapshotState,
    pub report: ApplyReport,
    pub flushed: bool,
}

impl SetOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Outcome of [`run_restore`].
#[derive(Debug)]
pub struct RestoreOutcome {
    pub report: RestoreReport,
    /// The snapshot document was deleted; only after a complete restore.
    pub snapshot_removed: bool,
    pub flushed: bool,
}

/// Snapshot first, then apply `servers`, then flush if anything changed.
///
/// An existing snapshot document is never overwritten: it still describes
/// the state from before the first set run. A failed capture is a warning,
/// not a reason to stop. Points the apply step reached without a snapshot
/// entry (the resolver file after a per-point method failed) are added
/// afterwards, so restore undoes every change.
///
/// # Errors
///
/// Returns [`DnsError::InvalidConfig`] for an empty server list.
pub fn run_set<R: CommandRunner>(
    manager: &DnsManager<R>,
    store: &SnapshotStore,
    servers: &ServerList,
) -> Result<SetOutcome> {
    if servers.is_empty() {
        return Err(DnsError::InvalidConfig("empty server list".to_string()));
    }

    let mut snapshot = if store.exists() {
        tracing::warn!(
            path = %store.path().display(),
            "Snapshot from an earlier run not yet restored, keeping it"
        );
        SnapshotState::KeptExisting
    } else {
        match manager.snapshot().and_then(|s| store.save(&s)) {
            Ok(()) => {
                tracing::info!(path = %store.path().display(), "Saved DNS snapshot");
                SnapshotState::Saved
            }
            Err(e) => {
                tracing::warn!(error = %e, "No snapshot saved, restore will not be possible");
                SnapshotState::Missing
            }
        }
    };

    let report = manager.apply(servers)?;
    if record_unsnapshotted(manager, store, &report) && snapshot == SnapshotState::Missing {
        snapshot = SnapshotState::Saved;
    }
    let flushed = report.is_success() && manager.flush_cache();
    Ok(SetOutcome {
        snapshot,
        report,
        flushed,
    })
}

/// Adds an entry for every applied point the stored snapshot lacks, tagged
/// with the method that changed it. Returns `true` if the document was written.
fn record_unsnapshotted<R: CommandRunner>(
    manager: &DnsManager<R>,
    store: &SnapshotStore,
    report: &ApplyReport,
) -> bool {
    let platform = manager.platform();
    let mut snapshot = if store.exists() {
        match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Could not reload snapshot to record applied points");
                return false;
            }
        }
    } else {
        HostSnapshot::new()
    };

    let mut added = false;
    for applied in &report.applied {
        let known = snapshot
            .platform(platform)
            .is_some_and(|points| points.contains_key(&applied.point));
        if !known {
            tracing::info!(point = %applied.point, method = %applied.method, "Recording changed point in snapshot");
            snapshot.insert(platform, applied.point.clone(), AttachmentSnapshot::automatic(applied.method));
            added = true;
        }
    }
    if !added {
        return false;
    }
    match store.save(&snapshot) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Could not record applied points, restore will miss them");
            false
        }
    }
}

/// Loads the snapshot, restores it and flushes.
///
/// The document is deleted only when every point restored; otherwise it is
/// kept for another attempt.
///
/// # Errors
///
/// Returns [`DnsError::SnapshotUnavailable`] when no usable snapshot exists
/// and propagates failures to parse or delete the document.
pub fn run_restore<R: CommandRunner>(
    manager: &DnsManager<R>,
    store: &SnapshotStore,
) -> Result<RestoreOutcome> {
    let snapshot = store.load()?;
    let report = manager.restore(&snapshot)?;

    let snapshot_removed = if report.is_complete() {
        store.remove()?;
        tracing::info!(path = %store.path().display(), "Removed snapshot after restore");
        true
    } else {
        tracing::warn!(
            path = %store.path().display(),
            failed = report.failures.len(),
            "Restore incomplete, keeping snapshot"
        );
        false
    };

    let flushed = manager.flush_cache();
    Ok(RestoreOutcome {
        report,
        snapshot_removed,
        flushed,
    })
}
