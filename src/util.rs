//! Internal utilities.

/// Whether the current process runs with administrative privilege.
///
/// Effective UID 0 on Unix; an elevated token on Windows.
#[must_use]
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: `geteuid` has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(windows)]
    {
        is_root::is_root()
    }
    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}
