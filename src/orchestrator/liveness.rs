//! Process liveness probing.

/// Whether `pid` names a live process.
///
/// Uses a null-signal `kill`. Only `ESRCH` counts as dead; a permission
/// error means the process exists under another user.
#[cfg(unix)]
#[must_use]
pub fn probe_pid(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // 0 and negative values address process groups, never one agent.
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None::<Signal>) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Non-unix hosts have no cheap probe; report every process as alive so
/// slots are never reclaimed by mistake.
#[cfg(not(unix))]
#[must_use]
pub fn probe_pid(_pid: u32) -> bool {
    true
}
