//! Shared process-group signaling helpers for PTY child teardown.

use std::io;

/// Send a signal to a process group first, then fall back to the direct pid.
///
/// PTY children call `setsid()` on spawn (see `pty::spawn_pty_child`), so
/// signaling `-pid` reaches descendants as well. Callers choose whether a
/// missing pid (`ESRCH`) counts as success (already exited) or as an error.
#[cfg(unix)]
pub(crate) fn signal_process_group_or_pid(
    pid: i32,
    signal: i32,
    missing_is_ok: bool,
) -> io::Result<()> {
    if pid <= 0 {
        return Ok(());
    }

    // SAFETY: libc::kill is called with plain integer pid/signal values; no
    // pointers are dereferenced, and errno is read immediately after each call.
    unsafe {
        if libc::kill(-pid, signal) == 0 {
            return Ok(());
        }
        let group_err = io::Error::last_os_error();

        if libc::kill(pid, signal) == 0 {
            return Ok(());
        }
        let pid_err = io::Error::last_os_error();

        if missing_target_can_be_ignored(missing_is_ok, &pid_err) {
            return Ok(());
        }

        Err(io::Error::new(
            pid_err.kind(),
            format!(
                "group(-{pid}) signal failed: {group_err}; pid({pid}) signal failed: {pid_err}"
            ),
        ))
    }
}

#[cfg(not(unix))]
pub(crate) fn signal_process_group_or_pid(
    _pid: i32,
    _signal: i32,
    _missing_is_ok: bool,
) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_no_such_process(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::ESRCH)
}

#[cfg(unix)]
fn missing_target_can_be_ignored(missing_is_ok: bool, pid_err: &io::Error) -> bool {
    missing_is_ok && is_no_such_process(pid_err)
}
