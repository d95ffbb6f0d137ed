//! PTY session lifecycle: spawn, write, resize, and terminate an assistant CLI.

use crate::log_debug;
use crate::process_signal::signal_process_group_or_pid;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver};
use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;
use std::os::unix::process::ExitStatusExt;
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use super::reader::{spawn_reader_thread, try_write, write_all};
use super::session_guard;

/// A running assistant-CLI child process attached to a PTY.
///
/// Dropping a session sends `SIGTERM` then `SIGKILL` to the child's process
/// group (it was started with `setsid()`, so descendants go down with it)
/// and closes both file descriptors.
pub struct PtySession {
    master_fd: RawFd,
    child_pid: i32,
    /// Raw PTY output chunks (ANSI intact); filtering happens downstream.
    pub output_rx: Receiver<Vec<u8>>,
    _output_thread: thread::JoinHandle<()>,
}

impl PtySession {
    /// Start an assistant CLI under a pseudo-terminal sized to `initial_rows`
    /// x `initial_cols`.
    ///
    /// # Errors
    ///
    /// Returns an error if PTY allocation, process spawn, or reader thread
    /// setup fails.
    pub fn spawn(
        cli_cmd: &str,
        working_dir: &str,
        args: &[String],
        initial_rows: u16,
        initial_cols: u16,
        read_chunk: usize,
    ) -> Result<Self> {
        session_guard::cleanup_stale_sessions();

        let cwd = CString::new(working_dir)
            .with_context(|| format!("working directory contains NUL byte: {working_dir}"))?;
        let term_value = term_value_cstring("xterm-256color")?;
        let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
        argv.push(
            CString::new(cli_cmd)
                .with_context(|| format!("cli_cmd contains NUL byte: {cli_cmd}"))?,
        );
        for arg in args {
            argv.push(
                CString::new(arg.as_str())
                    .with_context(|| format!("cli arg contains NUL byte: {arg}"))?,
            );
        }

        // SAFETY: argv/cwd/term_value are valid CStrings; spawn_pty_child returns a
        // valid master fd that set_nonblocking subsequently operates on alone.
        let (master_fd, child_pid) = unsafe {
            let (master_fd, child_pid) =
                spawn_pty_child(&argv, &cwd, &term_value, initial_rows, initial_cols)?;
            set_nonblocking(master_fd)?;
            (master_fd, child_pid)
        };

        session_guard::register_session(master_fd, child_pid, cli_cmd);

        let (tx, rx) = bounded(256);
        let output_thread = spawn_reader_thread(master_fd, tx, read_chunk);

        Ok(PtySession {
            master_fd,
            child_pid,
            output_rx: rx,
            _output_thread: output_thread,
        })
    }

    /// Write raw bytes to the PTY master (keystrokes, pasted text, control codes).
    ///
    /// # Errors
    ///
    /// Returns an error if the write to the PTY master fails.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        write_all(self.master_fd, bytes)
    }

    /// Attempt a single non-blocking write; used by the broadcast writer so
    /// one slow child never blocks delivery to the others.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from a non-blocking write attempt.
    pub fn try_send_bytes(&self, bytes: &[u8]) -> io::Result<usize> {
        try_write(self.master_fd, bytes)
    }

    /// Update the PTY window size and notify the child via `SIGWINCH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the window-size ioctl fails.
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        let ws = libc::winsize {
            ws_row: rows.max(1),
            ws_col: cols.max(1),
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: ioctl writes into ws and reads master_fd; ws is fully initialized.
        let result = unsafe { libc::ioctl(self.master_fd, libc::TIOCSWINSZ, &ws) };
        if result != 0 {
            return Err(errno_error("ioctl(TIOCSWINSZ) failed"));
        }
        let _ = signal_process_group_or_pid(self.child_pid, libc::SIGWINCH, true);
        Ok(())
    }

    /// Peek whether the child is still running, without reaping it.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        child_process_is_alive(self.child_pid)
    }

    /// Non-blocking check for child exit; reaps the child on completion.
    pub fn try_wait(&mut self) -> Option<std::process::ExitStatus> {
        if self.child_pid < 0 {
            return None;
        }
        // SAFETY: child_pid is owned by this session; WNOHANG only inspects state.
        unsafe {
            let mut status = 0;
            let ret = libc::waitpid(self.child_pid, &mut status, libc::WNOHANG);
            if ret <= 0 {
                None
            } else {
                self.child_pid = -1;
                Some(std::process::ExitStatus::from_raw(status))
            }
        }
    }

    /// Terminate the child process group: `SIGTERM`, a short grace period,
    /// then `SIGKILL` if it hasn't exited.
    pub fn terminate(&mut self) {
        if self.child_pid < 0 {
            return;
        }
        if let Err(err) = signal_process_group_or_pid(self.child_pid, libc::SIGTERM, true) {
            log_debug(&format!("SIGTERM to PTY session failed: {err}"));
        }
        if !wait_for_exit(self.child_pid, Duration::from_millis(2000)) {
            if let Err(err) = signal_process_group_or_pid(self.child_pid, libc::SIGKILL, true) {
                log_debug(&format!("SIGKILL to PTY session failed: {err}"));
            }
            let mut status = 0;
            // SAFETY: child_pid is owned by this session.
            unsafe {
                libc::waitpid(self.child_pid, &mut status, 0);
            }
        }
        self.child_pid = -1;
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.terminate();
        session_guard::unregister_session(self.master_fd);
        // SAFETY: master_fd is owned exclusively by this session.
        unsafe {
            close_fd(self.master_fd);
        }
    }
}

fn child_process_is_alive(child_pid: i32) -> bool {
    if child_pid < 0 {
        return false;
    }
    // SAFETY: child_pid is owned by the caller's session; WNOHANG only inspects state.
    unsafe {
        let mut status = 0;
        libc::waitpid(child_pid, &mut status, libc::WNOHANG) == 0
    }
}

fn wait_for_exit(child_pid: i32, timeout: Duration) -> bool {
    let start = Instant::now();
    let mut status = 0;
    while start.elapsed() < timeout {
        // SAFETY: child_pid is owned by the caller's session.
        let result = unsafe { libc::waitpid(child_pid, &mut status, libc::WNOHANG) };
        if result != 0 {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

fn term_value_cstring(term_value: &str) -> Result<CString> {
    CString::new(term_value)
        .map_err(|_| anyhow!("TERM fallback constant contains an interior NUL byte"))
}

/// # Safety
///
/// `argv`, `working_dir`, and `term_value` must be valid, NUL-free C
/// strings. The child process calls `_exit(1)` on any setup failure rather
/// than returning, which would be undefined behavior after `fork()`.
unsafe fn spawn_pty_child(
    argv: &[CString],
    working_dir: &CString,
    term_value: &CString,
    initial_rows: u16,
    initial_cols: u16,
) -> Result<(RawFd, i32)> {
    let mut master_fd: RawFd = -1;
    let mut slave_fd: RawFd = -1;

    let mut winsize = libc::winsize {
        ws_row: if initial_rows > 0 { initial_rows } else { 24 },
        ws_col: if initial_cols > 0 { initial_cols } else { 80 },
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    #[allow(clippy::unnecessary_mut_passed)]
    if libc::openpty(
        &mut master_fd,
        &mut slave_fd,
        ptr::null_mut(),
        ptr::null_mut(),
        &mut winsize,
    ) != 0
    {
        return Err(errno_error("openpty failed"));
    }

    set_cloexec(master_fd)?;
    set_cloexec(slave_fd)?;

    let pid = libc::fork();
    if pid < 0 {
        close_fd(master_fd);
        close_fd(slave_fd);
        return Err(errno_error("fork failed"));
    }

    if pid == 0 {
        child_exec(master_fd, slave_fd, argv, working_dir, term_value);
    }

    close_fd(slave_fd);
    Ok((master_fd, pid))
}

/// # Safety
///
/// Must only be called in the child process immediately after `fork()`.
/// Never returns: either `execvp()` replaces the process image, or
/// `_exit(1)` runs on failure.
unsafe fn child_exec(
    master_fd: RawFd,
    slave_fd: RawFd,
    argv: &[CString],
    working_dir: &CString,
    term_value: &CString,
) -> ! {
    let fail = |context: &str| -> ! {
        let err = io::Error::last_os_error();
        let msg = format!("child_exec {context} failed: {err}\n");
        // SAFETY: write is async-signal-safe; stderr is valid in the child.
        let _ = libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(1);
    };

    close_fd(master_fd);

    if libc::setsid() == -1 {
        fail("setsid");
    }
    if libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0) == -1 {
        fail("ioctl(TIOCSCTTY)");
    }
    if libc::dup2(slave_fd, libc::STDIN_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDOUT_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDERR_FILENO) < 0
    {
        fail("dup2");
    }
    close_fd(slave_fd);

    if libc::chdir(working_dir.as_ptr()) != 0 {
        fail("chdir");
    }

    let term_key = b"TERM\0";
    if libc::setenv(term_key.as_ptr().cast(), term_value.as_ptr(), 1) != 0 {
        fail("setenv(TERM)");
    }

    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|s| s.as_ptr()).collect();
    argv_ptrs.push(ptr::null());

    libc::execvp(argv_ptrs[0], argv_ptrs.as_ptr());
    fail("execvp");
}

/// # Safety
///
/// `fd` must be a valid, open file descriptor.
unsafe fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = libc::fcntl(fd, libc::F_GETFL, 0);
    if flags < 0 {
        return Err(errno_error("fcntl(F_GETFL) failed"));
    }
    if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
        return Err(errno_error("fcntl(F_SETFL) failed"));
    }
    Ok(())
}

fn set_cloexec(fd: RawFd) -> Result<()> {
    if fd < 0 {
        return Ok(());
    }
    // SAFETY: fd is a valid descriptor owned by the caller.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(errno_error("fcntl(F_GETFD) failed"));
    }
    // SAFETY: see above.
    let result = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if result < 0 {
        return Err(errno_error("fcntl(F_SETFD, FD_CLOEXEC) failed"));
    }
    Ok(())
}

fn errno_error(context: &str) -> anyhow::Error {
    anyhow!("{context}: {}", io::Error::last_os_error())
}

/// # Safety
///
/// `fd` must be a valid, open file descriptor, or -1 to be ignored.
unsafe fn close_fd(fd: RawFd) {
    if fd >= 0 {
        let _ = libc::close(fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_runs_a_real_command_and_reports_alive_then_exit() {
        let mut session =
            PtySession::spawn("/bin/sh", "/tmp", &["-c".into(), "sleep 0.2".into()], 24, 80, 4096)
                .expect("spawn should succeed for /bin/sh");
        assert!(session.is_alive());
        std::thread::sleep(Duration::from_millis(400));
        assert!(session.try_wait().is_some() || !session.is_alive());
    }

    #[test]
    fn spawn_forwards_stdout_through_output_rx() {
        let session = PtySession::spawn(
            "/bin/sh",
            "/tmp",
            &["-c".into(), "echo hello-pty".into()],
            24,
            80,
            4096,
        )
        .expect("spawn should succeed");
        let mut collected = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            match session.output_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(chunk) => collected.extend(chunk),
                Err(_) if !session.is_alive() => break,
                Err(_) => continue,
            }
        }
        let text = String::from_utf8_lossy(&collected);
        assert!(text.contains("hello-pty"), "got: {text:?}");
    }

    #[test]
    fn resize_on_dead_session_does_not_panic() {
        let session =
            PtySession::spawn("/bin/sh", "/tmp", &["-c".into(), "exit 0".into()], 24, 80, 4096)
                .expect("spawn should succeed");
        std::thread::sleep(Duration::from_millis(200));
        let _ = session.resize(30, 100);
    }
}
