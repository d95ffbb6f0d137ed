//! Tracks PTY child ownership via on-disk lease files so a crashed multiterm
//! process doesn't leave orphaned assistant CLIs running forever.

use crate::lock_or_recover;
use crate::log_debug;
use crate::process_signal::signal_process_group_or_pid;
use std::collections::HashMap;
use std::fs;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SESSION_GUARD_DIR_NAME: &str = "session-guard";
const STALE_CLEANUP_MIN_INTERVAL_MS: u64 = 2_000;

static SESSION_FILE_SEQUENCE: AtomicU64 = AtomicU64::new(0);
static LAST_STALE_CLEANUP_MS: AtomicU64 = AtomicU64::new(0);
static ACTIVE_SESSION_FILES: OnceLock<Mutex<HashMap<RawFd, PathBuf>>> = OnceLock::new();

fn active_session_files() -> &'static Mutex<HashMap<RawFd, PathBuf>> {
    ACTIVE_SESSION_FILES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn session_guard_dir() -> PathBuf {
    crate::config::data_dir().join(SESSION_GUARD_DIR_NAME)
}

fn lease_path(base_dir: &Path, owner_pid: i32, child_pid: i32) -> PathBuf {
    let seq = SESSION_FILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    base_dir.join(format!("{owner_pid}-{child_pid}-{seq}.lease"))
}

fn lease_text(owner_pid: i32, child_pid: i32, exec_name: &str) -> String {
    format!("owner_pid={owner_pid}\nchild_pid={child_pid}\nexec_name={exec_name}\n")
}

fn parse_lease(text: &str) -> Option<(i32, i32)> {
    let mut owner_pid = None;
    let mut child_pid = None;
    for line in text.lines() {
        let (key, value) = line.split_once('=')?;
        match key {
            "owner_pid" => owner_pid = value.parse::<i32>().ok(),
            "child_pid" => child_pid = value.parse::<i32>().ok(),
            _ => {}
        }
    }
    Some((owner_pid?, child_pid?))
}

/// Record that `child_pid` (a freshly spawned PTY child) belongs to this
/// process, so a future launch can detect and reap it if we crash first.
pub(crate) fn register_session(master_fd: RawFd, child_pid: i32, exec_name: &str) {
    let base_dir = session_guard_dir();
    if fs::create_dir_all(&base_dir).is_err() {
        return;
    }
    let owner_pid = std::process::id() as i32;
    let path = lease_path(&base_dir, owner_pid, child_pid);
    if fs::write(&path, lease_text(owner_pid, child_pid, exec_name)).is_ok() {
        let mut files = lock_or_recover(active_session_files(), "register_session");
        files.insert(master_fd, path);
    }
    cleanup_stale_sessions();
}

/// Drop the lease file for a session we are tearing down cleanly.
pub(crate) fn unregister_session(master_fd: RawFd) {
    let mut files = lock_or_recover(active_session_files(), "unregister_session");
    if let Some(path) = files.remove(&master_fd) {
        let _ = fs::remove_file(path);
    }
}

fn owner_is_alive(owner_pid: i32) -> bool {
    if owner_pid <= 0 {
        return false;
    }
    // SAFETY: kill with signal 0 only probes existence/permission, no side effects.
    unsafe { libc::kill(owner_pid, 0) == 0 }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn cleanup_allowed(now: u64) -> bool {
    let last = LAST_STALE_CLEANUP_MS.load(Ordering::Relaxed);
    now.saturating_sub(last) >= STALE_CLEANUP_MIN_INTERVAL_MS
}

/// Scan the lease directory for sessions whose owning multiterm process is
/// gone, and terminate their orphaned child process groups. Rate-limited so
/// callers (every new session spawn) can call this unconditionally.
pub(crate) fn cleanup_stale_sessions() {
    let now = now_ms();
    if !cleanup_allowed(now) {
        return;
    }
    LAST_STALE_CLEANUP_MS.store(now, Ordering::Relaxed);

    let base_dir = session_guard_dir();
    let Ok(entries) = fs::read_dir(&base_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lease") {
            continue;
        }
        let Ok(text) = fs::read_to_string(&path) else {
            continue;
        };
        let Some((owner_pid, child_pid)) = parse_lease(&text) else {
            let _ = fs::remove_file(&path);
            continue;
        };
        if owner_is_alive(owner_pid) {
            continue;
        }
        log_debug(&format!(
            "reaping orphaned PTY child {child_pid} left by dead owner {owner_pid}"
        ));
        if let Err(err) = signal_process_group_or_pid(child_pid, libc::SIGTERM, true) {
            log_debug(&format!("failed to SIGTERM orphaned child {child_pid}: {err}"));
        }
        std::thread::sleep(Duration::from_millis(50));
        let _ = signal_process_group_or_pid(child_pid, libc::SIGKILL, true);
        let _ = fs::remove_file(&path);
    }
}
