//! Blocking-thread I/O helpers for a non-blocking PTY master fd.

use std::io;
use std::os::unix::io::RawFd;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

const POLL_BACKOFF: Duration = Duration::from_millis(8);

/// Spawn a thread that reads the PTY master until EOF or the channel's
/// receiver is dropped, pushing each non-empty chunk as-is (raw ANSI
/// intact — stream filtering happens downstream, not here). `read_chunk`
/// sizes the per-read buffer (spec §9 `PTY_READ_BUFFER`).
pub(crate) fn spawn_reader_thread(fd: RawFd, tx: Sender<Vec<u8>>, read_chunk: usize) -> thread::JoinHandle<()> {
    thread::spawn(move || read_loop(fd, tx, read_chunk))
}

fn read_loop(fd: RawFd, tx: Sender<Vec<u8>>, read_chunk: usize) {
    let mut buf = vec![0u8; read_chunk.max(1)];
    loop {
        match read_once(fd, &mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_BACKOFF);
            }
            Err(_) => break,
        }
    }
}

fn read_once(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: fd is a valid PTY master owned by the caller for the thread's lifetime.
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n >= 0 {
        return Ok(n as usize);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }
        Some(code) if code == libc::EINTR => Ok(0).and(read_once(fd, buf)),
        _ => Err(err),
    }
}

/// Write the full buffer, retrying on `EINTR` and short writes.
pub(crate) fn write_all(fd: RawFd, bytes: &[u8]) -> anyhow::Result<()> {
    let mut offset = 0;
    while offset < bytes.len() {
        match try_write(fd, &bytes[offset..]) {
            Ok(n) => offset += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_BACKOFF);
            }
            Err(err) => return Err(anyhow::anyhow!(err).context("PTY write failed")),
        }
    }
    Ok(())
}

/// Attempt a single non-blocking write.
pub(crate) fn try_write(fd: RawFd, bytes: &[u8]) -> io::Result<usize> {
    // SAFETY: fd is a valid PTY master owned by the caller; bytes is a valid slice.
    let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
    if n >= 0 {
        return Ok(n as usize);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }
        Some(code) if code == libc::EINTR => try_write(fd, bytes),
        _ => Err(err),
    }
}
