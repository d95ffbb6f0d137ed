//! `SessionManager`: owns every live session and drives its state machine
//! by polling PTY output on each UI-thread tick (spec §4.B, §5).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::output::OutputLog;
use crate::pty::PtySession;
use crate::stream::styled_text::{Style, StyledRun};
use crate::stream::StreamProcessor;
use crate::MultitermError;

use super::completion_timer::CompletionTimer;
use super::model::{ActiveCommand, SessionId, SessionMeta, SessionStatus};

/// Everything the manager keeps per live session: identity, the PTY child,
/// the streaming pipeline, the rendered output, and completion bookkeeping.
pub struct SessionHandle {
    pub meta: SessionMeta,
    pty: PtySession,
    pub processor: StreamProcessor,
    pub output: OutputLog,
    timer: CompletionTimer,
    active: Option<ActiveCommand>,
}

impl SessionHandle {
    #[must_use]
    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    #[must_use]
    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    #[must_use]
    pub fn active_command(&self) -> Option<&ActiveCommand> {
        self.active.as_ref()
    }
}

/// Outcomes of a `tick()` call, for the UI layer to react to (status-line
/// updates, bell/notification, workspace-dirty marking).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    OutputAppended { id: SessionId },
    StatusChanged { id: SessionId, status: SessionStatus },
    Completed { id: SessionId },
    Terminated { id: SessionId },
}

pub struct SessionManager {
    sessions: HashMap<SessionId, SessionHandle>,
    order: Vec<SessionId>,
    max_sessions: usize,
    cli_command: String,
    completion_threshold: Duration,
    output_log_max_lines: usize,
    pty_read_buffer: usize,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        max_sessions: usize,
        cli_command: String,
        completion_threshold: Duration,
        output_log_max_lines: usize,
    ) -> Self {
        SessionManager::with_read_buffer(max_sessions, cli_command, completion_threshold, output_log_max_lines, 4096)
    }

    /// Like [`SessionManager::new`], but with the `PTY_READ_BUFFER` knob
    /// (spec §9) also configurable.
    #[must_use]
    pub fn with_read_buffer(
        max_sessions: usize,
        cli_command: String,
        completion_threshold: Duration,
        output_log_max_lines: usize,
        pty_read_buffer: usize,
    ) -> Self {
        SessionManager {
            sessions: HashMap::new(),
            order: Vec::new(),
            max_sessions: max_sessions.max(1),
            cli_command,
            completion_threshold,
            output_log_max_lines,
            pty_read_buffer: pty_read_buffer.max(256),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    /// Spawn a new assistant-CLI session (spec §4.A, §4.B). Rejects once
    /// `max_sessions` is reached rather than silently queuing.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cap is reached or the PTY fails to spawn.
    pub fn create_session(
        &mut self,
        name: String,
        working_dir: PathBuf,
        now: Instant,
        created_at_epoch: u64,
    ) -> Result<SessionId> {
        if self.is_full() {
            return Err(MultitermError::SpawnFailed {
                reason: format!("session limit ({}) reached", self.max_sessions),
            }
            .into());
        }

        let working_dir_str = working_dir.to_string_lossy().into_owned();
        let pty = PtySession::spawn(&self.cli_command, &working_dir_str, &[], 24, 80, self.pty_read_buffer)
            .with_context(|| format!("spawning `{}` in {working_dir_str}", self.cli_command))?;

        let meta = SessionMeta::new(name, working_dir, created_at_epoch);
        let id = meta.id;
        let handle = SessionHandle {
            meta,
            pty,
            processor: StreamProcessor::new(),
            output: OutputLog::new(self.output_log_max_lines.max(100)),
            timer: CompletionTimer::new(self.completion_threshold),
            active: None,
        };
        self.sessions.insert(id, handle);
        self.order.push(id);
        let _ = now;
        Ok(id)
    }

    /// Close and terminate a session, dropping its PTY child.
    pub fn close_session(&mut self, id: SessionId) {
        self.sessions.remove(&id);
        self.order.retain(|&s| s != id);
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&SessionHandle> {
        self.sessions.get(&id)
    }

    /// Scroll a session's output log to an absolute line, disengaging
    /// tail-follow (spec §4.D); used by Copy-mode navigation.
    pub fn scroll_output(&mut self, id: SessionId, y: usize) {
        if let Some(handle) = self.sessions.get_mut(&id) {
            handle.output.scroll_to(y);
        }
    }

    /// Re-engage tail-follow for a session's output log.
    pub fn jump_to_bottom(&mut self, id: SessionId) {
        if let Some(handle) = self.sessions.get_mut(&id) {
            handle.output.jump_to_bottom();
        }
    }

    #[must_use]
    pub fn list_sessions(&self) -> Vec<&SessionMeta> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id).map(SessionHandle::meta))
            .collect()
    }

    /// Submit a command line to a session's PTY (spec §4.B). Rejects a busy
    /// session rather than interleaving input.
    ///
    /// # Errors
    ///
    /// Returns `MultitermError::BusySession` if the session is processing or
    /// responding, or an I/O error if the write to the PTY fails.
    pub fn submit_command(&mut self, id: SessionId, text: &str, now: Instant) -> Result<()> {
        let handle = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("unknown session"))?;

        if handle.meta.status.is_busy() {
            return Err(MultitermError::BusySession.into());
        }

        let separator = StyledRun {
            text: format!("[{}] $ {text}\n", epoch_secs()),
            style: Style {
                dim: true,
                ..Style::default()
            },
        };
        handle.output.append(std::slice::from_ref(&separator));

        let mut line = text.as_bytes().to_vec();
        line.push(b'\n');
        handle.pty.send_bytes(&line)?;

        handle.meta.status = SessionStatus::Processing;
        handle.active = Some(ActiveCommand::new(now));
        handle.processor.start_command(now);
        handle.timer.arm(now);
        Ok(())
    }

    /// Drain every session's PTY output channel, run it through the stream
    /// processor, append styled runs to the output log, and advance each
    /// session's state machine. Called once per UI-thread frame.
    pub fn tick(&mut self, now: Instant) -> Vec<TickEvent> {
        let mut events = Vec::new();
        let ids: Vec<SessionId> = self.order.clone();

        for id in ids {
            let Some(handle) = self.sessions.get_mut(&id) else {
                continue;
            };

            let mut appended = false;
            while let Ok(chunk) = handle.pty.output_rx.try_recv() {
                if chunk.is_empty() {
                    continue;
                }
                if matches!(handle.meta.status, SessionStatus::Processing) {
                    handle.meta.status = SessionStatus::Responding;
                    events.push(TickEvent::StatusChanged {
                        id,
                        status: SessionStatus::Responding,
                    });
                }
                let processed = handle.processor.process(&chunk, now);
                handle.output.append(&processed.runs);
                if let Some(active) = &mut handle.active {
                    active.last_output_at = now;
                    active.bytes_received += chunk.len() as u64;
                    if processed.new_status.is_some() {
                        active.step_count = handle.processor.step_count();
                    }
                }
                handle.timer.arm(now);
                appended = true;
            }

            if appended {
                events.push(TickEvent::OutputAppended { id });
            }

            if handle.meta.status.is_busy() && handle.timer.has_fired(now) {
                handle.timer.disarm();
                if let Some(active) = &handle.active {
                    let elapsed = now.duration_since(active.started_at).as_secs();
                    let marker = StyledRun {
                        text: format!("Completed in {elapsed}s \u{2022} {} steps\n", active.step_count),
                        style: Style {
                            dim: true,
                            ..Style::default()
                        },
                    };
                    handle.output.append(std::slice::from_ref(&marker));
                }
                handle.meta.status = SessionStatus::Completed;
                handle.meta.command_count += 1;
                handle.active = None;
                events.push(TickEvent::Completed { id });
            }

            if !handle.pty.is_alive() && !matches!(handle.meta.status, SessionStatus::Terminated) {
                handle.meta.status = SessionStatus::Terminated;
                handle.timer.disarm();
                events.push(TickEvent::Terminated { id });
            }
        }

        events
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(2, "/bin/sh".into(), Duration::from_millis(50), 10_000)
    }

    #[test]
    fn create_session_registers_it_in_listing() {
        let mut mgr = manager();
        let id = mgr
            .create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .expect("spawn /bin/sh");
        assert_eq!(mgr.list_sessions().len(), 1);
        assert_eq!(mgr.get(id).unwrap().meta().status, SessionStatus::Idle);
    }

    #[test]
    fn create_session_rejects_beyond_max_sessions() {
        let mut mgr = manager();
        mgr.create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        mgr.create_session("s2".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        let result = mgr.create_session("s3".into(), PathBuf::from("/tmp"), Instant::now(), 0);
        assert!(result.is_err());
    }

    #[test]
    fn submit_command_marks_session_processing_then_completes_after_quiet_period() {
        let mut mgr = manager();
        let id = mgr
            .create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        mgr.submit_command(id, "echo hi", Instant::now()).unwrap();
        assert_eq!(mgr.get(id).unwrap().meta().status, SessionStatus::Processing);

        std::thread::sleep(Duration::from_millis(200));
        let events = mgr.tick(Instant::now());
        assert!(events
            .iter()
            .any(|e| matches!(e, TickEvent::Completed { id: i } if *i == id)));
        assert_eq!(mgr.get(id).unwrap().meta().status, SessionStatus::Completed);
    }

    #[test]
    fn submit_command_writes_a_separator_and_completion_writes_a_marker() {
        let mut mgr = manager();
        let id = mgr
            .create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        mgr.submit_command(id, "echo hi", Instant::now()).unwrap();

        let after_submit = mgr.get(id).unwrap().output();
        let joined: String = (0..after_submit.line_count())
            .filter_map(|i| after_submit.line_text(i))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(joined.contains("$ echo hi"), "expected a command separator, got: {joined:?}");

        std::thread::sleep(Duration::from_millis(200));
        mgr.tick(Instant::now());
        assert_eq!(mgr.get(id).unwrap().meta().command_count, 1);

        let after_complete = mgr.get(id).unwrap().output();
        let joined: String = (0..after_complete.line_count())
            .filter_map(|i| after_complete.line_text(i))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(joined.contains("Completed in"), "expected a completion marker, got: {joined:?}");
        assert!(joined.contains("steps"));
    }

    #[test]
    fn submit_command_rejects_busy_session() {
        let mut mgr = manager();
        let id = mgr
            .create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        mgr.submit_command(id, "sleep 1", Instant::now()).unwrap();
        let result = mgr.submit_command(id, "echo again", Instant::now());
        assert!(result.is_err());
    }

    #[test]
    fn close_session_removes_it_from_listing() {
        let mut mgr = manager();
        let id = mgr
            .create_session("s1".into(), PathBuf::from("/tmp"), Instant::now(), 0)
            .unwrap();
        mgr.close_session(id);
        assert!(mgr.list_sessions().is_empty());
        assert!(mgr.get(id).is_none());
    }
}
