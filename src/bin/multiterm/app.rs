//! App state: owns the session manager, pane arena, modal input state, and
//! workspace persistence, and translates key events into actions on them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use uuid::Uuid;

use multiterm::config::AppConfig;
use multiterm::input::{KeyIntent, Mode, ModeState};
use multiterm::layout::PaneArena;
use multiterm::loader::{LazyLoader, Priority};
use multiterm::pane::{InputAction, PaneController};
use multiterm::session::{SessionId, SessionManager, TickEvent};
use multiterm::workspace::{
    SessionSnapshot, Workspace, WorkspaceMap, WorkspaceSlot, WorkspaceState, WorkspaceStore,
};
use multiterm::{log_error, log_warn};

const DEFAULT_SLOT: WorkspaceSlot = 0;

/// How often `tick` checks in on autosave when `AUTO_SAVE` is enabled
/// (spec §9). Not itself spec'd; chosen to keep idle ticks cheap while
/// still saving well within a session.
const AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(30);

pub struct App {
    pub config: AppConfig,
    pub manager: SessionManager,
    pub panes: PaneArena,
    pub session_order: Vec<SessionId>,
    pub controllers: HashMap<SessionId, PaneController>,
    pub active_pane: usize,
    pub mode: ModeState,
    pub status_message: Option<String>,
    pub clipboard: String,
    pub should_quit: bool,
    store: WorkspaceStore,
    loader: LazyLoader,
    active_slot: WorkspaceSlot,
    workspaces: WorkspaceMap,
    last_autosave: Instant,
    pub broadcast: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = WorkspaceStore::new(config.data_dir.clone());
        let mut loader = LazyLoader::new(
            WorkspaceStore::new(config.data_dir.clone()),
            config.settings.cache_size_workspaces,
        );
        let active_slot = resolve_requested_slot(&config, &store);
        loader.initialize(active_slot);
        let workspaces = store.load();

        let manager = SessionManager::with_read_buffer(
            config.settings.max_sessions,
            config.settings.command.clone(),
            Duration::from_millis(config.settings.completion_timeout_ms),
            config.settings.output_log_max_lines,
            config.settings.pty_read_buffer,
        );

        let broadcast = config.settings.broadcast_mode;
        let mut app = App {
            config,
            manager,
            panes: PaneArena::from_session_count(0),
            session_order: Vec::new(),
            controllers: HashMap::new(),
            active_pane: 0,
            mode: ModeState::new(),
            status_message: None,
            clipboard: String::new(),
            should_quit: false,
            store,
            loader,
            active_slot,
            workspaces,
            last_autosave: Instant::now(),
            broadcast,
        };

        app.restore_or_create_default_workspace()?;
        Ok(app)
    }

    fn restore_or_create_default_workspace(&mut self) -> Result<()> {
        if let Some(workspace) = self.loader.get_workspace(self.active_slot) {
            for snapshot in &workspace.sessions {
                if let Err(err) = self.spawn_session(snapshot.name.clone(), PathBuf::from(&snapshot.working_dir)) {
                    log_warn(&format!("failed to respawn session `{}`: {err}", snapshot.name));
                }
            }
            if !workspace.sessions.is_empty() {
                return Ok(());
            }
        }

        self.spawn_new_session("session-1".to_string())
    }

    /// Start a session in a freshly allocated directory under
    /// `<data_dir>/sessions/`, which persists across restarts so the
    /// assistant CLI can resume its conversation there (spec §4.A, invariant 2).
    pub fn spawn_new_session(&mut self, name: String) -> Result<()> {
        let dir = self.config.data_dir.join("sessions").join(Uuid::new_v4().simple().to_string());
        std::fs::create_dir_all(&dir)?;
        self.spawn_session(name, dir)
    }

    pub fn spawn_session(&mut self, name: String, working_dir: PathBuf) -> Result<()> {
        let id = self
            .manager
            .create_session(name, working_dir, Instant::now(), now_epoch())?;
        self.session_order.push(id);
        self.controllers.insert(
            id,
            PaneController::with_history_capacity(self.config.settings.history_depth),
        );
        self.panes = PaneArena::from_session_count(self.session_order.len());
        Ok(())
    }

    pub fn close_active_session(&mut self) {
        if self.session_order.is_empty() {
            return;
        }
        let id = self.session_order[self.active_pane];
        self.manager.close_session(id);
        self.controllers.remove(&id);
        self.session_order.remove(self.active_pane);
        self.panes = PaneArena::from_session_count(self.session_order.len());
        if self.active_pane >= self.session_order.len() && self.active_pane > 0 {
            self.active_pane -= 1;
        }
    }

    #[must_use]
    pub fn active_session_id(&self) -> Option<SessionId> {
        self.session_order.get(self.active_pane).copied()
    }

    pub fn cycle_pane(&mut self, delta: isize) {
        if self.session_order.is_empty() {
            return;
        }
        let len = self.session_order.len() as isize;
        let next = (self.active_pane as isize + delta).rem_euclid(len);
        self.active_pane = next as usize;
    }

    /// Drain PTY output for every session and react to lifecycle events.
    pub fn tick(&mut self) -> bool {
        if self.config.settings.auto_save && self.last_autosave.elapsed() >= AUTO_SAVE_INTERVAL {
            self.last_autosave = Instant::now();
            if let Err(err) = self.save_active_workspace() {
                log_error(&format!("autosave failed: {err}"));
            }
        }

        let events = self.manager.tick(Instant::now());
        let mut redraw = !events.is_empty();
        for event in events {
            match event {
                TickEvent::Completed { id } => {
                    if let Some(handle) = self.manager.get(id) {
                        self.status_message = Some(format!("{} completed", handle.meta().name));
                    }
                }
                TickEvent::Terminated { id } => {
                    if let Some(handle) = self.manager.get(id) {
                        self.status_message = Some(format!("{} exited", handle.meta().name));
                    }
                }
                TickEvent::StatusChanged { .. } | TickEvent::OutputAppended { .. } => {
                    redraw = true;
                }
            }
        }
        redraw
    }

    /// Route one key event according to the active mode (spec §4.I).
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        let intent = classify_key(self.mode.current(), key);
        let changed = self.mode.on_key(intent);

        match self.mode.current() {
            Mode::Normal if !changed => self.handle_normal_key(key)?,
            Mode::Insert if !changed => self.handle_insert_key(key)?,
            Mode::Copy if !changed => self.handle_copy_key(key),
            Mode::Command if !changed => self.handle_command_key(key)?,
            _ => {}
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Tab => self.cycle_pane(1),
            KeyCode::BackTab => self.cycle_pane(-1),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_insert_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(id) = self.active_session_id() else {
            return Ok(());
        };

        let action = {
            let Some(controller) = self.controllers.get_mut(&id) else {
                return Ok(());
            };
            match key.code {
                KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                    controller.on_shift_enter();
                    InputAction::None
                }
                KeyCode::Enter if key.modifiers.contains(KeyModifiers::CONTROL) => controller.on_ctrl_enter(),
                KeyCode::Enter => controller.on_enter(),
                KeyCode::Backspace => {
                    controller.input.pop();
                    InputAction::None
                }
                KeyCode::Up => {
                    controller.navigate_history_up();
                    InputAction::None
                }
                KeyCode::Down => {
                    controller.navigate_history_down();
                    InputAction::None
                }
                KeyCode::Tab if controller.autocomplete_open() => {
                    controller.autocomplete_accept();
                    InputAction::None
                }
                KeyCode::Char(c) => {
                    controller.input.push(c);
                    InputAction::None
                }
                _ => InputAction::None,
            }
        };

        if let InputAction::Submit(text) = action {
            match self.try_dispatch_slash_command(id, &text) {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    self.status_message = Some(format!("command failed: {err}"));
                }
                None if self.broadcast => {
                    let targets = self.session_order.clone();
                    for target in targets {
                        if let Err(err) = self.manager.submit_command(target, &text, Instant::now()) {
                            log_error(&format!("broadcast submit_command failed for {target}: {err}"));
                        }
                    }
                    self.status_message = Some(format!("broadcast: {text}"));
                }
                None => {
                    if let Err(err) = self.manager.submit_command(id, &text, Instant::now()) {
                        self.status_message = Some(format!("rejected: {err}"));
                        log_error(&format!("submit_command failed for {id}: {err}"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Intercept `/rename`, `/describe`, `/tag`, and `/export` before they'd
    /// otherwise be written verbatim to the PTY as a prompt (spec's
    /// workspace-metadata commands). Returns `None` for any other input
    /// (including `/search`, `/model`, and plain text), which the caller
    /// then submits normally.
    fn try_dispatch_slash_command(&mut self, id: SessionId, text: &str) -> Option<Result<()>> {
        let mut parts = text.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim().to_string();

        match cmd {
            "/rename" => Some(self.rename_active_workspace(arg)),
            "/describe" => Some(self.describe_active_workspace(arg)),
            "/tag" => Some(self.tag_active_workspace(arg)),
            "/export" => Some(self.export_session_output(id)),
            _ => None,
        }
    }

    fn active_workspace_mut(&mut self) -> &mut Workspace {
        let slot = self.active_slot;
        let now = now_epoch();
        self.workspaces
            .entry(slot)
            .or_insert_with(|| Workspace::new(format!("workspace-{slot}"), now))
    }

    fn rename_active_workspace(&mut self, name: String) -> Result<()> {
        if name.is_empty() {
            return Err(anyhow::anyhow!("/rename needs a name"));
        }
        self.active_workspace_mut().name = name.clone();
        self.status_message = Some(format!("workspace renamed to `{name}`"));
        Ok(())
    }

    fn describe_active_workspace(&mut self, description: String) -> Result<()> {
        self.active_workspace_mut().description = if description.is_empty() { None } else { Some(description) };
        self.status_message = Some("workspace description updated".to_string());
        Ok(())
    }

    fn tag_active_workspace(&mut self, tag: String) -> Result<()> {
        if tag.is_empty() {
            return Err(anyhow::anyhow!("/tag needs a tag"));
        }
        let workspace = self.active_workspace_mut();
        if !workspace.tags.iter().any(|t| t == &tag) {
            workspace.tags.push(tag.clone());
        }
        self.status_message = Some(format!("tagged `{tag}`"));
        Ok(())
    }

    /// Write the session's full output log to `<data_dir>/history/<session-id>-<epoch>.txt`.
    fn export_session_output(&mut self, id: SessionId) -> Result<()> {
        let text = {
            let Some(handle) = self.manager.get(id) else {
                return Err(anyhow::anyhow!("unknown session"));
            };
            (0..handle.output().line_count())
                .filter_map(|i| handle.output().line_text(i))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let dir = self.config.data_dir.join("history");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{id}-{}.txt", now_epoch()));
        std::fs::write(&path, text)?;
        self.status_message = Some(format!("exported to {}", path.display()));
        Ok(())
    }

    fn handle_copy_key(&mut self, key: KeyEvent) {
        let Some(id) = self.active_session_id() else {
            return;
        };
        let Some(state) = self.manager.get(id).map(|handle| handle.output().scroll_state()) else {
            return;
        };

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.manager.scroll_output(id, state.y.saturating_sub(1));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.manager.scroll_output(id, state.y + 1);
            }
            KeyCode::Char('G') => self.manager.jump_to_bottom(id),
            KeyCode::Char('y') => {
                if let Some(handle) = self.manager.get(id) {
                    if let Some(selection) = handle.output().selection_get() {
                        let text: String = (selection.start.line..=selection.end.line)
                            .filter_map(|line| handle.output().line_text(line))
                            .collect::<Vec<_>>()
                            .join("\n");
                        self.clipboard = text;
                        self.status_message = Some("yanked selection".to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('n') => {
                let name = format!("session-{}", self.session_order.len() + 1);
                if let Err(err) = self.spawn_new_session(name) {
                    self.status_message = Some(format!("spawn failed: {err}"));
                }
            }
            KeyCode::Char('x') => self.close_active_session(),
            KeyCode::Char('s') => {
                if let Err(err) = self.save_active_workspace() {
                    self.status_message = Some(format!("save failed: {err}"));
                }
            }
            KeyCode::Char('b') => {
                self.broadcast = !self.broadcast;
                self.status_message = Some(format!(
                    "broadcast {}",
                    if self.broadcast { "on" } else { "off" }
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Snapshot every live session into the active workspace slot and
    /// persist both the per-slot file (Lazy Loader) and the aggregate store.
    pub fn save_active_workspace(&mut self) -> Result<()> {
        let tail = self.config.settings.snapshot_tail_lines;
        let mut sessions = Vec::with_capacity(self.session_order.len());
        for &id in &self.session_order {
            if let Some(handle) = self.manager.get(id) {
                let meta = handle.meta();
                let log = handle.output();
                let start = log.line_count().saturating_sub(tail);
                let output_snapshot = (start..log.line_count())
                    .filter_map(|i| log.line_text(i))
                    .collect();
                sessions.push(SessionSnapshot {
                    session_id: meta.id.to_string(),
                    name: meta.name.clone(),
                    working_dir: meta.working_dir.to_string_lossy().into_owned(),
                    created_at: meta.created_at,
                    command_count: meta.command_count,
                    output_snapshot,
                    status_hint: meta.status.as_hint().to_string(),
                });
            }
        }

        let now = now_epoch();
        let mut workspace = self
            .workspaces
            .get(&self.active_slot)
            .cloned()
            .unwrap_or_else(|| Workspace::new(format!("workspace-{}", self.active_slot), now));
        workspace.sessions = sessions;
        workspace.modified_at = now;
        workspace.truncate_snapshots(tail);

        self.store.save_slot(self.active_slot, &workspace)?;
        self.workspaces.insert(self.active_slot, workspace);
        self.store.save(&self.workspaces)?;
        self.loader.invalidate(self.active_slot);
        self.loader.prefetch(self.active_slot, Priority::High);

        let state = WorkspaceState {
            active_slot: self.active_slot,
            pane_order: self.session_order.iter().map(ToString::to_string).collect(),
        };
        let state_path = self.config.data_dir.join("workspace_state.json");
        if let Ok(rendered) = serde_json::to_vec_pretty(&state) {
            let _ = std::fs::write(state_path, rendered);
        }

        self.status_message = Some("workspace saved".to_string());
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if self.config.settings.save_on_exit {
            if let Err(err) = self.save_active_workspace() {
                log_error(&format!("save on exit failed: {err}"));
            }
        }
        self.loader.shutdown();
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        let mode_hint = self.mode.current().hint();
        match &self.status_message {
            Some(msg) => format!("{mode_hint}  |  {msg}"),
            None => mode_hint.to_string(),
        }
    }
}

/// `--workspace <name>` wins outright; otherwise fall back to whatever slot
/// `workspace_state.json` last recorded as active, so a plain relaunch with
/// no flags resumes where the user left off (spec §6).
fn resolve_requested_slot(config: &AppConfig, store: &WorkspaceStore) -> WorkspaceSlot {
    if let Some(name) = &config.workspace {
        let map = store.load();
        for (slot, workspace) in &map {
            if &workspace.name == name {
                return *slot;
            }
        }
    }

    let state_path = config.data_dir.join("workspace_state.json");
    if let Ok(raw) = std::fs::read(&state_path) {
        if let Ok(state) = serde_json::from_slice::<WorkspaceState>(&raw) {
            return state.active_slot;
        }
        log_warn(&format!("{} failed to parse; using default slot", state_path.display()));
    }

    DEFAULT_SLOT
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Map a raw key event to the mode machine's coarse intents (spec §4.I).
fn classify_key(mode: Mode, key: KeyEvent) -> KeyIntent {
    if key.code == KeyCode::Esc {
        return KeyIntent::Escape;
    }
    match mode {
        Mode::Normal => match key.code {
            KeyCode::Char('i') => KeyIntent::EnterInsert,
            KeyCode::Char('v') => KeyIntent::EnterCopy,
            KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyIntent::CommandPrefix,
            _ => KeyIntent::Other,
        },
        Mode::Command => KeyIntent::Other,
        Mode::Insert | Mode::Copy => KeyIntent::Other,
    }
}
