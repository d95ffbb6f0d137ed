//! CLI surface and on-disk settings, merged the way the overlay config does:
//! defaults, then `settings.toml`, then flags (spec §9).

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Root directory for logs, the workspace store, and `settings.toml`.
///
/// Overridable via `MULTITERM_HOME` so tests and CI never touch a real home
/// directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Ok(custom) = std::env::var("MULTITERM_HOME") {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".multi-term")
}

#[derive(Debug, Parser)]
#[command(name = "multiterm", version, about = "Run several assistant CLIs side by side in one terminal")]
pub struct Cli {
    /// Run the first-launch tutorial instead of the normal UI.
    #[arg(long)]
    pub tutorial: bool,

    /// Verify the configured assistant CLI is reachable on PATH and exit.
    #[arg(long)]
    pub check: bool,

    /// Enable debug-level logging regardless of build profile.
    #[arg(long)]
    pub debug: bool,

    /// Disable mouse capture (pane focus/resize via keyboard only).
    #[arg(long = "no-mouse")]
    pub no_mouse: bool,

    /// Override the data directory instead of `~/.multi-term` / `MULTITERM_HOME`.
    #[arg(long = "data-dir", env = "MULTITERM_HOME")]
    pub data_dir: Option<PathBuf>,

    /// Open a specific saved workspace by name on launch.
    #[arg(long)]
    pub workspace: Option<String>,

    /// Assistant CLI binary to launch in each session (overrides settings.toml).
    #[arg(long)]
    pub command: Option<String>,
}

/// Typed, persisted tuning knobs (spec §9). Every field has a conservative
/// default so a missing or partial `settings.toml` still produces a usable
/// config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_sessions: usize,
    pub pty_read_buffer: usize,
    pub completion_timeout_ms: u64,
    pub history_depth: usize,
    pub output_log_max_lines: usize,
    pub snapshot_tail_lines: usize,
    pub cache_size_workspaces: usize,
    pub auto_save: bool,
    pub save_on_exit: bool,
    pub broadcast_mode: bool,
    /// Assistant CLI binary used when a session doesn't override it.
    pub command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_sessions: 6,
            pty_read_buffer: 4096,
            completion_timeout_ms: 2000,
            history_depth: 100,
            output_log_max_lines: 10_000,
            snapshot_tail_lines: 50,
            cache_size_workspaces: 20,
            auto_save: true,
            save_on_exit: true,
            broadcast_mode: false,
            command: "codex".to_string(),
        }
    }
}

impl Settings {
    /// Load `<data_dir>/settings.toml`, falling back to defaults on any
    /// missing-file or parse error (logged, never fatal: a bad settings file
    /// must not block launch).
    #[must_use]
    pub fn load(dir: &std::path::Path) -> Self {
        let path = dir.join("settings.toml");
        match fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|err| {
                crate::log_warn(&format!(
                    "settings.toml at {} is invalid ({err}); using defaults",
                    path.display()
                ));
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    /// Persist to `<data_dir>/settings.toml`, creating the directory if needed.
    pub fn save(&self, dir: &std::path::Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let rendered = toml::to_string_pretty(self)?;
        fs::write(dir.join("settings.toml"), rendered)?;
        Ok(())
    }

    /// Apply CLI overrides on top of the loaded file (flags win).
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(command) = &cli.command {
            self.command = command.clone();
        }
    }
}

/// Fully resolved runtime configuration: CLI flags plus merged settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub tutorial: bool,
    pub check: bool,
    pub debug: bool,
    pub mouse_enabled: bool,
    pub workspace: Option<String>,
    pub settings: Settings,
}

impl AppConfig {
    #[must_use]
    pub fn from_cli(cli: Cli) -> Self {
        let dir = cli.data_dir.clone().unwrap_or_else(data_dir);
        let mut settings = Settings::load(&dir);
        settings.apply_cli(&cli);
        AppConfig {
            data_dir: dir,
            tutorial: cli.tutorial,
            check: cli.check,
            debug: cli.debug,
            mouse_enabled: !cli.no_mouse,
            workspace: cli.workspace.clone(),
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_matches_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.max_sessions, 6);
        assert_eq!(settings.pty_read_buffer, 4096);
        assert_eq!(settings.completion_timeout_ms, 2000);
        assert_eq!(settings.history_depth, 100);
        assert_eq!(settings.output_log_max_lines, 10_000);
        assert_eq!(settings.snapshot_tail_lines, 50);
        assert_eq!(settings.cache_size_workspaces, 20);
        assert!(settings.auto_save);
        assert!(settings.save_on_exit);
        assert!(!settings.broadcast_mode);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.max_sessions = 3;
        settings.command = "claude".to_string();
        settings.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_falls_back_to_defaults_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.toml"), "not valid toml {{{").unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn data_dir_honors_multiterm_home_override() {
        std::env::set_var("MULTITERM_HOME", "/tmp/multiterm-test-home");
        assert_eq!(data_dir(), PathBuf::from("/tmp/multiterm-test-home"));
        std::env::remove_var("MULTITERM_HOME");
    }
}
