//! Entry point: parse CLI flags, run `--check`/`--tutorial` short-circuits,
//! or start the session grid inside a raw-mode alternate screen.

mod app;
mod event;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use multiterm::config::{AppConfig, Cli};
use multiterm::terminal_restore::TerminalRestoreGuard;
use multiterm::{init_logging, log_file_path};

use app::App;
use event::AppEvent;

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        std::env::set_var("MULTITERM_LOG", "debug");
    }
    init_logging();

    let config = AppConfig::from_cli(cli);

    if config.check {
        return run_check(&config);
    }
    if config.tutorial {
        return run_tutorial();
    }

    run_ui(config)
}

/// `--check`: validate the assistant CLI is reachable and the data
/// directory is writable, matching the spec's "environment doctor" contract.
fn run_check(config: &AppConfig) -> Result<()> {
    let mut ok = true;

    match which::which(&config.settings.command) {
        Ok(path) => println!("ok: `{}` found at {}", config.settings.command, path.display()),
        Err(_) => {
            println!("fail: `{}` not found on PATH", config.settings.command);
            ok = false;
        }
    }

    match std::fs::create_dir_all(&config.data_dir) {
        Ok(()) => println!("ok: data directory {} is writable", config.data_dir.display()),
        Err(err) => {
            println!("fail: data directory {}: {err}", config.data_dir.display());
            ok = false;
        }
    }

    println!("log file: {}", log_file_path().display());

    if ok {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn run_tutorial() -> Result<()> {
    println!("multiterm tutorial");
    println!("  i        enter insert mode and type a command to the focused session");
    println!("  Enter    submit the command to the assistant CLI");
    println!("  Esc      back to normal mode");
    println!("  Tab      cycle the focused pane");
    println!("  Ctrl-B n start a new session, Ctrl-B x close the focused one, Ctrl-B s save");
    println!("  Ctrl-B b toggle broadcast: submitted input goes to every pane");
    println!("  v        copy mode: j/k scroll, y yank the selection");
    println!("  /rename, /describe, /tag edit the active workspace; /export saves the output log");
    Ok(())
}

fn run_ui(config: AppConfig) -> Result<()> {
    let guard = TerminalRestoreGuard::new();
    guard.enable_raw_mode()?;
    let mut stdout = io::stdout();
    guard.enter_alt_screen(&mut stdout)?;
    if config.mouse_enabled {
        guard.enable_mouse_capture(&mut stdout)?;
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(config)?;
    let result = event_loop(&mut terminal, &mut app);

    app.shutdown();
    drop(terminal);
    guard.restore();

    result
}

fn event_loop<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| ui::draw(frame, app))?;

    loop {
        let mut should_draw = app.tick();

        match event::next_event(Duration::from_millis(80))? {
            AppEvent::Key(key) => {
                app.handle_key(key)?;
                should_draw = true;
            }
            AppEvent::Resize => should_draw = true,
            AppEvent::Tick => {}
        }

        if should_draw {
            terminal.draw(|frame| ui::draw(frame, app))?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
