//! Crossterm event polling: translates terminal events into the small set
//! of things the app loop cares about (spec §5 — UI-thread event loop).

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Poll for the next event, falling back to `Tick` after `timeout` so the
/// app loop still drains PTY output and checks completion timers when the
/// user isn't typing.
pub fn next_event(timeout: Duration) -> Result<AppEvent> {
    if event::poll(timeout)? {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(AppEvent::Key(key)),
            Event::Resize(_, _) => Ok(AppEvent::Resize),
            _ => Ok(AppEvent::Tick),
        }
    } else {
        Ok(AppEvent::Tick)
    }
}
