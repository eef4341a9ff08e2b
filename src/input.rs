//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] changes and, where the feed itself has
//! to change, to a [`Command`] for the sync controller.  Adding a new
//! keybinding is a single match arm.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for local actions, or a [`Command`] variant for
//!    anything the controller must do (and handle it in `main.rs`).
//! 2. Add a `KeyCode` match arm in the handler for the right [`Mode`].
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{App, Mode};

/// Something the sync controller has to do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reload page 1 for this query (refresh key or search submit).
    Refresh(String),
    /// The search box changed; debounce, then search.
    SearchChanged(String),
    /// The selection is near the end of the list.
    LoadMore,
}

/// Process a single key event.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match app.mode {
        Mode::Browse => handle_browse_key(app, key.code),
        Mode::Search => handle_search_key(app, key.code),
    }
}

fn handle_browse_key(app: &mut App, code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next();
            return load_more_if_near_end(app);
        }
        KeyCode::End | KeyCode::Char('G') => {
            app.select_last();
            return load_more_if_near_end(app);
        }
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::Char('/') => app.mode = Mode::Search,
        KeyCode::Char('r') => return Some(Command::Refresh(app.feed.search_text.clone())),
        _ => {}
    }
    None
}

fn handle_search_key(app: &mut App, code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Enter => {
            app.mode = Mode::Browse;
            Some(Command::Refresh(app.feed.search_text.clone()))
        }
        KeyCode::Esc => {
            app.mode = Mode::Browse;
            None
        }
        KeyCode::Backspace => {
            app.feed.search_text.pop()?;
            Some(Command::SearchChanged(app.feed.search_text.clone()))
        }
        KeyCode::Char(c) => {
            app.feed.search_text.push(c);
            Some(Command::SearchChanged(app.feed.search_text.clone()))
        }
        _ => None,
    }
}

fn load_more_if_near_end(app: &App) -> Option<Command> {
    (app.near_end() && app.feed.has_more && !app.feed.is_fetching).then_some(Command::LoadMore)
}
