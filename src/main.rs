//! headline-feed — a news headlines reader for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//!                      snapshot()/notices  ┌──────────┐  draw()  ┌──────────┐
//! ┌──────────────┐ ──────────────────────► │  app.rs  │ ───────► │  ui.rs   │
//! │   sync/      │                         │ (state)  │          │ (render) │
//! │ (controller) │ ◄─── Command ───┐       └──────────┘          └──────────┘
//! └──────┬───────┘                 │            ▲
//!        │ probe / fetch / cache   │            │ handle_key_event()
//!        ▼                         │       ┌──────────┐
//!  net.rs  source/  cache.rs       └────── │ input.rs │
//!                                          └──────────┘
//! ```
//!
//! * **`source/`** — the `HeadlinesSource` trait, the `Article` type and the
//!   NewsAPI implementation.
//! * **`cache`** — the single-entry offline cache.
//! * **`net`** — the connectivity probe.
//! * **`sync`** — `FeedSyncController`: when to fetch, from where, and what
//!   the feed state becomes.
//! * **`app`** / **`ui`** / **`input`** — the terminal presentation.
//! * **`main`** — wires everything together: parse args, set up logging, the
//!   runtime and the terminal, and run the event loop.

mod app;
mod cache;
mod config;
mod error;
mod input;
mod net;
mod source;
mod sync;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use cache::{FileCache, LocalCache, MemoryCache};
use config::{Args, FeedConfig};
use input::Command;
use net::TcpProbe;
use source::NewsApiSource;
use sync::FeedSyncController;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Send logs to `path`, if given.  Without a log file nothing is installed:
/// the terminal belongs to the UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("headline_feed=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Hand a key-derived command to the controller.
///
/// Requests dropped by the in-flight guard are not retried; the user can
/// press the key again.
fn dispatch(controller: &FeedSyncController, command: Command) {
    match command {
        Command::Refresh(query) => {
            let _ = controller.refresh(query);
        }
        Command::SearchChanged(text) => controller.on_search_text_changed(text),
        Command::LoadMore => {
            let _ = controller.load_more();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // -- configuration -------------------------------------------------------
    let config = FeedConfig::try_from(Args::parse())?;
    init_logging(config.log_file.as_deref())?;

    // -- async runtime -------------------------------------------------------
    // One worker: loads and the debounce timer run on a single thread of
    // control while the UI loop below stays synchronous.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    // -- collaborators -------------------------------------------------------
    let source = NewsApiSource::new(
        config.endpoint.clone(),
        config.api_key.clone(),
        config.request_timeout,
    )?
    .with_default_sources(config.default_sources.clone());
    let probe = TcpProbe::for_endpoint(&config.endpoint, config.probe_timeout)
        .context("endpoint URL has no host to probe")?;
    let cache: Arc<dyn LocalCache> = if config.memory_cache {
        Arc::new(MemoryCache::new())
    } else {
        let cache = FileCache::new(&config.cache_dir);
        info!(dir = %cache.dir().display(), "using on-disk cache");
        Arc::new(cache)
    };
    info!(
        endpoint = %config.endpoint.host_str().unwrap_or_default(),
        page_size = config.page_size,
        "starting"
    );

    let (controller, mut notices) = FeedSyncController::new(
        config.sync_settings(),
        Arc::new(source),
        Arc::new(probe),
        cache,
    );
    let mut state_rx = controller.subscribe();

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    let _ = controller.initialize();
    app.apply_state(controller.snapshot());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Pick up notices and the latest feed state.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(notice) = notices.try_recv() {
            app.notify(&notice);
        }
        if state_rx.has_changed().unwrap_or(false) {
            let state = state_rx.borrow_and_update().clone();
            app.apply_state(state);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = input::handle_key_event(&mut app, key) {
                    dispatch(&controller, command);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // Anything still in flight finishes into the void.
    controller.shutdown();
    info!("exiting");
    Ok(())
}
