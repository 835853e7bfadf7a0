// src/tui/mod.rs
//
// Terminal front end: a reader task feeding the history buffer, key handling
// and a redraw tick.

pub mod app;
pub mod feed;
mod ui;

use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::history::DataDirection;
use crate::logging::{init_file_logging, set_stderr_logging, stop_file_logging};
use crate::settings::{default_settings_path, load_settings};

use app::App;
use feed::{spawn_feed, FeedMessage};

/// Redraw check interval
const TICK_INTERVAL: Duration = Duration::from_millis(25);
/// Reads buffered between the feed task and the UI loop
const FEED_CHANNEL_SIZE: usize = 256;

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Byte source; stdin when unset
    pub input: Option<PathBuf>,
    /// Direction recorded for received bytes
    pub incoming_direction: DataDirection,
    /// Direction recorded for bytes typed into the send line
    pub send_direction: DataDirection,
    /// Settings file; the per-user default when unset
    pub settings_path: Option<PathBuf>,
    /// Overrides the settings' log directory
    pub log_dir: Option<PathBuf>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            input: None,
            incoming_direction: DataDirection::AToB,
            send_direction: DataDirection::PcToA,
            settings_path: None,
            log_dir: None,
        }
    }
}

/// Run the monitor until the user quits.
pub async fn run(options: MonitorOptions) -> Result<(), String> {
    let settings_path = match options.settings_path {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let settings = load_settings(&settings_path)?;

    let log_dir = options
        .log_dir
        .or_else(|| settings.log_dir.as_ref().map(PathBuf::from));
    if let Some(dir) = &log_dir {
        init_file_logging(dir)?;
    }

    tlog!(
        "[Tui] Starting: in {} out {}, settings {}",
        options.incoming_direction,
        options.send_direction,
        settings_path.display()
    );

    let mut app = App::new(
        settings,
        Some(settings_path),
        options.incoming_direction,
        options.send_direction,
    );

    let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_SIZE);
    let feed = spawn_feed(options.input, feed_tx);

    let mut terminal = setup_terminal()?;
    set_stderr_logging(false);

    let result = event_loop(&mut terminal, &mut app, feed_rx).await;

    feed.abort();
    set_stderr_logging(true);
    let restored = restore_terminal(&mut terminal);

    tlog!("[Tui] Stopped with {} rows in history", app.history.len());
    stop_file_logging();

    result.and(restored)
}

fn setup_terminal() -> Result<Tui, String> {
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;

    let mut stdout = std::io::stdout();
    if let Err(e) = crossterm::execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(format!("Failed to enter alternate screen: {}", e));
    }

    Terminal::new(CrosstermBackend::new(stdout))
        .map_err(|e| format!("Failed to create terminal: {}", e))
}

fn restore_terminal(terminal: &mut Tui) -> Result<(), String> {
    disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {}", e))?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| format!("Failed to leave alternate screen: {}", e))?;
    terminal
        .show_cursor()
        .map_err(|e| format!("Failed to show cursor: {}", e))
}

async fn event_loop(
    terminal: &mut Tui,
    app: &mut App,
    mut feed_rx: mpsc::Receiver<FeedMessage>,
) -> Result<(), String> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    let mut feed_open = true;

    draw(terminal, app)?;

    while app.running {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key);
                    if app.take_dirty() {
                        draw(terminal, app)?;
                    }
                }
                Some(Ok(Event::Resize(_, _))) => draw(terminal, app)?,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(format!("Failed to read terminal events: {}", e)),
                None => break,
            },
            msg = feed_rx.recv(), if feed_open => match msg {
                Some(msg) => app.on_feed(msg),
                None => feed_open = false,
            },
            _ = tick.tick() => {
                if app.take_dirty() {
                    draw(terminal, app)?;
                }
            }
        }
    }

    Ok(())
}

fn draw(terminal: &mut Tui, app: &App) -> Result<(), String> {
    terminal
        .draw(|frame| ui::draw(frame, app))
        .map(|_| ())
        .map_err(|e| format!("Failed to draw: {}", e))
}
