// src/tui/app.rs
//
// Monitor state and key handling. Owns the history buffer; the UI loop feeds
// it bytes and key events and redraws when it reports a change.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::history::{DataDirection, HistoryBuffer};
use crate::input::{parse_outgoing, InputMode};
use crate::settings::{
    save_settings, AppSettings, CAPACITY_RANGE, CHUNK_GAP_RANGE, CHUNK_LENGTH_RANGE,
};

use super::feed::FeedMessage;

/// Gap adjustment per key press (ms)
const GAP_STEP_MS: u64 = 10;
/// Rows moved by PageUp / PageDown
const PAGE_ROWS: usize = 10;

pub struct App {
    pub history: HistoryBuffer,
    pub settings: AppSettings,
    settings_path: Option<PathBuf>,
    pub incoming_direction: DataDirection,
    pub send_direction: DataDirection,
    /// Sequence index of the selected row while autoscroll is off
    pub selected: Option<u64>,
    /// Send line contents
    pub input: String,
    /// `Some` while the send line has focus
    pub editing: Option<InputMode>,
    pub status: String,
    pub feed_state: String,
    pub running: bool,
    dirty: Arc<AtomicBool>,
}

impl App {
    pub fn new(
        settings: AppSettings,
        settings_path: Option<PathBuf>,
        incoming_direction: DataDirection,
        send_direction: DataDirection,
    ) -> Self {
        let mut history = HistoryBuffer::new(settings.history_config());

        let dirty = Arc::new(AtomicBool::new(true));
        let flag = dirty.clone();
        history.add_observer(move |_| flag.store(true, Ordering::Relaxed));

        App {
            history,
            settings,
            settings_path,
            incoming_direction,
            send_direction,
            selected: None,
            input: String::new(),
            editing: None,
            status: String::new(),
            feed_state: "live".to_string(),
            running: true,
            dirty,
        }
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.mark_dirty();
    }

    // ------------------------------------------------------------------------
    // Feed
    // ------------------------------------------------------------------------

    pub fn on_feed(&mut self, msg: FeedMessage) {
        match msg {
            FeedMessage::Bytes(bytes) => self.history.append(self.incoming_direction, &bytes),
            FeedMessage::Ended(reason) => {
                self.feed_state = reason;
                self.mark_dirty();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Position of the row the view is anchored on, if any.
    pub fn anchor_position(&self) -> Option<usize> {
        if self.history.is_empty() {
            return None;
        }
        match self.selected {
            // A selected row that has been evicted snaps to the oldest row
            Some(index) => Some(self.history.position_of(index).unwrap_or(0)),
            None if self.settings.autoscroll => Some(self.history.len() - 1),
            // Paused with nothing selected: stay on the oldest row
            None => Some(0),
        }
    }

    fn select_position(&mut self, position: usize) {
        if let Some(row) = self.history.row(position) {
            self.selected = Some(row.index);
            self.settings.autoscroll = false;
            self.mark_dirty();
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(current) = self.anchor_position() else {
            return;
        };
        let last = self.history.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        self.select_position(target);
    }

    fn follow_newest(&mut self) {
        self.selected = None;
        self.settings.autoscroll = true;
        self.mark_dirty();
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }

        match self.editing {
            Some(mode) => self.handle_edit_key(key, mode),
            None => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('c') => {
                self.history.clear();
                self.selected = None;
                self.set_status("History cleared");
            }
            KeyCode::Char('x') => {
                self.settings.show_hex = !self.settings.show_hex;
                self.mark_dirty();
            }
            KeyCode::Char('t') => {
                self.settings.show_timestamp = !self.settings.show_timestamp;
                self.mark_dirty();
            }
            KeyCode::Char('a') => {
                if self.settings.autoscroll {
                    let anchor = self.anchor_position();
                    self.settings.autoscroll = false;
                    if let Some(position) = anchor {
                        self.select_position(position);
                    }
                    self.mark_dirty();
                } else {
                    self.follow_newest();
                }
            }
            KeyCode::Char('n') => {
                let enabled = !self.history.config().chunk_by_count_enabled;
                self.history.set_chunk_by_count_enabled(enabled);
                self.config_changed();
            }
            KeyCode::Char('d') => {
                let enabled = !self.history.config().chunk_by_duration_enabled;
                self.history.set_chunk_by_duration_enabled(enabled);
                self.config_changed();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_chunk_length(1),
            KeyCode::Char('-') => self.adjust_chunk_length(-1),
            KeyCode::Char(']') => self.adjust_gap(GAP_STEP_MS as i64),
            KeyCode::Char('[') => self.adjust_gap(-(GAP_STEP_MS as i64)),
            KeyCode::Char('>') => {
                let capacity = self.history.config().capacity.saturating_mul(2);
                self.set_capacity(capacity);
            }
            KeyCode::Char('<') => {
                let capacity = self.history.config().capacity / 2;
                self.set_capacity(capacity);
            }
            KeyCode::Char('i') => {
                self.editing = Some(InputMode::Text);
                self.mark_dirty();
            }
            KeyCode::Char('h') => {
                self.editing = Some(InputMode::Hex);
                self.mark_dirty();
            }
            KeyCode::Char('s') => self.save(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-(PAGE_ROWS as isize)),
            KeyCode::PageDown => self.move_selection(PAGE_ROWS as isize),
            KeyCode::Home | KeyCode::Char('g') => self.select_position(0),
            KeyCode::End | KeyCode::Char('G') => self.follow_newest(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent, mode: InputMode) {
        match key.code {
            KeyCode::Esc => {
                self.editing = None;
                self.input.clear();
            }
            KeyCode::Enter => self.send_input(mode),
            KeyCode::Tab => {
                self.editing = Some(match mode {
                    InputMode::Text => InputMode::Hex,
                    InputMode::Hex => InputMode::Text,
                });
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => return,
        }
        self.mark_dirty();
    }

    fn send_input(&mut self, mode: InputMode) {
        match parse_outgoing(&self.input, mode) {
            Ok(bytes) => {
                self.history.append(self.send_direction, &bytes);
                self.input.clear();
                self.status.clear();
            }
            Err(e) => self.set_status(e),
        }
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    fn adjust_chunk_length(&mut self, delta: isize) {
        let current = self.history.config().chunk_length;
        let target = current
            .saturating_add_signed(delta)
            .clamp(*CHUNK_LENGTH_RANGE.start(), *CHUNK_LENGTH_RANGE.end());
        self.history.set_chunk_length(target);
        self.config_changed();
    }

    fn adjust_gap(&mut self, delta: i64) {
        let current = self.history.config().chunk_gap_millis;
        let target = current
            .saturating_add_signed(delta)
            .clamp(*CHUNK_GAP_RANGE.start(), *CHUNK_GAP_RANGE.end());
        self.history.set_chunk_gap_millis(target);
        self.config_changed();
    }

    fn set_capacity(&mut self, capacity: usize) {
        let target = capacity.clamp(*CAPACITY_RANGE.start(), *CAPACITY_RANGE.end());
        self.history.set_capacity(target);
        self.config_changed();
    }

    fn config_changed(&mut self) {
        let config = self.history.config().clone();
        self.settings.update_from_history(&config);
        self.mark_dirty();
    }

    fn save(&mut self) {
        let Some(path) = self.settings_path.clone() else {
            self.set_status("No settings file to save to");
            return;
        };
        match save_settings(&path, &self.settings) {
            Ok(()) => {
                tlog!("[Tui] Saved settings to {}", path.display());
                self.set_status(format!("Saved settings to {}", path.display()));
            }
            Err(e) => {
                tlog!("[Tui] {}", e);
                self.set_status(e);
            }
        }
    }
}
