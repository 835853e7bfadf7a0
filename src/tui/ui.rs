// src/tui/ui.rs
//
// Draws the history table, the status line and the send line.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{palette::tailwind::{SLATE, YELLOW}, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::history::render::hex_width;
use crate::history::HistoryBuffer;

use super::app::App;

const HEADER_STYLE: Style = Style::new().fg(SLATE.c200).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new().fg(YELLOW.c600).add_modifier(Modifier::BOLD);
const STATUS_STYLE: Style = Style::new().fg(SLATE.c400);

/// Width of the "#" column
const INDEX_WIDTH: u16 = 8;
/// Width of `HH:MM:SS.mmm`
const TIMESTAMP_WIDTH: u16 = 12;
const DIRECTION_WIDTH: u16 = 4;

pub fn draw(frame: &mut Frame, app: &App) {
    use Constraint::{Length, Min};
    let vertical = Layout::vertical([Min(0), Length(1), Length(3)]);
    let [table_area, status_area, input_area] = vertical.areas(frame.area());

    draw_history(frame, app, table_area);
    draw_status(frame, app, status_area);
    draw_input(frame, app, input_area);
}

/// Display lines taken by the row at `position`.
fn row_height(history: &HistoryBuffer, position: usize) -> usize {
    match (history.row(position), history.config().wrap_width()) {
        (Some(row), Some(width)) => row.data.len().div_ceil(width).max(1),
        _ => 1,
    }
}

/// Rows `[start, end)` that fit in `available` lines with `anchor` visible,
/// filling backwards from the anchor first and then forwards.
fn visible_range(
    len: usize,
    anchor: usize,
    available: usize,
    height: impl Fn(usize) -> usize,
) -> (usize, usize) {
    if len == 0 || available == 0 {
        return (0, 0);
    }

    let anchor = anchor.min(len - 1);
    let mut used = height(anchor);
    let mut start = anchor;
    while start > 0 && used + height(start - 1) <= available {
        start -= 1;
        used += height(start);
    }

    let mut end = anchor + 1;
    while end < len && used + height(end) <= available {
        used += height(end);
        end += 1;
    }

    (start, end)
}

fn draw_history(frame: &mut Frame, app: &App, area: Rect) {
    let history = &app.history;
    let settings = &app.settings;

    // Borders and header take three lines
    let available = area.height.saturating_sub(3) as usize;
    let (start, end) = match app.anchor_position() {
        Some(anchor) => visible_range(history.len(), anchor, available, |pos| {
            row_height(history, pos)
        }),
        None => (0, 0),
    };

    let mut header = vec![Cell::from("#")];
    let mut widths = vec![Constraint::Length(INDEX_WIDTH)];
    if settings.show_timestamp {
        header.push(Cell::from("Timestamp"));
        widths.push(Constraint::Length(TIMESTAMP_WIDTH));
    }
    header.push(Cell::from("Dir"));
    widths.push(Constraint::Length(DIRECTION_WIDTH));
    if settings.show_hex {
        header.push(Cell::from("Hex"));
        let hex_columns = match history.config().wrap_width() {
            Some(width) => Constraint::Length(hex_width(width) as u16),
            None => Constraint::Fill(2),
        };
        widths.push(hex_columns);
    }
    header.push(Cell::from("String"));
    widths.push(Constraint::Fill(1));

    let rows = (start..end).filter_map(|pos| {
        let view = history.row_view(pos)?;
        let height = row_height(history, pos) as u16;

        let mut cells = vec![Cell::from(view.index.to_string())];
        if settings.show_timestamp {
            cells.push(Cell::from(view.created_at.format("%H:%M:%S%.3f").to_string()));
        }
        cells.push(Cell::from(view.direction.label()));
        if settings.show_hex {
            cells.push(Cell::from(view.hex));
        }
        cells.push(Cell::from(view.text));

        Some(Row::new(cells).height(height))
    });

    let config = history.config();
    let off = |enabled: bool| if enabled { "" } else { " (off)" };
    let title = format!(
        " SerialTAP | {} rows | chunk {}{} | gap {}{} ms | cap {} ",
        history.len(),
        config.chunk_length,
        off(config.chunk_by_count_enabled),
        config.chunk_gap_millis,
        off(config.chunk_by_duration_enabled),
        config.capacity,
    );

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(HEADER_STYLE))
        .row_highlight_style(SELECTED_STYLE)
        .block(Block::new().borders(Borders::ALL).title(title));

    let mut state = TableState::default();
    if let (Some(_), Some(anchor)) = (app.selected, app.anchor_position()) {
        state.select(Some(anchor - start));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let follow = if app.settings.autoscroll { "follow" } else { "paused" };
    let mut text = format!(
        " in {} | out {} | {} | feed {}",
        app.incoming_direction, app.send_direction, follow, app.feed_state
    );
    if !app.status.is_empty() {
        text.push_str(" | ");
        text.push_str(&app.status);
    }
    frame.render_widget(Paragraph::new(Line::from(text)).style(STATUS_STYLE), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.editing {
        Some(mode) => format!(
            " Send {} ({}) | Enter send, Tab mode, Esc cancel ",
            app.send_direction,
            mode.label()
        ),
        None => " i text, h hex, q quit ".to_string(),
    };
    let style = if app.editing.is_some() { SELECTED_STYLE } else { STATUS_STYLE };

    let input = Paragraph::new(app.input.as_str())
        .block(Block::new().borders(Borders::ALL).title(title).border_style(style));
    frame.render_widget(input, area);

    if app.editing.is_some() {
        let x = area.x + 1 + app.input.chars().count() as u16;
        let max_x = area.x + area.width.saturating_sub(2);
        frame.set_cursor_position((x.min(max_x), area.y + 1));
    }
}
