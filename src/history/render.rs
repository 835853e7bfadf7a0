// src/history/render.rs
//
// Display projections of a row's payload.
// Wrap positions come from the current configuration, not from how the row
// was split when it was stored.

use super::types::{HistoryConfig, LogData, RowView};

/// Bytes per visual group in the hex view
const HEX_GROUP: usize = 8;

/// Substitute for bytes outside printable ASCII
const PLACEHOLDER: char = '.';

/// Rendered width of a hex line holding `count` bytes.
pub fn hex_width(count: usize) -> usize {
    if count == 0 {
        0
    } else {
        count * 3 - 1 + (count - 1) / HEX_GROUP
    }
}

fn hex_line(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut line = String::with_capacity(hex_width(bytes.len()));

    for i in 0..bytes.len() {
        if i > 0 {
            line.push(' ');
            if i % HEX_GROUP == 0 {
                line.push(' ');
            }
        }
        line.push_str(&encoded[i * 2..i * 2 + 2]);
    }

    line
}

/// Hex view: `41 42 43`, an extra space every 8 bytes, a line break every
/// `wrap` bytes. The last line of a wrapped row is padded to full width so
/// the columns line up.
pub fn formatted_hex(data: &[u8], wrap: Option<usize>) -> String {
    let width = match wrap {
        Some(w) if w > 0 && data.len() > w => w,
        _ => return hex_line(data),
    };

    let full_width = hex_width(width);
    data.chunks(width)
        .map(|chunk| format!("{:<full_width$}", hex_line(chunk)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn printable(byte: u8) -> char {
    if (0x20..=0x7E).contains(&byte) {
        byte as char
    } else {
        PLACEHOLDER
    }
}

/// Text view: printable ASCII as-is, everything else as `.`, a line break
/// every `wrap` characters.
pub fn formatted_text(data: &[u8], wrap: Option<usize>) -> String {
    match wrap {
        Some(w) if w > 0 => data
            .chunks(w)
            .map(|chunk| chunk.iter().copied().map(printable).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => data.iter().copied().map(printable).collect(),
    }
}

/// Project a stored row for display under `config`.
pub fn render_row(row: &LogData, config: &HistoryConfig) -> RowView {
    let wrap = config.wrap_width();
    RowView {
        index: row.index,
        direction: row.direction,
        created_at: row.created_at,
        hex: formatted_hex(&row.data, wrap),
        text: formatted_text(&row.data, wrap),
    }
}
