// src/history/mod.rs
//
// Line segmentation and bounded history for the monitor log.
//
// - chunker: splits byte buffers into row-sized pieces
// - buffer: stores rows, decides append-vs-new-row, evicts on overflow
// - render: hex and printable-text projections of a row

pub mod buffer;
pub mod chunker;
pub mod render;
pub mod types;

pub use buffer::{HistoryBuffer, HistoryEvent, HistoryObserver};
pub use render::{formatted_hex, formatted_text};
pub use types::{DataDirection, HistoryConfig, LogData, RowView};
