// src/history/buffer.rs
//
// Capacity-bounded history of log rows.
// Decides whether incoming bytes continue the last row or start new ones,
// evicts the oldest rows on overflow and notifies observers of every change.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use super::chunker::{split_by_length, split_data};
use super::render::render_row;
use super::types::{DataDirection, HistoryConfig, LogData, RowView};

// ============================================================================
// Change Notification
// ============================================================================

/// Change to the row list. Positions refer to the list after the change,
/// except for `RowsRemoved` which refers to the list before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEvent {
    RowsInserted { first: usize, last: usize },
    RowChanged { row: usize },
    RowsRemoved { first: usize, last: usize },
    Reset,
}

pub type HistoryObserver = Box<dyn FnMut(&HistoryEvent) + Send>;

// ============================================================================
// History Buffer
// ============================================================================

pub struct HistoryBuffer {
    config: HistoryConfig,
    rows: VecDeque<LogData>,
    /// Index given to the next created row
    next_index: u64,
    /// Whether the last appended byte was a line terminator
    ended_at_newline: bool,
    observers: Vec<HistoryObserver>,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl std::fmt::Debug for HistoryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryBuffer")
            .field("config", &self.config)
            .field("rows", &self.rows.len())
            .field("next_index", &self.next_index)
            .field("ended_at_newline", &self.ended_at_newline)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl HistoryBuffer {
    /// Create an empty history. Zero-valued limits are raised to 1.
    pub fn new(config: HistoryConfig) -> Self {
        if !config.is_valid() {
            tlog!("[History] Invalid configuration {:?}, raising zero limits to 1", config);
        }
        let config = HistoryConfig {
            capacity: config.capacity.max(1),
            chunk_length: config.chunk_length.max(1),
            chunk_gap_millis: config.chunk_gap_millis.max(1),
            ..config
        };

        HistoryBuffer {
            rows: VecDeque::with_capacity(config.capacity.min(1024)),
            config,
            next_index: 0,
            ended_at_newline: true,
            observers: Vec::new(),
        }
    }

    /// Register a callback invoked after every change to the row list.
    pub fn add_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&HistoryEvent) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, event: HistoryEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<&LogData> {
        self.rows.get(position)
    }

    pub fn rows(&self) -> impl Iterator<Item = &LogData> {
        self.rows.iter()
    }

    /// Render the row at `position` with the current wrap settings.
    pub fn row_view(&self, position: usize) -> Option<RowView> {
        self.rows.get(position).map(|row| render_row(row, &self.config))
    }

    /// Current position of the row with sequence `index`, if still present.
    pub fn position_of(&self, index: u64) -> Option<usize> {
        self.rows.binary_search_by_key(&index, |row| row.index).ok()
    }

    pub fn ended_at_newline(&self) -> bool {
        self.ended_at_newline
    }

    // ------------------------------------------------------------------------
    // Appending
    // ------------------------------------------------------------------------

    /// Append bytes received now.
    pub fn append(&mut self, direction: DataDirection, data: &[u8]) {
        self.append_at(direction, data, Local::now());
    }

    /// Append bytes received at `now`.
    pub fn append_at(&mut self, direction: DataDirection, data: &[u8], now: DateTime<Local>) {
        if data.is_empty() {
            return;
        }

        if self.starts_new_row(direction, now) {
            let pieces = split_data(
                data,
                self.config.chunk_by_count_enabled,
                self.config.chunk_length,
                self.config.chunk_length,
            );
            self.push_rows(direction, now, pieces);
        } else {
            self.continue_last_row(direction, data, now);
        }

        self.ended_at_newline = data.last() == Some(&b'\n');
    }

    fn starts_new_row(&self, direction: DataDirection, now: DateTime<Local>) -> bool {
        let Some(last) = self.rows.back() else {
            return true;
        };

        if self.ended_at_newline || last.direction != direction {
            return true;
        }

        if self.config.chunk_by_duration_enabled {
            let gap = i64::try_from(self.config.chunk_gap_millis).unwrap_or(i64::MAX);
            if (now - last.last_append_at).num_milliseconds() > gap {
                return true;
            }
        }

        false
    }

    fn continue_last_row(&mut self, direction: DataDirection, data: &[u8], now: DateTime<Local>) {
        if !self.config.chunk_by_count_enabled {
            self.extend_last_row(data, now);
            return;
        }

        let chunk_length = self.config.chunk_length;
        let last_len = self.rows.back().map_or(0, |row| row.data.len());
        // Rows can be longer than the chunk length if it shrank since they were stored
        let remaining = chunk_length.saturating_sub(last_len);

        let pieces = split_by_length(data, remaining, chunk_length);
        if remaining == chunk_length {
            self.push_rows(direction, now, pieces);
            return;
        }

        let mut pieces = pieces.into_iter();
        if let Some(first) = pieces.next() {
            if !first.is_empty() {
                self.extend_last_row(&first, now);
            }
        }
        self.push_rows(direction, now, pieces.collect());
    }

    fn extend_last_row(&mut self, data: &[u8], now: DateTime<Local>) {
        let Some(last) = self.rows.back_mut() else {
            return;
        };
        last.data.extend_from_slice(data);
        last.last_append_at = now;

        let row = self.rows.len() - 1;
        self.notify(HistoryEvent::RowChanged { row });
    }

    /// Insert one row per piece, evicting old rows first so the capacity is
    /// never exceeded. When there are more pieces than capacity only the
    /// newest pieces are stored; the rest still consume indices.
    fn push_rows(&mut self, direction: DataDirection, now: DateTime<Local>, pieces: Vec<Vec<u8>>) {
        if pieces.is_empty() {
            return;
        }

        let capacity = self.config.capacity;
        let skipped = pieces.len().saturating_sub(capacity);
        self.next_index += skipped as u64;

        let incoming = pieces.len() - skipped;
        let overflow = (self.rows.len() + incoming).saturating_sub(capacity);
        self.evict_oldest(overflow);

        let first = self.rows.len();
        for data in pieces.into_iter().skip(skipped) {
            self.rows
                .push_back(LogData::new(self.next_index, direction, now, data));
            self.next_index += 1;
        }

        let last = self.rows.len() - 1;
        self.notify(HistoryEvent::RowsInserted { first, last });
    }

    fn evict_oldest(&mut self, count: usize) {
        let count = count.min(self.rows.len());
        if count == 0 {
            return;
        }

        self.rows.drain(..count);
        self.notify(HistoryEvent::RowsRemoved {
            first: 0,
            last: count - 1,
        });
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Change the row limit, evicting the oldest rows when shrinking.
    /// Returns whether the capacity changed.
    pub fn set_capacity(&mut self, capacity: usize) -> bool {
        if capacity == 0 {
            tlog!("[History] Rejected capacity 0 (minimum is 1)");
            return false;
        }
        if capacity == self.config.capacity {
            return false;
        }

        self.config.capacity = capacity;
        let overflow = self.rows.len().saturating_sub(capacity);
        self.evict_oldest(overflow);

        tlog!(
            "[History] Capacity set to {} ({} rows evicted)",
            capacity, overflow
        );
        true
    }

    pub fn set_chunk_length(&mut self, chunk_length: usize) -> bool {
        if chunk_length == 0 {
            tlog!("[History] Rejected chunk length 0");
            return false;
        }
        if chunk_length == self.config.chunk_length {
            return false;
        }
        self.config.chunk_length = chunk_length;
        true
    }

    pub fn set_chunk_by_count_enabled(&mut self, enabled: bool) -> bool {
        if enabled == self.config.chunk_by_count_enabled {
            return false;
        }
        self.config.chunk_by_count_enabled = enabled;
        true
    }

    pub fn set_chunk_gap_millis(&mut self, gap_millis: u64) -> bool {
        if gap_millis == 0 {
            tlog!("[History] Rejected chunk gap of 0 ms");
            return false;
        }
        if gap_millis == self.config.chunk_gap_millis {
            return false;
        }
        self.config.chunk_gap_millis = gap_millis;
        true
    }

    pub fn set_chunk_by_duration_enabled(&mut self, enabled: bool) -> bool {
        if enabled == self.config.chunk_by_duration_enabled {
            return false;
        }
        self.config.chunk_by_duration_enabled = enabled;
        true
    }

    /// Apply every field of `config` through its setter.
    /// Returns whether anything changed.
    pub fn apply_config(&mut self, config: &HistoryConfig) -> bool {
        // Non-short-circuiting so every setter runs
        self.set_chunk_length(config.chunk_length)
            | self.set_chunk_by_count_enabled(config.chunk_by_count_enabled)
            | self.set_chunk_gap_millis(config.chunk_gap_millis)
            | self.set_chunk_by_duration_enabled(config.chunk_by_duration_enabled)
            | self.set_capacity(config.capacity)
    }

    /// Drop every row and restart indices from zero.
    pub fn clear(&mut self) {
        let removed = self.rows.len();
        self.rows.clear();
        self.next_index = 0;
        self.ended_at_newline = true;
        self.notify(HistoryEvent::Reset);

        tlog!("[History] Cleared {} rows", removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const A_TO_B: DataDirection = DataDirection::AToB;
    const B_TO_A: DataDirection = DataDirection::BToA;

    fn config(chunk_length: usize, count: bool, gap_millis: u64, duration: bool) -> HistoryConfig {
        HistoryConfig {
            capacity: 100,
            chunk_by_count_enabled: count,
            chunk_length,
            chunk_by_duration_enabled: duration,
            chunk_gap_millis: gap_millis,
        }
    }

    fn payloads(history: &HistoryBuffer) -> Vec<String> {
        history
            .rows()
            .map(|row| String::from_utf8_lossy(&row.data).into_owned())
            .collect()
    }

    fn indices(history: &HistoryBuffer) -> Vec<u64> {
        history.rows().map(|row| row.index).collect()
    }

    fn ms(millis: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(millis)
    }

    fn recorder(history: &mut HistoryBuffer) -> Arc<Mutex<Vec<HistoryEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        history.add_observer(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_empty_append_is_noop() {
        let mut history = HistoryBuffer::default();
        history.append(A_TO_B, b"");
        assert!(history.is_empty());
        assert!(history.ended_at_newline());
    }

    #[test]
    fn test_chunk_length_splits_new_rows() {
        let mut history = HistoryBuffer::new(config(4, true, 500, false));
        history.append(A_TO_B, b"abcdefgh");
        assert_eq!(payloads(&history), vec!["abcd", "efgh"]);
        assert_eq!(indices(&history), vec![0, 1]);
    }

    #[test]
    fn test_continuation_tops_up_last_row() {
        let mut history = HistoryBuffer::new(config(4, true, 500, false));
        history.append(A_TO_B, b"ab");
        history.append(A_TO_B, b"cdefgh");
        assert_eq!(payloads(&history), vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_continuation_when_last_row_full() {
        let mut history = HistoryBuffer::new(config(4, true, 500, false));
        history.append(A_TO_B, b"abcd");
        history.append(A_TO_B, b"efghij");
        assert_eq!(payloads(&history), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_continuation_newline_in_middle() {
        let mut history = HistoryBuffer::new(config(8, true, 500, false));
        history.append(A_TO_B, b"ab");
        history.append(A_TO_B, b"cd\nef");
        assert_eq!(payloads(&history), vec!["abcd", "ef"]);
        assert!(!history.ended_at_newline());
    }

    #[test]
    fn test_continuation_without_count_chunking_is_verbatim() {
        let mut history = HistoryBuffer::new(config(4, false, 500, false));
        history.append(A_TO_B, b"abcdef");
        history.append(A_TO_B, b"gh\nij");
        assert_eq!(payloads(&history), vec!["abcdefgh\nij"]);
    }

    #[test]
    fn test_new_rows_without_count_chunking_split_on_newline_only() {
        let mut history = HistoryBuffer::new(config(4, false, 500, false));
        history.append(A_TO_B, b"abcdefghij\nkl");
        assert_eq!(payloads(&history), vec!["abcdefghij", "kl"]);
    }

    #[test]
    fn test_newline_round_trip_without_count_chunking() {
        let input = b"first line\nsecond\n\nfourth, longer than usual";
        let mut history = HistoryBuffer::new(config(4, false, 500, false));
        history.append(A_TO_B, input);

        let joined = history
            .rows()
            .map(|row| row.data.clone())
            .collect::<Vec<_>>()
            .join(&b'\n');
        assert_eq!(joined, input.to_vec());
    }

    #[test]
    fn test_trailing_newline_starts_next_row() {
        let mut history = HistoryBuffer::new(config(16, true, 500, false));
        history.append(A_TO_B, b"hello\n");
        assert!(history.ended_at_newline());
        history.append(A_TO_B, b"world");
        assert_eq!(payloads(&history), vec!["hello", "world"]);
        assert!(!history.ended_at_newline());
    }

    #[test]
    fn test_partial_lines_join_until_newline() {
        let mut history = HistoryBuffer::new(config(16, true, 500, false));
        history.append(A_TO_B, b"hel");
        history.append(A_TO_B, b"lo\n");
        history.append(A_TO_B, b"again");
        assert_eq!(payloads(&history), vec!["hello", "again"]);
    }

    #[test]
    fn test_direction_change_forces_new_row() {
        let mut history = HistoryBuffer::default();
        history.append(A_TO_B, b"ab");
        history.append(B_TO_A, b"cd");
        assert_eq!(history.len(), 2);
        assert_eq!(history.row(0).unwrap().direction, A_TO_B);
        assert_eq!(history.row(1).unwrap().direction, B_TO_A);
    }

    #[test]
    fn test_duration_gap_starts_new_row() {
        let mut history = HistoryBuffer::new(config(16, true, 500, true));
        let t0 = Local::now();
        history.append_at(A_TO_B, b"ab", t0);
        history.append_at(A_TO_B, b"cd", t0 + ms(400));
        history.append_at(A_TO_B, b"ef", t0 + ms(1000));
        assert_eq!(payloads(&history), vec!["abcd", "ef"]);
    }

    #[test]
    fn test_gap_measured_from_last_append() {
        let mut history = HistoryBuffer::new(config(16, true, 500, true));
        let t0 = Local::now();
        history.append_at(A_TO_B, b"a", t0);
        history.append_at(A_TO_B, b"b", t0 + ms(400));
        history.append_at(A_TO_B, b"c", t0 + ms(800));
        assert_eq!(payloads(&history), vec!["abc"]);

        let row = history.row(0).unwrap();
        assert_eq!(row.created_at, t0);
        assert_eq!(row.last_append_at, t0 + ms(800));
    }

    #[test]
    fn test_gap_equal_to_limit_continues() {
        let mut history = HistoryBuffer::new(config(16, true, 500, true));
        let t0 = Local::now();
        history.append_at(A_TO_B, b"a", t0);
        history.append_at(A_TO_B, b"b", t0 + ms(500));
        assert_eq!(payloads(&history), vec!["ab"]);
    }

    #[test]
    fn test_duration_ignored_when_disabled() {
        let mut history = HistoryBuffer::new(config(16, true, 500, false));
        let t0 = Local::now();
        history.append_at(A_TO_B, b"ab", t0);
        history.append_at(A_TO_B, b"cd", t0 + ms(10_000));
        assert_eq!(payloads(&history), vec!["abcd"]);
    }

    #[test]
    fn test_duration_takes_precedence_over_top_up() {
        let mut history = HistoryBuffer::new(config(4, true, 100, true));
        let t0 = Local::now();
        history.append_at(A_TO_B, b"ab", t0);
        history.append_at(A_TO_B, b"cdefgh", t0 + ms(200));
        assert_eq!(payloads(&history), vec!["ab", "cdef", "gh"]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 5,
            ..config(2, true, 500, false)
        });
        for i in 0..50u8 {
            let direction = if i % 2 == 0 { A_TO_B } else { B_TO_A };
            history.append(direction, &[i, i, i]);
            assert!(history.len() <= 5);
        }
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_eviction_is_fifo_and_indices_survive() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 3,
            ..config(2, true, 500, false)
        });
        history.append(A_TO_B, b"aabbcc");
        history.append(B_TO_A, b"ddee");
        assert_eq!(payloads(&history), vec!["cc", "dd", "ee"]);
        assert_eq!(indices(&history), vec![2, 3, 4]);
    }

    #[test]
    fn test_more_pieces_than_capacity_keeps_newest() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 2,
            ..config(1, true, 500, false)
        });
        history.append(A_TO_B, b"x");
        history.append(B_TO_A, b"abcde");
        assert_eq!(payloads(&history), vec!["d", "e"]);
        assert_eq!(indices(&history), vec![4, 5]);
    }

    #[test]
    fn test_indices_strictly_increasing() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 4,
            ..config(3, true, 500, false)
        });
        for chunk in [&b"ab"[..], b"cdefg\nh", b"ijklmnop", b"q\n", b"rs"] {
            history.append(A_TO_B, chunk);
            let idx = indices(&history);
            assert!(idx.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_set_capacity_shrink_keeps_newest() {
        let mut history = HistoryBuffer::new(config(1, true, 500, false));
        history.append(A_TO_B, b"abcdef");
        assert!(history.set_capacity(2));
        assert_eq!(payloads(&history), vec!["e", "f"]);
        assert_eq!(indices(&history), vec![4, 5]);
    }

    #[test]
    fn test_set_capacity_rejects_zero_and_unchanged() {
        let mut history = HistoryBuffer::new(config(1, true, 500, false));
        history.append(A_TO_B, b"abc");
        assert!(!history.set_capacity(0));
        assert!(!history.set_capacity(100));
        assert_eq!(history.config().capacity, 100);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_set_capacity_grow_never_evicts() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 3,
            ..config(1, true, 500, false)
        });
        history.append(A_TO_B, b"abc");
        assert!(history.set_capacity(10));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_clear_resets_indices_and_newline_flag() {
        let mut history = HistoryBuffer::new(config(4, true, 500, false));
        history.append(A_TO_B, b"abcdefgh");
        history.append(A_TO_B, b"ij");
        history.clear();
        assert!(history.is_empty());
        assert!(history.ended_at_newline());

        history.append(A_TO_B, b"k");
        assert_eq!(indices(&history), vec![0]);
    }

    #[test]
    fn test_config_setters_validate() {
        let mut history = HistoryBuffer::default();
        assert!(!history.set_chunk_length(0));
        assert!(!history.set_chunk_gap_millis(0));
        assert!(!history.set_chunk_length(16));
        assert!(history.set_chunk_length(8));
        assert!(history.set_chunk_gap_millis(50));
        assert!(history.set_chunk_by_count_enabled(false));
        assert!(!history.set_chunk_by_count_enabled(false));
        assert!(history.set_chunk_by_duration_enabled(false));
        assert_eq!(
            history.config(),
            &HistoryConfig {
                capacity: 10_000,
                chunk_by_count_enabled: false,
                chunk_length: 8,
                chunk_by_duration_enabled: false,
                chunk_gap_millis: 50,
            }
        );
    }

    #[test]
    fn test_new_raises_zero_limits() {
        let history = HistoryBuffer::new(HistoryConfig {
            capacity: 0,
            chunk_length: 0,
            chunk_gap_millis: 0,
            ..HistoryConfig::default()
        });
        assert!(history.config().is_valid());
    }

    #[test]
    fn test_config_change_applies_to_next_append_only() {
        let mut history = HistoryBuffer::new(config(4, true, 500, false));
        history.append(A_TO_B, b"abcdefgh\n");
        history.set_chunk_length(2);
        history.append(A_TO_B, b"ijkl");
        assert_eq!(payloads(&history), vec!["abcd", "efgh", "ij", "kl"]);
        // Stored rows are re-rendered, not re-chunked
        assert_eq!(history.row_view(0).unwrap().text, "ab\ncd");
    }

    #[test]
    fn test_shrunk_chunk_length_with_longer_last_row() {
        let mut history = HistoryBuffer::new(config(8, true, 500, false));
        history.append(A_TO_B, b"abcdef");
        history.set_chunk_length(4);
        history.append(A_TO_B, b"ghij");
        assert_eq!(payloads(&history), vec!["abcdef", "ghij"]);
    }

    #[test]
    fn test_apply_config() {
        let mut history = HistoryBuffer::new(config(1, true, 500, false));
        history.append(A_TO_B, b"abcdef");
        let changed = history.apply_config(&HistoryConfig {
            capacity: 3,
            chunk_by_count_enabled: true,
            chunk_length: 4,
            chunk_by_duration_enabled: true,
            chunk_gap_millis: 250,
        });
        assert!(changed);
        assert_eq!(history.len(), 3);
        assert_eq!(history.config().chunk_length, 4);
        let unchanged = history.config().clone();
        assert!(!history.apply_config(&unchanged));
    }

    #[test]
    fn test_observer_events() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 3,
            ..config(2, true, 500, false)
        });
        let events = recorder(&mut history);

        history.append(A_TO_B, b"a");
        history.append(A_TO_B, b"bcd");
        history.append(A_TO_B, b"efg");
        history.clear();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                HistoryEvent::RowsInserted { first: 0, last: 0 },
                HistoryEvent::RowChanged { row: 0 },
                HistoryEvent::RowsInserted { first: 1, last: 1 },
                // "cd" is already full, so nothing is topped up
                HistoryEvent::RowsRemoved { first: 0, last: 0 },
                HistoryEvent::RowsInserted { first: 1, last: 2 },
                HistoryEvent::Reset,
            ]
        );
    }

    #[test]
    fn test_position_of_follows_eviction() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            capacity: 3,
            ..config(1, true, 500, false)
        });
        history.append(A_TO_B, b"abc");
        assert_eq!(history.position_of(2), Some(2));

        history.append(A_TO_B, b"de");
        assert_eq!(history.position_of(0), None);
        assert_eq!(history.position_of(2), Some(0));
        assert_eq!(history.position_of(4), Some(2));
        assert_eq!(history.position_of(9), None);
    }

    #[test]
    fn test_row_view() {
        let mut history = HistoryBuffer::new(config(16, true, 500, false));
        history.append(B_TO_A, &[0x41, 0x01, 0x42]);
        let view = history.row_view(0).unwrap();
        assert_eq!(view.index, 0);
        assert_eq!(view.direction, B_TO_A);
        assert_eq!(view.hex, "41 01 42");
        assert_eq!(view.text, "A.B");
        assert!(history.row_view(1).is_none());
    }
}
