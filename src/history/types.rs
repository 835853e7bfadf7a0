// src/history/types.rs
//
// Row and configuration types shared by the chunker, history buffer and renderer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Direction
// ============================================================================

/// Which logical link (and which way) produced a run of bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDirection {
    AToB,
    BToA,
    AToPc,
    BToPc,
    PcToA,
    PcToB,
}

impl DataDirection {
    pub const ALL: [DataDirection; 6] = [
        DataDirection::AToB,
        DataDirection::BToA,
        DataDirection::AToPc,
        DataDirection::BToPc,
        DataDirection::PcToA,
        DataDirection::PcToB,
    ];

    /// Four-character label shown in the "Dir" column.
    pub fn label(&self) -> &'static str {
        match self {
            DataDirection::AToB => "A->B",
            DataDirection::BToA => "B->A",
            DataDirection::AToPc => "A-> ",
            DataDirection::BToPc => "B-> ",
            DataDirection::PcToA => " ->A",
            DataDirection::PcToB => " ->B",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DataDirection::AToB => "a_to_b",
            DataDirection::BToA => "b_to_a",
            DataDirection::AToPc => "a_to_pc",
            DataDirection::BToPc => "b_to_pc",
            DataDirection::PcToA => "pc_to_a",
            DataDirection::PcToB => "pc_to_b",
        }
    }
}

impl fmt::Display for DataDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DataDirection {
    type Err = String;

    /// Accepts the variant name in any case (`a_to_b`, `A_TO_B`, `a-to-b`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        DataDirection::ALL
            .into_iter()
            .find(|d| d.name() == normalized)
            .ok_or_else(|| format!("Unknown direction '{}'", s))
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One row of the history log.
#[derive(Clone, Debug)]
pub struct LogData {
    /// Running index, never reused until the history is cleared
    pub index: u64,
    pub direction: DataDirection,
    pub created_at: DateTime<Local>,
    /// Refreshed every time bytes are appended to this row
    pub last_append_at: DateTime<Local>,
    pub data: Vec<u8>,
}

impl LogData {
    pub fn new(index: u64, direction: DataDirection, now: DateTime<Local>, data: Vec<u8>) -> Self {
        LogData {
            index,
            direction,
            created_at: now,
            last_append_at: now,
            data,
        }
    }

    /// Creation time as shown in the "Timestamp" column.
    pub fn timestamp_string(&self) -> String {
        self.created_at.format("%H:%M:%S%.3f").to_string()
    }
}

/// A row projected for display.
#[derive(Clone, Debug, PartialEq)]
pub struct RowView {
    pub index: u64,
    pub direction: DataDirection,
    pub created_at: DateTime<Local>,
    pub hex: String,
    pub text: String,
}

// ============================================================================
// Configuration
// ============================================================================

/// Segmentation and retention settings held by a history buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of rows kept (at least 1)
    pub capacity: usize,
    pub chunk_by_count_enabled: bool,
    /// Maximum bytes per row when count chunking is enabled (at least 1)
    pub chunk_length: usize,
    pub chunk_by_duration_enabled: bool,
    /// Start a new row after this much silence when duration chunking is enabled
    pub chunk_gap_millis: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: 10_000,
            chunk_by_count_enabled: true,
            chunk_length: 16,
            chunk_by_duration_enabled: true,
            chunk_gap_millis: 500,
        }
    }
}

impl HistoryConfig {
    /// Line width used by the renderer, `None` when rows are not wrapped.
    pub fn wrap_width(&self) -> Option<usize> {
        if self.chunk_by_count_enabled && self.chunk_length > 0 {
            Some(self.chunk_length)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.capacity >= 1 && self.chunk_length >= 1 && self.chunk_gap_millis >= 1
    }
}
