use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::history::HistoryConfig;

/// Accepted values, matching the limits of the settings inputs
pub const CHUNK_LENGTH_RANGE: RangeInclusive<usize> = 8..=1000;
pub const CHUNK_GAP_RANGE: RangeInclusive<u64> = 10..=10_000;
pub const CAPACITY_RANGE: RangeInclusive<usize> = 10..=999_999;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_chunk_length")]
    pub chunk_length: usize,
    #[serde(default = "default_true")]
    pub chunk_by_count_enabled: bool,
    #[serde(default = "default_chunk_gap_millis")]
    pub chunk_gap_millis: u64, // ms
    #[serde(default = "default_true")]
    pub chunk_by_duration_enabled: bool,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    // Display
    #[serde(default = "default_true")]
    pub autoscroll: bool,
    #[serde(default = "default_true")]
    pub show_hex: bool,
    #[serde(default = "default_true")]
    pub show_timestamp: bool,

    /// Directory for log files; file logging is off when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_chunk_length() -> usize {
    16
}
fn default_chunk_gap_millis() -> u64 {
    500
}
fn default_history_capacity() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            chunk_length: default_chunk_length(),
            chunk_by_count_enabled: true,
            chunk_gap_millis: default_chunk_gap_millis(),
            chunk_by_duration_enabled: true,
            history_capacity: default_history_capacity(),
            autoscroll: true,
            show_hex: true,
            show_timestamp: true,
            log_dir: None,
        }
    }
}

impl AppSettings {
    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !CHUNK_LENGTH_RANGE.contains(&self.chunk_length) {
            tlog!(
                "[Settings] chunk_length {} out of range {:?}, using {}",
                self.chunk_length,
                CHUNK_LENGTH_RANGE,
                default_chunk_length()
            );
            self.chunk_length = default_chunk_length();
        }
        if !CHUNK_GAP_RANGE.contains(&self.chunk_gap_millis) {
            tlog!(
                "[Settings] chunk_gap_millis {} out of range {:?}, using {}",
                self.chunk_gap_millis,
                CHUNK_GAP_RANGE,
                default_chunk_gap_millis()
            );
            self.chunk_gap_millis = default_chunk_gap_millis();
        }
        if !CAPACITY_RANGE.contains(&self.history_capacity) {
            tlog!(
                "[Settings] history_capacity {} out of range {:?}, using {}",
                self.history_capacity,
                CAPACITY_RANGE,
                default_history_capacity()
            );
            self.history_capacity = default_history_capacity();
        }
        self
    }

    /// Segmentation and retention settings for the history buffer.
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            capacity: self.history_capacity,
            chunk_by_count_enabled: self.chunk_by_count_enabled,
            chunk_length: self.chunk_length,
            chunk_by_duration_enabled: self.chunk_by_duration_enabled,
            chunk_gap_millis: self.chunk_gap_millis,
        }
    }

    /// Copy the history buffer's current configuration back into the settings.
    pub fn update_from_history(&mut self, config: &HistoryConfig) {
        self.history_capacity = config.capacity;
        self.chunk_by_count_enabled = config.chunk_by_count_enabled;
        self.chunk_length = config.chunk_length;
        self.chunk_by_duration_enabled = config.chunk_by_duration_enabled;
        self.chunk_gap_millis = config.chunk_gap_millis;
    }
}

/// Default settings location: `<config dir>/SerialTAP/settings.json`.
pub fn default_settings_path() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir().ok_or_else(|| "Failed to get config dir".to_string())?;
    Ok(config_dir.join("SerialTAP").join("settings.json"))
}

/// Load settings from `path`, creating the file with defaults on first run.
pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse settings: {}", e))?;

        Ok(settings.sanitized())
    } else {
        let settings = AppSettings::default();
        save_settings(path, &settings)?;
        tlog!("[Settings] Created default settings at {}", path.display());
        Ok(settings)
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings dir: {}", e))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}
