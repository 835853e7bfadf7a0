// Logging macro must be declared first so every module can use tlog!
#[macro_use]
mod logging;

pub mod history;
pub mod input;
pub mod settings;
#[cfg(feature = "cli")]
pub mod tui;

pub use logging::{init_file_logging, set_stderr_logging, stop_file_logging};
