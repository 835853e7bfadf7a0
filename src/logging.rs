use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::ThreadId;

/// Global log file handle. When `Some`, `tlog!` writes to both stderr and this file.
pub(crate) static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

/// Cleared while the terminal UI owns the screen.
static STDERR_ENABLED: AtomicBool = AtomicBool::new(true);

/// Short thread numbers, assigned in the order threads first log.
static THREAD_TAGS: Lazy<Mutex<HashMap<ThreadId, u32>>> = Lazy::new(|| Mutex::new(HashMap::new()));

const LOG_NAME: &str = "SerialTAP.log";

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time and the thread tag to every message.
/// Also writes to the log file when file logging is enabled.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        let msg = format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            $crate::logging::thread_tag(),
            format_args!($($arg)*)
        );
        $crate::logging::emit(&msg);
    }};
}

/// Initialise file logging to the given directory.
/// Creates a timestamped log file and a `SerialTAP.log` symlink (Unix only).
/// Returns the path of the new log file.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir: {}", e))?;

    let filename = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-SerialTAP.log")
        .to_string();
    let log_path = log_dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file: {}", e))?;

    // Windows symlinks require elevated privileges
    #[cfg(unix)]
    {
        let symlink_path = log_dir.join(LOG_NAME);
        let _ = std::fs::remove_file(&symlink_path);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &symlink_path) {
            tlog!("[logging] Failed to create {} symlink: {}", LOG_NAME, e);
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    tlog!("[logging] File logging started: {}", log_path.display());

    Ok(log_path)
}

/// Stop file logging and close the log file.
pub fn stop_file_logging() {
    let was_open = match LOG_FILE.lock() {
        Ok(mut guard) => guard.take().is_some(),
        Err(_) => false,
    };
    if was_open {
        tlog!("[logging] File logging stopped");
    }
}

/// Enable or disable the stderr copy of every log line.
pub fn set_stderr_logging(enabled: bool) {
    STDERR_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Short number for the calling thread; the first thread to log is 1.
pub(crate) fn thread_tag() -> u32 {
    let id = std::thread::current().id();
    match THREAD_TAGS.lock() {
        Ok(mut tags) => {
            let next = tags.len() as u32 + 1;
            *tags.entry(id).or_insert(next)
        }
        Err(_) => 0,
    }
}

/// Write one formatted line to stderr and the log file.
pub(crate) fn emit(line: &str) {
    use std::io::Write as _;

    if STDERR_ENABLED.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut f) = *guard {
            let _ = writeln!(f, "{}", line);
        }
    }
}
