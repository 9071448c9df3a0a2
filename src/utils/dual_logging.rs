use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::utils::app_paths::AppPaths;
use crate::utils::logging::LogEntry;

/// Set to echo every log line to stderr
pub const DEBUG_ENV_VAR: &str = "TRACK_SEARCH_DEBUG";

/// Global dual logger instance
static DUAL_LOGGER: OnceLock<DualLogger> = OnceLock::new();

/// File half of the logging setup; the ring buffer half lives in
/// [`crate::utils::logging`]
pub struct DualLogger {
    log_file: Mutex<Option<File>>,
    log_path: PathBuf,
    echo_stderr: bool,
}

impl DualLogger {
    /// Open a timestamped log file in `log_dir` and point `latest.log` at it
    pub fn new(log_dir: &Path) -> Self {
        let _ = std::fs::create_dir_all(log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("track-search_{}.log", timestamp));
        let latest_path = log_dir.join("latest.log");

        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
        }

        #[cfg(windows)]
        {
            let pointer_content = format!("Current log file: {}\n", log_path.display());
            let _ = std::fs::write(&latest_path, pointer_content);
        }

        // A missing file only disables the file half; the ring buffer still works
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        Self {
            log_file: Mutex::new(log_file),
            log_path,
            echo_stderr: std::env::var_os(DEBUG_ENV_VAR).is_some(),
        }
    }

    /// Append an entry to the log file
    pub fn write_entry(&self, entry: &LogEntry) {
        let mut file_opt = self.log_file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref mut file) = *file_opt {
            let line = format!("{}\n", entry.format_for_display());
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }

        if self.echo_stderr {
            eprintln!("{}", entry.format_for_display());
        }
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn flush(&self) {
        let mut file_opt = self.log_file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref mut file) = *file_opt {
            let _ = file.flush();
        }
    }
}

/// Initialize the global dual logger in the application log directory.
/// Falls back to the system temp directory when no data directory exists.
pub fn init_dual_logger() -> &'static DualLogger {
    DUAL_LOGGER.get_or_init(|| {
        let log_dir = AppPaths::log_dir().unwrap_or_else(|_| std::env::temp_dir().join("track-search"));
        DualLogger::new(&log_dir)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn writes_entries_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = DualLogger::new(dir.path());
        logger.write_entry(&LogEntry::new(
            Level::WARN,
            "search",
            "Request #2 failed".to_string(),
        ));
        logger.flush();

        let contents = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(contents.contains("WARN [search] Request #2 failed"));
    }
}
