//! Process-wide debug logger.
//!
//! Once [`init`] has been called, entries are appended to `debug.log` in the
//! data directory. With `--verbose` they are mirrored to stderr as well.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct DebugLogEntry {
    pub timestamp: String,
    pub level: String,
    pub module: String,
    pub message: String,
}

impl DebugLogEntry {
    fn render(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp, self.level, self.module, self.message
        )
    }
}

#[derive(Default)]
pub struct DebugLogger {
    file_path: Option<PathBuf>,
    mirror_stderr: bool,
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

impl DebugLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file_path(&mut self, path: PathBuf) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        self.file_path = Some(path);
    }

    pub fn log(&mut self, level: &str, module: &str, message: &str) {
        let entry = DebugLogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: level.to_string(),
            module: module.to_string(),
            message: message.to_string(),
        };

        if let Some(path) = &self.file_path {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", entry.render());
            }
        }

        if self.mirror_stderr {
            eprintln!("{}", entry.render());
        }
    }
}

/// Start writing to `<data_dir>/debug.log`
pub fn init(data_dir: PathBuf) {
    get_logger().lock().set_file_path(data_dir.join("debug.log"));
}

pub fn set_verbose(verbose: bool) {
    get_logger().lock().mirror_stderr = verbose;
}

pub fn log(level: &str, module: &str, message: impl Into<String>) {
    get_logger().lock().log(level, module, &message.into());
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("DEBUG", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("INFO", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("WARN", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::agent::logger::log("ERROR", module_path!(), format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("debug.log");
        let mut logger = DebugLogger::new();
        logger.set_file_path(path.clone());
        logger.log("WARN", "sleuth_core::test", "disk full");
        logger.log("INFO", "sleuth_core::test", "recovered");

        let written = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[WARN] [sleuth_core::test] disk full"));
        assert!(lines[1].ends_with("[INFO] [sleuth_core::test] recovered"));
    }

    #[test]
    fn test_macros_reach_global_file() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path().to_path_buf());
        crate::info_log!("macro smoke {}", 42);

        let written = std::fs::read_to_string(dir.path().join("debug.log")).unwrap();
        assert!(written.contains("[INFO] [sleuth_core::agent::logger::tests] macro smoke 42"));
    }
}
