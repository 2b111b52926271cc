//! Append-only JSONL logging for tether
//!
//! The terminal belongs to the prompt and to the runtime's streamed output,
//! so anything that is not user-facing goes to tether_dir/logs/tether.log.
//! One serde-serialized entry per line: ts, level, subsystem, event, msg.

use chrono::Utc;
use serde::Serialize;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;

#[derive(Serialize)]
struct LogEntry<'a> {
    ts: String,
    level: &'a str,
    subsystem: &'a str,
    event: &'a str,
    msg: &'a str,
}

/// Write one log line. Failures are swallowed: logging must never take
/// down the session or corrupt the prompt.
pub fn log(level: &str, subsystem: &str, event: &str, msg: &str) {
    let path = crate::paths::log_path();
    if let Some(parent) = path.parent() {
        let _ = create_dir_all(parent);
    }

    let entry = LogEntry {
        ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        level,
        subsystem,
        event,
        msg,
    };
    let Ok(line) = serde_json::to_string(&entry) else {
        return;
    };

    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{}", line);
    }
}

/// Log info message
pub fn log_info(subsystem: &str, event: &str, msg: &str) {
    log("info", subsystem, event, msg);
}

/// Log warning message
pub fn log_warn(subsystem: &str, event: &str, msg: &str) {
    log("warn", subsystem, event, msg);
}

/// Log error message
pub fn log_error(subsystem: &str, event: &str, msg: &str) {
    log("error", subsystem, event, msg);
}
