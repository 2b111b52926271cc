//! Centralized path resolution for tether
//!
//! Single source of truth for the tether state directory and the files
//! inside it. Respects TETHER_DIR for dev setups, falls back to ~/.tether.

use std::path::PathBuf;

/// Get the tether base directory.
pub fn tether_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TETHER_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tether")
}

/// Get the log file path (tether_dir/logs/tether.log)
pub fn log_path() -> PathBuf {
    tether_dir().join("logs").join("tether.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn tether_dir_respects_env() {
        // SAFETY: serialized by serial_test, no concurrent env access.
        unsafe { std::env::set_var("TETHER_DIR", "/custom/tether") };
        assert_eq!(tether_dir(), PathBuf::from("/custom/tether"));
        unsafe { std::env::remove_var("TETHER_DIR") };
    }

    #[test]
    #[serial]
    fn log_path_is_under_logs() {
        // SAFETY: serialized by serial_test, no concurrent env access.
        unsafe { std::env::set_var("TETHER_DIR", "/custom/tether") };
        assert_eq!(log_path(), PathBuf::from("/custom/tether/logs/tether.log"));
        unsafe { std::env::remove_var("TETHER_DIR") };
    }
}
