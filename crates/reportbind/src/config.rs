//! Runtime configuration from environment variables with platform
//! directory fallbacks.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

const DEFAULT_WORKER_COUNT: usize = 2;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base data directory; everything else lives under it by default.
    pub data_dir: PathBuf,
    /// Uploaded archives awaiting processing.
    pub upload_dir: PathBuf,
    /// Per-job extraction scratch space.
    pub work_dir: PathBuf,
    /// Merged PDFs.
    pub output_dir: PathBuf,
    /// The order-preference JSON file.
    pub order_file: PathBuf,
    /// Worker threads converting documents in parallel.
    pub worker_count: usize,
    /// Default recipient for merged PDFs; delivery is skipped when unset.
    pub recipient: Option<String>,
}

impl Config {
    /// Builds the configuration from `REPORTBIND_*` environment variables,
    /// falling back to the platform data directory.
    pub fn from_env() -> Self {
        let data_dir = env::var_os("REPORTBIND_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join("reportbind")))
            .unwrap_or_else(|| PathBuf::from(".reportbind"));

        let order_file = env::var_os("REPORTBIND_ORDER_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("order.json"));

        let worker_count = env::var("REPORTBIND_WORKERS")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|count| *count > 0)
            .unwrap_or(DEFAULT_WORKER_COUNT);

        let recipient = env::var("REPORTBIND_RECIPIENT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            upload_dir: data_dir.join("uploads"),
            work_dir: data_dir.join("work"),
            output_dir: data_dir.join("output"),
            order_file,
            worker_count,
            recipient,
            data_dir,
        }
    }

    /// Creates the working directories if they do not exist yet.
    pub fn ensure_directories(&self) -> io::Result<()> {
        for dir in [
            &self.data_dir,
            &self.upload_dir,
            &self.work_dir,
            &self.output_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Clears leftover uploads and scratch directories from previous runs.
    /// Merged output and the order file are kept.
    pub fn cleanup_data_directories(&self) -> io::Result<()> {
        for dir in [&self.upload_dir, &self.work_dir] {
            if dir.is_dir() {
                fs::remove_dir_all(dir)?;
            }
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for key in [
            "REPORTBIND_DATA_DIR",
            "REPORTBIND_ORDER_FILE",
            "REPORTBIND_WORKERS",
            "REPORTBIND_RECIPIENT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_explicit() {
        clear_env();
        let temp = TempDir::new().unwrap();
        std::env::set_var("REPORTBIND_DATA_DIR", temp.path());
        std::env::set_var("REPORTBIND_WORKERS", "4");
        std::env::set_var("REPORTBIND_RECIPIENT", " team@example.com ");

        let config = Config::from_env();
        assert_eq!(config.data_dir, temp.path());
        assert_eq!(config.upload_dir, temp.path().join("uploads"));
        assert_eq!(config.order_file, temp.path().join("order.json"));
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.recipient.as_deref(), Some("team@example.com"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        std::env::set_var("REPORTBIND_DATA_DIR", temp.path());
        std::env::set_var("REPORTBIND_WORKERS", "0");

        let config = Config::from_env();
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
        assert!(config.recipient.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_order_file_override() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("custom-order.json");
        std::env::set_var("REPORTBIND_DATA_DIR", temp.path());
        std::env::set_var("REPORTBIND_ORDER_FILE", &custom);

        let config = Config::from_env();
        assert_eq!(config.order_file, custom);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_ensure_and_cleanup() {
        clear_env();
        let temp = TempDir::new().unwrap();
        std::env::set_var("REPORTBIND_DATA_DIR", temp.path());

        let config = Config::from_env();
        config.ensure_directories().unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.work_dir.is_dir());
        assert!(config.output_dir.is_dir());

        let leftover = config.work_dir.join("stale-job");
        std::fs::create_dir_all(&leftover).unwrap();
        let kept = config.output_dir.join("第3回報告書.pdf");
        std::fs::write(&kept, b"pdf").unwrap();

        config.cleanup_data_directories().unwrap();
        assert!(!leftover.exists());
        assert!(config.work_dir.is_dir());
        assert!(kept.exists());

        clear_env();
    }
}
