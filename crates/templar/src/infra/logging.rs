//! Tracing subscriber setup.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TEMPLAR_LOG=templar=debug`.
pub const LOG_ENV: &str = "TEMPLAR_LOG";
const DEFAULT_FILTER: &str = "info";
const LOG_FILE: &str = "templar.log";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file; used while the terminal UI owns the screen.
    File(PathBuf),
}

/// Install the global subscriber for `target`.
pub fn init(target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match target {
        LogTarget::Stderr => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!("failed to install stderr logger: {err}")),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!("failed to install file logger: {err}"))
        }
    }
}

/// Default location of the UI log file under the platform data directory.
pub fn default_log_path() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("templar")
        .join(LOG_FILE)
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_ends_with_log_file() {
        let path = default_log_path();
        assert!(path.ends_with("templar/templar.log"));
    }

    #[test]
    fn open_log_file_creates_parents() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested/dir/templar.log");
        open_log_file(&path)?;
        assert!(path.exists());
        Ok(())
    }
}
