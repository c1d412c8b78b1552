use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use crate::engine::config::LogConfig;
use crate::engine::error::{NavError, NavResult};

/// Prefix shared by every log file this crate writes.
const LOG_FILE_PREFIX: &str = "kestrel";

/// Install a global subscriber writing to a fresh timestamped file under
/// `config.directory` and to stdout. Returns the log file path.
///
/// `RUST_LOG` overrides `config.filter`. Fails if the directory cannot be
/// created or a global subscriber is already installed.
pub fn setup_file_logging(config: &LogConfig) -> NavResult<PathBuf> {
    let log_dir = PathBuf::from(&config.directory);
    fs::create_dir_all(&log_dir)?;

    // Make room for the file about to be created.
    cleanup_old_logs(&log_dir, config.keep_files.saturating_sub(1));

    let now = chrono::Local::now();
    let log_filename = format!("{}_{}.log", LOG_FILE_PREFIX, now.format("%Y%m%d_%H%M%S"));
    let log_file_path = log_dir.join(&log_filename);

    // One file per run, never rotated.
    let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, &log_filename);

    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| NavError::Config(format!("logging already initialised: {}", e)))?;

    Ok(log_file_path)
}

/// Delete the oldest `kestrel*.log` files in `log_dir` until at most
/// `keep_count` remain. Returns how many were deleted.
pub fn cleanup_old_logs(log_dir: &Path, keep_count: usize) -> usize {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return 0;
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .map(|s| s.starts_with(LOG_FILE_PREFIX) && s.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect();

    // Oldest first; ties broken by name so same-second files sort stably.
    log_files.sort_by_key(|e| (e.metadata().ok().and_then(|m| m.modified().ok()), e.file_name()));

    let excess = log_files.len().saturating_sub(keep_count);
    log_files
        .iter()
        .take(excess)
        .filter(|file| fs::remove_file(file.path()).is_ok())
        .count()
}
