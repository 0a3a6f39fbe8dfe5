//! Logging configuration for warmcache.
//!
//! Every process (client or server) appends to a daily log file in the cache
//! directory. Debug builds also log to stderr, leaving stdout to the application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::registry;

const LOG_FILE_PREFIX: &str = "warmcache.log";
const LOG_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub fn init() {
    let is_debug = cfg!(debug_assertions);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(is_debug)));

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_appender(&log_dir()));

    let console_layer = is_debug.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();
}

fn default_directive(is_debug: bool) -> String {
    let level = if is_debug { "debug" } else { "info" };
    format!("warmcache={level},warn")
}

fn log_dir() -> PathBuf {
    registry::cache_dir().join("logs")
}

fn file_appender(log_dir: &Path) -> RollingFileAppender {
    fs::create_dir_all(log_dir).ok();
    prune_logs(log_dir, SystemTime::now());

    RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX)
}

/// Removes log files last modified more than a day before `now`.
fn prune_logs(log_dir: &Path, now: SystemTime) {
    let Ok(entries) = fs::read_dir(log_dir) else { return };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| log_age(path, now).is_some_and(|age| age > LOG_MAX_AGE))
        .for_each(|path| {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("failed to remove old log {}: {}", path.display(), e);
            }
        });
}

/// Time since `path` was last written, if it can be determined.
fn log_age(path: &Path, now: SystemTime) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    now.duration_since(modified).ok()
}
