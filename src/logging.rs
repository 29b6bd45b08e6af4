use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::paths::log_path;

const DEFAULT_FILTER: &str = "warn,sitechat=info";

/// Install the global subscriber. Logs go to the cache-dir log file so they
/// stay out of the chat. Returns that file's path, or `None` if logging fell
/// back to stderr.
pub fn init_tracing() -> Option<PathBuf> {
    match open_log_file() {
        Some((file, path)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .try_init();
            Some(path)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .compact()
                .try_init();
            None
        }
    }
}

fn filter() -> EnvFilter {
    std::env::var("SITECHAT_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log_file() -> Option<(File, PathBuf)> {
    let path = log_path().ok()?;
    fs::create_dir_all(path.parent()?).ok()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;
    Some((file, path))
}
