//! Filesystem locations: cache (logs, preview) and state (config, quota record).

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const APP_NAME: &str = "sitechat";

pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SITECHAT_CACHE_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    if let Ok(dir) = std::env::var("XDG_CACHE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".cache"))
}

/// Directory holding config.toml and the daily quota record.
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SITECHAT_STATE_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(format!(".{APP_NAME}")))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join(APP_NAME).join(format!("{APP_NAME}.log")))
}

pub fn preview_dir() -> Result<PathBuf> {
    Ok(cache_dir()?.join(APP_NAME).join("preview"))
}
