//! Questlog - persisted profiles, reporting and CLI helpers around the engine

pub mod profile;
pub mod report;
pub mod store;

use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

pub use profile::{Profile, PROFILE_VERSION};
pub use store::Store;

/// Parse a `--at` clock override: `2026-10-19T08:30`, `2026-10-19 08:30:00`
/// or a bare date (noon).
pub fn parse_at(raw: &str) -> anyhow::Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("unrecognized time '{}' (expected YYYY-MM-DD[THH:MM])", raw))?;
    date.and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid time '{}'", raw))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// `~/.questlog`, or `.questlog` when HOME is unset.
pub fn data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".questlog"))
        .unwrap_or_else(|_| PathBuf::from(".questlog"))
}
