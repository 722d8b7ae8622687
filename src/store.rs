//! Profile persistence - one pretty-printed JSON file per player
//!
//! Writes go to `<file>.json.tmp` first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use crate::profile::{Profile, PROFILE_VERSION};
use anyhow::Context;
use questlog_core::TaskRecord;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the saved profile.
    pub fn load(&self) -> questlog_core::Result<Profile> {
        let content = std::fs::read_to_string(&self.path)?;
        let profile: Profile = serde_json::from_str(&content)
            .map_err(|e| questlog_core::Error::snapshot(self.path.display().to_string(), e.to_string()))?;
        if profile.version > PROFILE_VERSION {
            warn!(
                "Profile {} has schema version {} (this build writes {})",
                self.path.display(),
                profile.version,
                PROFILE_VERSION
            );
        }
        Ok(profile)
    }

    /// Hydrate the saved profile, or start a fresh one. An unparseable file
    /// is logged and replaced by a fresh profile on the next save.
    pub fn load_or_create(&self) -> Profile {
        if !self.path.exists() {
            info!("No profile at {} - starting fresh", self.path.display());
            return Profile::default();
        }
        match self.load() {
            Ok(profile) => {
                info!("Loaded profile from {}", self.path.display());
                profile
            }
            Err(e) => {
                warn!("{} - starting fresh", e);
                Profile::default()
            }
        }
    }

    pub fn save(&self, profile: &Profile) -> anyhow::Result<()> {
        write_json_atomic(&self.path, profile)
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Read a task record. Malformed fields decode leniently; only unreadable
/// files and non-JSON content are errors.
pub fn read_task(path: &Path) -> anyhow::Result<TaskRecord> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let task = serde_json::from_str(&content).with_context(|| format!("parsing task {}", path.display()))?;
    Ok(task)
}
