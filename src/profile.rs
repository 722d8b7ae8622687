//! Profile - the persisted player record around the engine state
//!
//! The engine never touches global XP; it reports deltas through the
//! `GlobalXpSink` and the profile accumulates them here.

use questlog_engine::config::LevelConfig;
use questlog_engine::ProgressionState;
use serde::{Deserialize, Serialize};

/// Schema version written into every saved profile.
pub const PROFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub global_xp: u64,
    #[serde(default)]
    pub state: ProgressionState,
}

fn default_version() -> u32 {
    PROFILE_VERSION
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: PROFILE_VERSION,
            global_xp: 0,
            state: ProgressionState::new(),
        }
    }
}

impl Profile {
    /// Player level from global XP, on the same curve as branch levels.
    pub fn level(&self, levels: &LevelConfig) -> u32 {
        levels.level_for(self.global_xp)
    }

    pub fn add_global_xp(&mut self, delta: u64) {
        self.global_xp = self.global_xp.saturating_add(delta);
    }
}
