//! Progression engine configuration
//!
//! All tunable numbers in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use questlog_core::BranchId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Which branches fade when idle, and how fast.
    pub decay: DecayConfig,
    /// Branch level curve.
    pub levels: LevelConfig,
    /// Streak counting.
    pub streak: StreakConfig,
    /// Activity log retention.
    pub activity: ActivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub rules: Vec<DecayRule>,
}

/// Per-day decay for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayRule {
    pub branch: BranchId,
    /// XP removed per elapsed day.
    pub per_day: u64,
    /// Decay never takes the branch below this.
    #[serde(default)]
    pub floor: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// `level = 1 + floor(sqrt(xp / level_step))`.
    pub level_step: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Completions a day needs to extend a streak.
    pub min_completions: u32,
    /// How many trailing days are inspected at most.
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Days of per-day tallies kept in the snapshot.
    pub retention_days: u32,
}

// ============================================================
// Defaults
// ============================================================

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                DecayRule { branch: BranchId::Health, per_day: 5, floor: 0 },
                DecayRule { branch: BranchId::Social, per_day: 3, floor: 0 },
            ],
        }
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self { level_step: 100 }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self { min_completions: 1, lookback_days: 60 }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self { retention_days: 120 }
    }
}

// ============================================================
// Loading
// ============================================================

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse TOML config text. Missing sections take their defaults.
    pub fn parse(content: &str) -> questlog_core::Result<Self> {
        toml::from_str(content).map_err(|e| questlog_core::Error::config(e.to_string()))
    }

    /// Render the config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn decay_rule(&self, branch: BranchId) -> Option<&DecayRule> {
        self.decay.rules.iter().find(|r| r.branch == branch)
    }
}

impl LevelConfig {
    /// Branch level reached with `xp` experience. Always at least 1.
    pub fn level_for(&self, xp: u64) -> u32 {
        let step = self.level_step.max(1);
        1 + ((xp / step) as f64).sqrt().floor() as u32
    }
}
