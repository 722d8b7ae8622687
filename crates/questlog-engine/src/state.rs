//! The one mutable progression snapshot threaded through every engine call

use crate::achievements::AchievementState;
use crate::activity::{ActivityLog, CompletionCounters};
use crate::ledger::BranchLedger;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    #[serde(default = "BranchLedger::new")]
    pub ledger: BranchLedger,
    #[serde(default)]
    pub achievements: AchievementState,
    #[serde(default)]
    pub counters: CompletionCounters,
    #[serde(default)]
    pub activity: ActivityLog,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressionState {
    pub fn new() -> Self {
        Self {
            ledger: BranchLedger::new(),
            achievements: AchievementState::default(),
            counters: CompletionCounters::default(),
            activity: ActivityLog::default(),
        }
    }
}
