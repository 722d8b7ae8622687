//! Outbound events consumed by UI and animation layers

use crate::types::Reward;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Window an achievement belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Life,
    Daily,
    Weekly,
}

/// An achievement that was just unlocked. Also the persisted form of
/// unlocked entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub id: String,
    pub label: String,
    pub tier: u32,
    pub icon: String,
    pub scope: Scope,
    pub gained_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}
