//! Branch ledger - per-branch experience totals and decay bookkeeping
//!
//! Totals only ever grow through awards and only ever shrink through
//! `apply_decay`, which runs at most once per calendar day.

use crate::config::DecayConfig;
use crate::rules::DailyEffect;
use questlog_core::{BranchId, DateKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Daily boosts computed for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyCache {
    #[serde(default)]
    pub day: Option<DateKey>,
    #[serde(default)]
    pub items: Vec<DailyEffect>,
}

impl DailyCache {
    /// Items for `today`, or nothing if the cache belongs to another day.
    pub fn active(&self, today: DateKey) -> &[DailyEffect] {
        if self.day == Some(today) {
            &self.items
        } else {
            &[]
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchLedger {
    #[serde(default)]
    pub xp: BTreeMap<BranchId, u64>,
    #[serde(default)]
    pub owned_perks: BTreeSet<String>,
    #[serde(default)]
    pub perk_tiers: BTreeMap<String, u32>,
    #[serde(default)]
    pub daily_cache: DailyCache,
    #[serde(default)]
    pub synergies: BTreeSet<String>,
    #[serde(default)]
    pub last_decay: Option<DateKey>,
}

/// Result of one decay step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub changed: bool,
    pub days_elapsed: u32,
}

impl BranchLedger {
    pub fn new() -> Self {
        let mut ledger = Self::default();
        for branch in BranchId::ALL {
            ledger.xp.insert(branch, 0);
        }
        ledger
    }

    pub fn xp(&self, branch: BranchId) -> u64 {
        self.xp.get(&branch).copied().unwrap_or(0)
    }

    pub fn set_xp(&mut self, branch: BranchId, value: u64) {
        self.xp.insert(branch, value);
    }

    pub fn add_xp(&mut self, branch: BranchId, delta: u64) {
        let entry = self.xp.entry(branch).or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    pub fn owns(&self, perk: &str) -> bool {
        self.owned_perks.contains(perk)
    }

    /// Tier of an owned tiered perk; 1 if owned without a recorded tier.
    pub fn tier(&self, perk: &str) -> u32 {
        self.perk_tiers.get(perk).copied().unwrap_or(1).max(1)
    }

    /// All six totals, zero-filled.
    pub fn snapshot(&self) -> [(BranchId, u64); 6] {
        BranchId::ALL.map(|b| (b, self.xp(b)))
    }

    /// Apply idle decay up to `today`.
    ///
    /// The first call (no previous date) and a clock that moved backwards both
    /// count as zero elapsed days. `last_decay` always ends at `today`.
    pub fn apply_decay(&mut self, today: DateKey, config: &DecayConfig) -> DecayReport {
        if self.last_decay == Some(today) {
            return DecayReport::default();
        }

        let days = self
            .last_decay
            .map(|last| today.days_since(last).max(0))
            .unwrap_or(0);
        let days = u32::try_from(days).unwrap_or(u32::MAX);
        self.last_decay = Some(today);

        let mut changed = false;
        if days > 0 {
            for rule in &config.rules {
                let before = self.xp(rule.branch);
                let loss = rule.per_day.saturating_mul(days as u64);
                let after = if before <= rule.floor {
                    before
                } else {
                    before.saturating_sub(loss).max(rule.floor)
                };
                if after != before {
                    debug!("Decay {}: {} -> {} over {} days", rule.branch, before, after, days);
                    self.set_xp(rule.branch, after);
                    changed = true;
                }
            }
        }

        if changed {
            info!("Applied {} day(s) of decay", days);
        }
        DecayReport {
            changed,
            days_elapsed: days,
        }
    }
}
