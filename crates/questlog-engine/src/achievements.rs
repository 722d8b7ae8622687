//! Achievement catalog matching with daily/weekly/streak windows
//!
//! Evaluation runs in a fixed order:
//! 1. window reset (the only place ephemeral lists are cleared)
//! 2. life-scope entries matched against the generic summary
//! 3. life-scope branch thresholds from lifetime branch counters
//! 4. streak tiers
//! 5. daily/weekly entries, then the per-branch combo entries
//!
//! Every unlock is idempotent: an id is appended to its list at most once
//! per window (once ever for life scope).

use crate::activity::{hour_mask, Summary};
use crate::award::{AwardOptions, GlobalXpSink};
use crate::engine::ProgressionEngine;
use crate::state::ProgressionState;
use crate::unlocks;
use questlog_core::{AchievementUnlock, BranchId, DateKey, RawAwards, Reward, Scope, TaskRecord, Tick, WeekKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Completions of one branch today that make a combo.
pub const COMBO_MIN: u32 = 2;

/// The closed set of conditions an achievement can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Need {
    DoneToday(u32),
    DoneThisWeek(u32),
    DoneLifetime(u64),
    BranchToday { branch: BranchId, count: u32 },
    BranchLifetime { branch: BranchId, count: u64 },
    /// At least `COMBO_MIN` completions of `branch` today.
    BranchCombo(BranchId),
    LevelAtLeast(u32),
    /// A completion during `[start, end)` local hours, wrapping midnight.
    HourRange { start: u32, end: u32 },
    WeeklyGlobalXp(u64),
    WeeklyBranchXp(u64),
    StreakLength(u32),
}

/// Which evaluation step owns a need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Generic,
    BranchThreshold,
    Streak,
    Combo,
}

impl Need {
    fn pass(&self) -> Pass {
        match self {
            Need::BranchLifetime { .. } => Pass::BranchThreshold,
            Need::StreakLength(_) => Pass::Streak,
            Need::BranchCombo(_) => Pass::Combo,
            Need::DoneToday(_)
            | Need::DoneThisWeek(_)
            | Need::DoneLifetime(_)
            | Need::BranchToday { .. }
            | Need::LevelAtLeast(_)
            | Need::HourRange { .. }
            | Need::WeeklyGlobalXp(_)
            | Need::WeeklyBranchXp(_) => Pass::Generic,
        }
    }

    /// Match against the summary. Hour ranges look at the hours of the
    /// entry's own window: today, this week, or ever.
    pub fn is_met(&self, s: &Summary, scope: Scope) -> bool {
        match *self {
            Need::DoneToday(n) => s.done_today >= n,
            Need::DoneThisWeek(n) => s.done_this_week >= n,
            Need::DoneLifetime(n) => s.done_lifetime >= n,
            Need::BranchToday { branch, count } => s.branch_today(branch) >= count,
            Need::BranchLifetime { branch, count } => s.branch_lifetime(branch) >= count,
            Need::BranchCombo(branch) => s.branch_today(branch) >= COMBO_MIN,
            Need::LevelAtLeast(n) => s.level >= n,
            Need::HourRange { start, end } => {
                let seen = match scope {
                    Scope::Life => s.hours_lifetime,
                    Scope::Daily => s.hours_today,
                    Scope::Weekly => s.hours_week,
                };
                seen & hour_mask(start, end) != 0
            }
            Need::WeeklyGlobalXp(n) => s.week_global_xp >= n,
            Need::WeeklyBranchXp(n) => s.week_branch_xp >= n,
            Need::StreakLength(n) => s.streak >= n,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_tier")]
    pub tier: u32,
    pub scope: Scope,
    pub need: Need,
    #[serde(default)]
    pub reward: Option<Reward>,
    /// Perk granted on unlock.
    #[serde(default)]
    pub perk: Option<String>,
}

fn default_tier() -> u32 {
    1
}

/// Unlock history plus the two reset windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementState {
    #[serde(default)]
    pub unlocked: Vec<AchievementUnlock>,
    #[serde(default)]
    pub ephemeral_daily: Vec<AchievementUnlock>,
    #[serde(default)]
    pub ephemeral_weekly: Vec<AchievementUnlock>,
    #[serde(default)]
    pub last_daily_key: Option<DateKey>,
    #[serde(default)]
    pub last_weekly_key: Option<WeekKey>,
}

/// Which windows were cleared by a reset check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowReset {
    pub daily: bool,
    pub weekly: bool,
}

impl AchievementState {
    /// Clear a window's list when its key changes, and advance the key.
    pub fn reset_windows(&mut self, today: DateKey, week: WeekKey) -> WindowReset {
        let mut reset = WindowReset::default();
        if self.last_daily_key != Some(today) {
            if !self.ephemeral_daily.is_empty() {
                debug!("Daily window rolled to {}, clearing {} entries", today, self.ephemeral_daily.len());
            }
            self.ephemeral_daily.clear();
            self.last_daily_key = Some(today);
            reset.daily = true;
        }
        if self.last_weekly_key != Some(week) {
            if !self.ephemeral_weekly.is_empty() {
                debug!("Weekly window rolled to {}, clearing {} entries", week, self.ephemeral_weekly.len());
            }
            self.ephemeral_weekly.clear();
            self.last_weekly_key = Some(week);
            reset.weekly = true;
        }
        reset
    }

    pub fn list(&self, scope: Scope) -> &[AchievementUnlock] {
        match scope {
            Scope::Life => &self.unlocked,
            Scope::Daily => &self.ephemeral_daily,
            Scope::Weekly => &self.ephemeral_weekly,
        }
    }

    fn list_mut(&mut self, scope: Scope) -> &mut Vec<AchievementUnlock> {
        match scope {
            Scope::Life => &mut self.unlocked,
            Scope::Daily => &mut self.ephemeral_daily,
            Scope::Weekly => &mut self.ephemeral_weekly,
        }
    }

    pub fn has(&self, scope: Scope, id: &str) -> bool {
        self.list(scope).iter().any(|u| u.id == id)
    }

    /// Append unless already present in the scope's list.
    fn push(&mut self, unlock: AchievementUnlock) -> bool {
        if self.has(unlock.scope, &unlock.id) {
            return false;
        }
        self.list_mut(unlock.scope).push(unlock);
        true
    }
}

/// The static achievement catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<AchievementDef>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&AchievementDef> {
        self.entries.iter().find(|d| d.id == id)
    }
}

impl ProgressionEngine {
    /// Run one evaluation over the catalog and return what was newly unlocked.
    ///
    /// Rewards are routed back through `award_for_task` one level deeper with
    /// evaluation suppressed.
    pub fn evaluate_achievements(
        &self,
        state: &mut ProgressionState,
        tick: &Tick,
        sink: &mut dyn GlobalXpSink,
        depth: u8,
    ) -> Vec<AchievementUnlock> {
        state.achievements.reset_windows(tick.today(), tick.week());

        let streak = &self.config().streak;
        let summary = Summary::build(
            &state.counters,
            &state.activity,
            tick,
            streak.min_completions,
            streak.lookback_days,
        );

        let mut unlocked = Vec::new();
        let life_passes = [Pass::Generic, Pass::BranchThreshold, Pass::Streak];
        for pass in life_passes {
            self.run_pass(state, &summary, tick, sink, depth, &mut unlocked, |def| {
                def.scope == Scope::Life && def.need.pass() == pass
            });
        }

        self.run_pass(state, &summary, tick, sink, depth, &mut unlocked, |def| {
            def.scope != Scope::Life && def.need.pass() != Pass::Combo
        });

        self.run_pass(state, &summary, tick, sink, depth, &mut unlocked, |def| {
            def.need.pass() == Pass::Combo
        });

        unlocked
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass<F>(
        &self,
        state: &mut ProgressionState,
        summary: &Summary,
        tick: &Tick,
        sink: &mut dyn GlobalXpSink,
        depth: u8,
        unlocked: &mut Vec<AchievementUnlock>,
        select: F,
    ) where
        F: Fn(&AchievementDef) -> bool,
    {
        for def in self.catalog().entries.iter().filter(|d| select(d)) {
            if state.achievements.has(def.scope, &def.id) || !def.need.is_met(summary, def.scope) {
                continue;
            }
            let unlock = AchievementUnlock {
                id: def.id.clone(),
                label: def.label.clone(),
                tier: def.tier,
                icon: def.icon.clone(),
                scope: def.scope,
                gained_at: tick.now,
                reward: def.reward.clone().filter(|r| !r.is_empty()),
            };
            if !state.achievements.push(unlock.clone()) {
                continue;
            }
            info!("Achievement unlocked: {} ({:?}, tier {})", def.id, def.scope, def.tier);

            if let Some(perk) = &def.perk {
                unlocks::grant_perk(&mut state.ledger, self.rules(), perk);
            }
            if let Some(reward) = &unlock.reward {
                self.grant_reward(state, def, reward, tick, sink, depth);
            }
            unlocked.push(unlock);
        }
    }

    fn grant_reward(
        &self,
        state: &mut ProgressionState,
        def: &AchievementDef,
        reward: &Reward,
        tick: &Tick,
        sink: &mut dyn GlobalXpSink,
        depth: u8,
    ) {
        let task = TaskRecord {
            id: format!("achievement:{}", def.id),
            base_xp: reward.global.min(i64::MAX as u64) as i64,
            xp_awards: RawAwards::from_branches(&reward.branches),
            allow_zero_base: true,
            ..TaskRecord::default()
        };
        self.award_for_task(state, &task, tick, sink, AwardOptions::reward(depth + 1));
    }
}
