//! Award orchestrator - turns one completed task into ledger growth
//!
//! Order within one award: global reward → decay → resolve → apply →
//! strict-key guard → counters → activity → daily cache → unlocks →
//! achievements.

use crate::engine::ProgressionEngine;
use crate::ledger::DecayReport;
use crate::modifiers;
use crate::state::ProgressionState;
use crate::unlocks::{self, UnlockReport};
use questlog_core::{AchievementUnlock, AwardMap, BranchId, TaskRecord, Tick};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Achievement rewards re-enter the orchestrator; nesting past this depth
/// never evaluates achievements, whatever the options say.
pub const MAX_AWARD_DEPTH: u8 = 2;

/// Receives the non-branch ("global") reward of every award.
pub trait GlobalXpSink {
    fn add_global_xp(&mut self, delta: u64);
}

impl<F: FnMut(u64)> GlobalXpSink for F {
    fn add_global_xp(&mut self, delta: u64) {
        self(delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardOptions {
    pub evaluate_achievements: bool,
    /// Whether this award is a task completion for counters and streaks.
    pub counts_as_completion: bool,
    pub depth: u8,
}

impl Default for AwardOptions {
    fn default() -> Self {
        Self {
            evaluate_achievements: true,
            counts_as_completion: true,
            depth: 0,
        }
    }
}

impl AwardOptions {
    /// Options for an achievement's own reward.
    pub fn reward(depth: u8) -> Self {
        Self {
            evaluate_achievements: false,
            counts_as_completion: false,
            depth,
        }
    }

    /// Options for a milestone installment: XP only, not a completion.
    pub fn installment() -> Self {
        Self {
            counts_as_completion: false,
            ..Self::default()
        }
    }

    pub fn without_achievements(mut self) -> Self {
        self.evaluate_achievements = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardOutcome {
    pub global_delta: u64,
    /// Final per-branch deltas actually added to the ledger.
    pub applied: BTreeMap<BranchId, u64>,
    pub dominant: Option<BranchId>,
    pub decay: DecayReport,
    /// Branches the strict-key guard had to roll back.
    pub reverted: Vec<BranchId>,
    pub unlocks: UnlockReport,
    pub achievements: Vec<AchievementUnlock>,
}

impl AwardOutcome {
    pub fn branch_total(&self) -> u64 {
        self.applied.values().sum()
    }
}

/// Roll back any branch that grew without being an input key.
fn guard_strict_keys(
    state: &mut ProgressionState,
    before: &[(BranchId, u64); 6],
    awards: &AwardMap,
) -> Vec<BranchId> {
    let mut reverted = Vec::new();
    for (branch, prior) in before {
        let now = state.ledger.xp(*branch);
        if now > *prior && !awards.contains(*branch) {
            warn!("Reverting unintended growth on {}: {} -> {}", branch, prior, now);
            state.ledger.set_xp(*branch, *prior);
            reverted.push(*branch);
        }
    }
    reverted
}

impl ProgressionEngine {
    /// Award a completed task. Never fails: malformed awards award nothing
    /// to branches, a bad base reward falls back to the minimum.
    pub fn award_for_task(
        &self,
        state: &mut ProgressionState,
        task: &TaskRecord,
        tick: &Tick,
        sink: &mut dyn GlobalXpSink,
        options: AwardOptions,
    ) -> AwardOutcome {
        let today = tick.today();
        let config = self.config();
        let awards = task.xp_awards.normalize();

        let global_delta = task.global_reward();
        if global_delta > 0 {
            sink.add_global_xp(global_delta);
        }

        let decay = state.ledger.apply_decay(today, &config.decay);

        let before = state.ledger.snapshot();
        let deltas = modifiers::resolve(&state.ledger, self.rules(), today, &awards);
        for (branch, delta) in &deltas {
            state.ledger.add_xp(*branch, *delta);
        }
        let reverted = guard_strict_keys(state, &before, &awards);
        let applied: BTreeMap<BranchId, u64> = deltas
            .into_iter()
            .filter(|(b, _)| !reverted.contains(b))
            .collect();
        debug!("Task {} applied {:?} (+{} global)", task.id, applied, global_delta);

        let dominant = awards.dominant();
        state.counters.roll(today);
        if options.counts_as_completion {
            state.counters.record(today, dominant);
        }
        state
            .activity
            .record(tick, options.counts_as_completion, global_delta, applied.values().sum());
        state.activity.prune(today, config.activity.retention_days);

        state.ledger.daily_cache = modifiers::daily_cache(self.rules(), &state.counters, today);
        let unlocks = unlocks::apply_unlocks(&mut state.ledger, self.rules(), &config.levels);

        let achievements = if options.evaluate_achievements && options.depth < MAX_AWARD_DEPTH {
            self.evaluate_achievements(state, tick, sink, options.depth)
        } else {
            Vec::new()
        };

        AwardOutcome {
            global_delta,
            applied,
            dominant,
            decay,
            reverted,
            unlocks,
            achievements,
        }
    }
}
