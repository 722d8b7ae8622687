//! Modifier stack resolver
//!
//! Folds owned perks, tiered perks, today's daily boosts and unlocked
//! synergies into a global multiplier and per-branch multipliers, then
//! applies them to a normalized award map. Pure: reads the ledger, never
//! writes it.

use crate::activity::CompletionCounters;
use crate::ledger::{BranchLedger, DailyCache};
use crate::rules::{tier_multiplier, DailyEffect, DailyTrigger, PerkEffect, Rulebook, Target};
use questlog_core::{AwardMap, BranchId, DateKey};
use std::collections::BTreeMap;
use tracing::debug;

/// The folded multiplier state for one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Multipliers {
    pub global: f64,
    pub branch: BTreeMap<BranchId, f64>,
    pub synergy: BTreeMap<BranchId, f64>,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            global: 1.0,
            branch: BTreeMap::new(),
            synergy: BTreeMap::new(),
        }
    }
}

/// Zero, negative and non-finite multipliers are ignored rather than
/// allowed to wipe out or invert an award.
fn usable(mult: f64) -> bool {
    mult.is_finite() && mult > 0.0
}

impl Multipliers {
    fn apply(&mut self, target: Target, mult: f64) {
        if !usable(mult) {
            return;
        }
        match target {
            Target::Global => self.global *= mult,
            Target::Branch(b) => *self.branch.entry(b).or_insert(1.0) *= mult,
        }
    }

    fn apply_synergy(&mut self, branch: BranchId, mult: f64) {
        if usable(mult) {
            *self.synergy.entry(branch).or_insert(1.0) *= mult;
        }
    }

    pub fn branch(&self, branch: BranchId) -> f64 {
        self.branch.get(&branch).copied().unwrap_or(1.0)
    }

    pub fn synergy(&self, branch: BranchId) -> f64 {
        self.synergy.get(&branch).copied().unwrap_or(1.0)
    }

    /// Combined factor for one branch.
    pub fn effective(&self, branch: BranchId) -> f64 {
        self.global * self.branch(branch) * self.synergy(branch)
    }
}

/// Fold every modifier source the ledger currently holds.
pub fn multipliers(ledger: &BranchLedger, rules: &Rulebook, today: DateKey) -> Multipliers {
    let mut m = Multipliers::default();

    for perk_id in &ledger.owned_perks {
        let Some(perk) = rules.perk(perk_id) else {
            continue;
        };
        match &perk.effect {
            PerkEffect::Flat { global_mult, branch_mult } => {
                if let Some(g) = global_mult {
                    m.apply(Target::Global, *g);
                }
                for (branch, mult) in branch_mult {
                    m.apply(Target::Branch(*branch), *mult);
                }
            }
            PerkEffect::Tiered { target, base_mult, per_tier_step, max_tier, .. } => {
                let tier = ledger.tier(perk_id).min((*max_tier).max(1));
                m.apply(*target, tier_multiplier(*base_mult, *per_tier_step, tier));
            }
        }
    }

    for effect in ledger.daily_cache.active(today) {
        m.apply(effect.target, effect.mult);
    }

    for synergy_id in &ledger.synergies {
        if let Some(synergy) = rules.synergy(synergy_id) {
            m.apply_synergy(synergy.target, synergy.mult);
        }
    }

    m
}

/// Turn a normalized award map into final per-branch deltas.
///
/// Only branches present in `awards` appear in the result, whatever the
/// multiplier state says about other branches.
pub fn resolve(
    ledger: &BranchLedger,
    rules: &Rulebook,
    today: DateKey,
    awards: &AwardMap,
) -> BTreeMap<BranchId, u64> {
    if awards.is_empty() {
        return BTreeMap::new();
    }
    let m = multipliers(ledger, rules, today);
    debug!("Resolved multipliers: global={:.4} branch={:?} synergy={:?}", m.global, m.branch, m.synergy);

    awards
        .iter()
        .filter_map(|(branch, raw)| {
            let value = (raw * m.global * m.branch(branch) * m.synergy(branch)).round();
            (value >= 1.0).then_some((branch, value as u64))
        })
        .collect()
}

/// Recompute today's daily boosts from today's completion counters.
pub fn daily_cache(rules: &Rulebook, counters: &CompletionCounters, today: DateKey) -> DailyCache {
    let items = rules
        .daily
        .iter()
        .filter(|rule| match rule.trigger {
            DailyTrigger::DoneToday(n) => counters.today_total(today) >= n,
            DailyTrigger::BranchToday { branch, count } => counters.today(today, branch) >= count,
        })
        .map(|rule| DailyEffect {
            id: rule.id.clone(),
            label: rule.label.clone(),
            target: rule.target,
            mult: rule.mult,
        })
        .collect();
    DailyCache {
        day: Some(today),
        items,
    }
}
