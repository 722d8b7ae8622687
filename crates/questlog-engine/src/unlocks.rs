//! Perk and synergy unlocks driven by branch totals

use crate::config::LevelConfig;
use crate::ledger::BranchLedger;
use crate::rules::{PerkEffect, PerkUnlock, Rulebook};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockReport {
    pub perks: Vec<String>,
    /// `(perk, new tier)` for every tier that went up.
    pub tier_ups: Vec<(String, u32)>,
    pub synergies: Vec<String>,
}

impl UnlockReport {
    pub fn is_empty(&self) -> bool {
        self.perks.is_empty() && self.tier_ups.is_empty() && self.synergies.is_empty()
    }

    pub fn merge(&mut self, other: UnlockReport) {
        self.perks.extend(other.perks);
        self.tier_ups.extend(other.tier_ups);
        self.synergies.extend(other.synergies);
    }
}

/// Grant level-gated perks, raise tiers and unlock synergies the current
/// totals qualify for. Nothing is ever taken away.
pub fn apply_unlocks(ledger: &mut BranchLedger, rules: &Rulebook, levels: &LevelConfig) -> UnlockReport {
    let mut report = UnlockReport::default();

    for perk in &rules.perks {
        let PerkUnlock::BranchLevel { branch, level } = perk.unlock else {
            continue;
        };
        let current = levels.level_for(ledger.xp(branch));
        if current < level {
            continue;
        }

        if ledger.owned_perks.insert(perk.id.clone()) {
            info!("Perk unlocked: {} ({} level {})", perk.id, branch, current);
            report.perks.push(perk.id.clone());
        }

        if let PerkEffect::Tiered { max_tier, levels_per_tier, .. } = perk.effect {
            let earned = 1 + (current - level) / levels_per_tier.max(1);
            let earned = earned.min(max_tier.max(1));
            let tier = ledger.perk_tiers.entry(perk.id.clone()).or_insert(1);
            if earned > *tier {
                *tier = earned;
                info!("Perk {} reached tier {}", perk.id, earned);
                report.tier_ups.push((perk.id.clone(), earned));
            }
        }
    }

    for synergy in &rules.synergies {
        if ledger.synergies.contains(&synergy.id) {
            continue;
        }
        let met = !synergy.requires.is_empty()
            && synergy.requires.iter().all(|c| ledger.xp(c.branch) >= c.min_xp);
        if met {
            info!("Synergy unlocked: {}", synergy.id);
            ledger.synergies.insert(synergy.id.clone());
            report.synergies.push(synergy.id.clone());
        }
    }

    report
}

/// Grant a perk by id (achievement rewards). Unknown ids are ignored.
/// Returns true if the perk was newly granted.
pub fn grant_perk(ledger: &mut BranchLedger, rules: &Rulebook, perk_id: &str) -> bool {
    let Some(perk) = rules.perk(perk_id) else {
        return false;
    };
    if !ledger.owned_perks.insert(perk.id.clone()) {
        return false;
    }
    if perk.is_tiered() {
        ledger.perk_tiers.entry(perk.id.clone()).or_insert(1);
    }
    info!("Perk granted: {}", perk.id);
    true
}
