//! Static modifier tables: perks, synergies and daily effects
//!
//! A `Rulebook` is loaded once and never mutated. What a player *owns* lives
//! in the ledger; this module only says what each owned thing does and how
//! it is earned.

use questlog_core::BranchId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a multiplier applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Global,
    Branch(BranchId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerkEffect {
    /// Permanent multipliers, global and/or per branch.
    Flat {
        #[serde(default)]
        global_mult: Option<f64>,
        #[serde(default)]
        branch_mult: BTreeMap<BranchId, f64>,
    },
    /// Grows with the owning branch's level.
    Tiered {
        target: Target,
        base_mult: f64,
        per_tier_step: f64,
        max_tier: u32,
        levels_per_tier: u32,
    },
}

impl PerkEffect {
    pub fn flat_branch(branch: BranchId, mult: f64) -> Self {
        PerkEffect::Flat {
            global_mult: None,
            branch_mult: BTreeMap::from([(branch, mult)]),
        }
    }

    pub fn flat_global(mult: f64) -> Self {
        PerkEffect::Flat {
            global_mult: Some(mult),
            branch_mult: BTreeMap::new(),
        }
    }
}

/// `base_mult × (1 + (tier − 1) × per_tier_step)`; tier is clamped to ≥ 1.
pub fn tier_multiplier(base_mult: f64, per_tier_step: f64, tier: u32) -> f64 {
    let tier = tier.max(1);
    base_mult * (1.0 + (tier - 1) as f64 * per_tier_step)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerkUnlock {
    /// Granted once `branch` reaches `level`.
    BranchLevel { branch: BranchId, level: u32 },
    /// Granted only by an achievement that names this perk.
    Achievement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerkRule {
    pub id: String,
    pub label: String,
    pub effect: PerkEffect,
    pub unlock: PerkUnlock,
}

impl PerkRule {
    pub fn is_tiered(&self) -> bool {
        matches!(self.effect, PerkEffect::Tiered { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyCondition {
    pub branch: BranchId,
    pub min_xp: u64,
}

/// Unlocked once every condition holds at the same time; never revoked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynergyRule {
    pub id: String,
    pub label: String,
    pub requires: Vec<SynergyCondition>,
    pub target: BranchId,
    pub mult: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyTrigger {
    /// At least `n` completions today.
    DoneToday(u32),
    /// At least `count` completions today dominated by `branch`.
    BranchToday { branch: BranchId, count: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyRule {
    pub id: String,
    pub label: String,
    pub trigger: DailyTrigger,
    pub target: Target,
    pub mult: f64,
}

/// One active daily boost, as stored in the ledger's daily cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyEffect {
    pub id: String,
    pub label: String,
    pub target: Target,
    pub mult: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rulebook {
    #[serde(default)]
    pub perks: Vec<PerkRule>,
    #[serde(default)]
    pub synergies: Vec<SynergyRule>,
    #[serde(default)]
    pub daily: Vec<DailyRule>,
}

impl Rulebook {
    pub fn perk(&self, id: &str) -> Option<&PerkRule> {
        self.perks.iter().find(|p| p.id == id)
    }

    pub fn synergy(&self, id: &str) -> Option<&SynergyRule> {
        self.synergies.iter().find(|s| s.id == id)
    }

    /// The built-in tables.
    pub fn standard() -> Self {
        let mastery = [
            ("iron-body", "Iron Body", BranchId::Health),
            ("scholar", "Scholar", BranchId::Wisdom),
            ("artisan", "Artisan", BranchId::Craft),
            ("silver-tongue", "Silver Tongue", BranchId::Social),
            ("steward", "Steward", BranchId::Wealth),
            ("serene", "Serene", BranchId::Spirit),
        ];

        let mut perks: Vec<PerkRule> = mastery
            .iter()
            .map(|(id, label, branch)| PerkRule {
                id: id.to_string(),
                label: label.to_string(),
                effect: PerkEffect::flat_branch(*branch, 1.10),
                unlock: PerkUnlock::BranchLevel { branch: *branch, level: 3 },
            })
            .collect();

        perks.push(PerkRule {
            id: "deep-focus".into(),
            label: "Deep Focus".into(),
            effect: PerkEffect::Tiered {
                target: Target::Branch(BranchId::Wisdom),
                base_mult: 1.05,
                per_tier_step: 0.05,
                max_tier: 5,
                levels_per_tier: 2,
            },
            unlock: PerkUnlock::BranchLevel { branch: BranchId::Wisdom, level: 5 },
        });
        perks.push(PerkRule {
            id: "momentum".into(),
            label: "Momentum".into(),
            effect: PerkEffect::Tiered {
                target: Target::Global,
                base_mult: 1.02,
                per_tier_step: 0.02,
                max_tier: 5,
                levels_per_tier: 2,
            },
            unlock: PerkUnlock::BranchLevel { branch: BranchId::Craft, level: 5 },
        });
        perks.push(PerkRule {
            id: "polymath".into(),
            label: "Polymath".into(),
            effect: PerkEffect::flat_global(1.05),
            unlock: PerkUnlock::Achievement,
        });
        perks.push(PerkRule {
            id: "night-shift".into(),
            label: "Night Shift".into(),
            effect: PerkEffect::flat_branch(BranchId::Craft, 1.05),
            unlock: PerkUnlock::Achievement,
        });

        let synergy = |id: &str, label: &str, a: BranchId, b: BranchId, target: BranchId| SynergyRule {
            id: id.into(),
            label: label.into(),
            requires: vec![
                SynergyCondition { branch: a, min_xp: 500 },
                SynergyCondition { branch: b, min_xp: 500 },
            ],
            target,
            mult: 1.05,
        };
        let synergies = vec![
            synergy("sound-mind", "Sound Mind", BranchId::Health, BranchId::Wisdom, BranchId::Spirit),
            synergy("maker-mind", "Maker's Mind", BranchId::Craft, BranchId::Wisdom, BranchId::Craft),
            synergy("network", "Network Effect", BranchId::Social, BranchId::Wealth, BranchId::Wealth),
        ];

        let mut daily = vec![
            DailyRule {
                id: "warmed-up".into(),
                label: "Warmed Up".into(),
                trigger: DailyTrigger::DoneToday(3),
                target: Target::Global,
                mult: 1.05,
            },
            DailyRule {
                id: "on-a-roll".into(),
                label: "On a Roll".into(),
                trigger: DailyTrigger::DoneToday(6),
                target: Target::Global,
                mult: 1.05,
            },
        ];
        daily.extend(BranchId::ALL.iter().map(|b| DailyRule {
            id: format!("focus-{}", b.as_str()),
            label: format!("Focused: {}", b.as_str()),
            trigger: DailyTrigger::BranchToday { branch: *b, count: 3 },
            target: Target::Branch(*b),
            mult: 1.10,
        }));

        Self { perks, synergies, daily }
    }
}
