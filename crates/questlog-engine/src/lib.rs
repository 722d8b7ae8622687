//! Questlog Engine - Branch ledger, modifiers, awards, achievements and escrow

pub mod achievements;
pub mod activity;
pub mod award;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod escrow;
pub mod ledger;
pub mod modifiers;
pub mod rules;
pub mod state;
pub mod unlocks;

pub use achievements::{AchievementDef, AchievementState, Catalog, Need, WindowReset, COMBO_MIN};
pub use activity::{ActivityLog, CompletionCounters, Summary};
pub use award::{AwardOptions, AwardOutcome, GlobalXpSink, MAX_AWARD_DEPTH};
pub use config::EngineConfig;
pub use engine::ProgressionEngine;
pub use escrow::{due_payouts, mark_paid, MilestonePayout, PayoutKind, Settlement};
pub use ledger::{BranchLedger, DecayReport};
pub use modifiers::Multipliers;
pub use rules::Rulebook;
pub use state::ProgressionState;
pub use unlocks::UnlockReport;
