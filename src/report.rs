//! Plain-text rendering for the CLI

use crate::profile::Profile;
use questlog_core::{AchievementUnlock, BranchId, Scope, Tick};
use questlog_engine::{AwardOutcome, EngineConfig, MilestonePayout, PayoutKind, Settlement};

const BAR_WIDTH: usize = 20;

fn bar(xp: u64, step: u64, level: u32) -> String {
    // xp needed for level n is step * (n-1)^2
    let floor = step.saturating_mul(u64::from(level - 1).pow(2));
    let ceil = step.saturating_mul(u64::from(level).pow(2));
    let span = ceil.saturating_sub(floor).max(1);
    let filled = ((xp.saturating_sub(floor) as f64 / span as f64) * BAR_WIDTH as f64) as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn format_status(profile: &Profile, config: &EngineConfig, tick: &Tick) -> String {
    let mut out = String::new();
    let step = config.levels.level_step.max(1);
    let state = &profile.state;
    let today = tick.today();

    out.push_str(&format!(
        "Level {}  ({} global XP)\n\n",
        profile.level(&config.levels),
        profile.global_xp
    ));

    for branch in BranchId::ALL {
        let xp = state.ledger.xp(branch);
        let level = config.levels.level_for(xp);
        out.push_str(&format!(
            "  {:<7} L{:<3} {} {:>6} XP  ({} today)\n",
            branch.as_str(),
            level,
            bar(xp, step, level),
            xp,
            state.counters.today(today, branch)
        ));
    }

    out.push_str(&format!(
        "\nCompleted today: {}   lifetime: {}\n",
        state.counters.today_total(today),
        state.counters.lifetime_total
    ));
    out.push_str(&format!(
        "Streak: {} day(s)\n",
        state
            .activity
            .streak(today, config.streak.min_completions, config.streak.lookback_days)
    ));

    if !state.ledger.owned_perks.is_empty() {
        out.push_str("\nPerks:\n");
        for perk in &state.ledger.owned_perks {
            match state.ledger.perk_tiers.get(perk) {
                Some(tier) => out.push_str(&format!("  {} (tier {})\n", perk, tier)),
                None => out.push_str(&format!("  {}\n", perk)),
            }
        }
    }
    if !state.ledger.synergies.is_empty() {
        out.push_str("\nSynergies:\n");
        for id in &state.ledger.synergies {
            out.push_str(&format!("  {}\n", id));
        }
    }
    let active = state.ledger.daily_cache.active(today);
    if !active.is_empty() {
        out.push_str("\nActive today:\n");
        for effect in active {
            out.push_str(&format!("  {} (x{:.2})\n", effect.label, effect.mult));
        }
    }
    out
}

fn format_unlock(unlock: &AchievementUnlock) -> String {
    let mut line = format!("  [{}] {} (tier {})", unlock.icon, unlock.label, unlock.tier);
    if let Some(reward) = &unlock.reward {
        if reward.global > 0 {
            line.push_str(&format!(" +{} XP", reward.global));
        }
        for (branch, amount) in &reward.branches {
            line.push_str(&format!(" +{} {}", amount, branch));
        }
    }
    line.push('\n');
    line
}

pub fn format_achievements(profile: &Profile) -> String {
    let mut out = String::new();
    let sections = [
        (Scope::Life, "Unlocked"),
        (Scope::Daily, "Today"),
        (Scope::Weekly, "This week"),
    ];
    for (scope, title) in sections {
        let list = profile.state.achievements.list(scope);
        out.push_str(&format!("{} ({}):\n", title, list.len()));
        for unlock in list {
            out.push_str(&format_unlock(unlock));
        }
        out.push('\n');
    }
    out
}

pub fn format_payout(payout: &MilestonePayout) -> String {
    let kind = match payout.kind {
        PayoutKind::Milestone => "milestone",
        PayoutKind::Final => "final",
    };
    let mut line = format!(
        "{} [{} {:.0}%] +{} XP",
        payout.key,
        kind,
        payout.portion * 100.0,
        payout.base_global
    );
    for (branch, amount) in &payout.branch_awards {
        line.push_str(&format!(" +{} {}", amount, branch));
    }
    if payout.bonus > 0 {
        line.push_str(&format!(" (bonus {})", payout.bonus));
    }
    line
}

pub fn format_plan(payouts: &[MilestonePayout]) -> String {
    if payouts.is_empty() {
        return "Nothing due.\n".to_string();
    }
    let mut out = String::new();
    for payout in payouts {
        out.push_str(&format_payout(payout));
        out.push('\n');
    }
    out
}

pub fn format_outcome(outcome: &AwardOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("  +{} global XP", outcome.global_delta));
    for (branch, delta) in &outcome.applied {
        out.push_str(&format!(", +{} {}", delta, branch));
    }
    out.push('\n');
    if outcome.decay.changed {
        out.push_str(&format!("  decay applied for {} day(s)\n", outcome.decay.days_elapsed));
    }
    for perk in &outcome.unlocks.perks {
        out.push_str(&format!("  perk unlocked: {}\n", perk));
    }
    for (perk, tier) in &outcome.unlocks.tier_ups {
        out.push_str(&format!("  {} reached tier {}\n", perk, tier));
    }
    for id in &outcome.unlocks.synergies {
        out.push_str(&format!("  synergy active: {}\n", id));
    }
    for unlock in &outcome.achievements {
        out.push_str(&format_unlock(unlock));
    }
    out
}

pub fn format_settlements(settled: &[Settlement]) -> String {
    if settled.is_empty() {
        return "Nothing due.\n".to_string();
    }
    let mut out = String::new();
    for s in settled {
        out.push_str(&format_payout(&s.payout));
        out.push('\n');
        out.push_str(&format_outcome(&s.outcome));
    }
    out
}
