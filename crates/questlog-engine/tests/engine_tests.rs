//! Integration tests for questlog-engine
//!
//! These tests exercise the public operations end to end:
//! - award orchestration, modifier folding and the strict-key guard
//! - decay idempotence and floors
//! - achievement passes, window resets and the reward depth guard
//! - milestone escrow planning and settlement
//! - config loading and state snapshots

use questlog_core::{BranchId, DateKey, EscrowMode, Scope, Subtask, TaskRecord, Tick};
use questlog_engine::activity::{hour_mask, DayTally};
use questlog_engine::config::{DecayConfig, DecayRule};
use questlog_engine::rules::{DailyRule, DailyTrigger, Target};
use questlog_engine::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn day(d: u32) -> DateKey {
    DateKey::ymd(2026, 10, d).unwrap()
}

fn at(d: u32, hour: u32) -> Tick {
    Tick::on(day(d), hour, 1)
}

/// Engine with the standard rules but no achievements, so branch totals
/// only move by what the task itself awards.
fn quiet_engine() -> ProgressionEngine {
    ProgressionEngine::default().with_catalog(Catalog::default())
}

fn award(engine: &ProgressionEngine, state: &mut ProgressionState, task: &TaskRecord, tick: &Tick) -> (AwardOutcome, u64) {
    let mut total = 0u64;
    let outcome = engine.award_for_task(state, task, tick, &mut |d: u64| total += d, AwardOptions::default());
    (outcome, total)
}

fn wisdom_task(id: &str, amount: f64) -> TaskRecord {
    TaskRecord::new(id, 10).award("wisdom", amount).done()
}

// ============================================================
// Award orchestrator - basic scenarios
// ============================================================

#[test]
fn award_splits_branches_without_perks() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let task = TaskRecord::new("t1", 100).award("WISDOM", 80.0).award("health", 20.0);

    let (outcome, global) = award(&engine, &mut state, &task, &at(19, 12));

    assert_eq!(global, 100);
    assert_eq!(outcome.global_delta, 100);
    assert_eq!(state.ledger.xp(BranchId::Wisdom), 80);
    assert_eq!(state.ledger.xp(BranchId::Health), 20);
    for branch in [BranchId::Craft, BranchId::Social, BranchId::Wealth, BranchId::Spirit] {
        assert_eq!(state.ledger.xp(branch), 0);
    }
    assert_eq!(outcome.branch_total(), 100);
    assert_eq!(outcome.dominant, Some(BranchId::Wisdom));
    assert!(outcome.reverted.is_empty());
}

#[test]
fn award_applies_owned_branch_perk() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    state.ledger.owned_perks.insert("scholar".into());
    let task = TaskRecord::new("t1", 100).award("wisdom", 80.0).award("health", 20.0);

    let (outcome, _) = award(&engine, &mut state, &task, &at(19, 12));

    assert_eq!(outcome.applied.get(&BranchId::Wisdom), Some(&88));
    assert_eq!(outcome.applied.get(&BranchId::Health), Some(&20));
}

#[test]
fn award_with_malformed_awards_still_pays_global() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let task: TaskRecord = serde_json::from_str(r#"{"id":"odd","baseXp":"x","xpAwards":[1,2,3]}"#).unwrap();

    let (outcome, global) = award(&engine, &mut state, &task, &at(19, 12));

    assert_eq!(global, 1);
    assert!(outcome.applied.is_empty());
    assert_eq!(outcome.dominant, None);
    assert_eq!(state.counters.lifetime_total, 1);
}

#[test]
fn zero_global_reward_skips_sink() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let mut task = TaskRecord::new("scaled", 0).award("craft", 5.0);
    task.allow_zero_base = true;

    let mut calls = 0;
    engine.award_for_task(&mut state, &task, &at(19, 12), &mut |_d: u64| calls += 1, AwardOptions::default());

    assert_eq!(calls, 0);
    assert_eq!(state.ledger.xp(BranchId::Craft), 5);
}

// ============================================================
// Strict-key invariant
// ============================================================

#[test]
fn synergy_on_other_branch_never_grows_it() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    state.ledger.set_xp(BranchId::Health, 600);
    state.ledger.set_xp(BranchId::Wisdom, 600);
    state.ledger.synergies.insert("sound-mind".into());

    let before = state.ledger.xp(BranchId::Spirit);
    award(&engine, &mut state, &wisdom_task("w", 50.0), &at(19, 12));

    assert_eq!(state.ledger.xp(BranchId::Spirit), before);
}

#[test]
fn branch_daily_effect_does_not_leak_into_other_keys() {
    let mut rules = Rulebook::standard();
    rules.daily.push(DailyRule {
        id: "craft-rush".into(),
        label: "Craft Rush".into(),
        trigger: DailyTrigger::DoneToday(1),
        target: Target::Branch(BranchId::Craft),
        mult: 3.0,
    });
    let engine = quiet_engine().with_rules(rules);
    let mut state = ProgressionState::new();

    award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 9));
    award(&engine, &mut state, &wisdom_task("b", 10.0), &at(19, 10));

    assert_eq!(state.ledger.xp(BranchId::Craft), 0);
    assert_eq!(state.ledger.xp(BranchId::Wisdom), 20);
}

#[test]
fn synergy_applies_to_its_target_when_awarded() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    state.ledger.synergies.insert("network".into());

    let task = TaskRecord::new("deal", 10).award("wealth", 100.0);
    let (outcome, _) = award(&engine, &mut state, &task, &at(19, 12));

    assert_eq!(outcome.applied.get(&BranchId::Wealth), Some(&105));
}

// ============================================================
// Modifier stack
// ============================================================

#[test]
fn daily_effects_stack_after_three_completions() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    for i in 0..3 {
        award(&engine, &mut state, &wisdom_task(&format!("w{}", i), 10.0), &at(19, 9 + i));
    }
    let active: Vec<&str> = state
        .ledger
        .daily_cache
        .active(day(19))
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert!(active.contains(&"warmed-up"));
    assert!(active.contains(&"focus-wisdom"));

    // 200 × 1.05 (warmed-up) × 1.10 (focus-wisdom)
    let (outcome, _) = award(&engine, &mut state, &wisdom_task("w3", 200.0), &at(19, 13));
    assert_eq!(outcome.applied.get(&BranchId::Wisdom), Some(&231));
}

#[test]
fn stale_daily_cache_is_ignored() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    for i in 0..3 {
        award(&engine, &mut state, &wisdom_task(&format!("w{}", i), 10.0), &at(19, 9 + i));
    }
    assert!(!state.ledger.daily_cache.active(day(19)).is_empty());
    assert!(state.ledger.daily_cache.active(day(20)).is_empty());

    let m = modifiers::multipliers(&state.ledger, engine.rules(), day(20));
    assert_eq!(m.global, 1.0);
    assert_eq!(m.branch(BranchId::Wisdom), 1.0);
}

#[test]
fn non_positive_multipliers_are_ignored() {
    let mut rules = Rulebook::standard();
    rules.daily.push(DailyRule {
        id: "broken".into(),
        label: "Broken".into(),
        trigger: DailyTrigger::DoneToday(1),
        target: Target::Global,
        mult: 0.0,
    });
    let engine = quiet_engine().with_rules(rules);
    let mut state = ProgressionState::new();

    award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 9));
    let (outcome, _) = award(&engine, &mut state, &wisdom_task("b", 10.0), &at(19, 10));

    assert_eq!(outcome.applied.get(&BranchId::Wisdom), Some(&10));
}

#[test]
fn resolve_only_returns_input_keys() {
    let engine = quiet_engine();
    let mut ledger = BranchLedger::new();
    ledger.owned_perks.insert("iron-body".into());
    ledger.owned_perks.insert("polymath".into());

    let awards = questlog_core::AwardMap::normalize([("wisdom", 40.0)]);
    let resolved = modifiers::resolve(&ledger, engine.rules(), day(19), &awards);

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved.get(&BranchId::Wisdom), Some(&42));
}

// ============================================================
// Perk and synergy unlocks
// ============================================================

#[test]
fn mastery_perk_unlocks_at_branch_level_three() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();

    let (first, _) = award(&engine, &mut state, &wisdom_task("a", 399.0), &at(19, 9));
    assert!(first.unlocks.perks.is_empty());

    let (second, _) = award(&engine, &mut state, &wisdom_task("b", 1.0), &at(19, 10));
    assert_eq!(second.unlocks.perks, vec!["scholar".to_string()]);
    assert!(state.ledger.owns("scholar"));
}

#[test]
fn tiered_perk_climbs_with_level() {
    let engine = quiet_engine();
    let mut ledger = BranchLedger::new();
    let levels = &engine.config().levels;

    // level 5
    ledger.set_xp(BranchId::Wisdom, 1600);
    let report = unlocks::apply_unlocks(&mut ledger, engine.rules(), levels);
    assert!(report.perks.contains(&"deep-focus".to_string()));
    assert_eq!(ledger.tier("deep-focus"), 1);

    // level 7
    ledger.set_xp(BranchId::Wisdom, 3600);
    let report = unlocks::apply_unlocks(&mut ledger, engine.rules(), levels);
    assert_eq!(report.tier_ups, vec![("deep-focus".to_string(), 2)]);
    assert_eq!(ledger.tier("deep-focus"), 2);

    // way past the cap
    ledger.set_xp(BranchId::Wisdom, 1_000_000);
    unlocks::apply_unlocks(&mut ledger, engine.rules(), levels);
    assert_eq!(ledger.tier("deep-focus"), 5);
}

#[test]
fn synergy_unlocks_when_both_branches_qualify() {
    let engine = quiet_engine();
    let mut ledger = BranchLedger::new();
    ledger.set_xp(BranchId::Health, 500);
    ledger.set_xp(BranchId::Wisdom, 499);
    let levels = &engine.config().levels;

    assert!(unlocks::apply_unlocks(&mut ledger, engine.rules(), levels).synergies.is_empty());

    ledger.set_xp(BranchId::Wisdom, 500);
    let report = unlocks::apply_unlocks(&mut ledger, engine.rules(), levels);
    assert_eq!(report.synergies, vec!["sound-mind".to_string()]);

    // never revoked
    ledger.set_xp(BranchId::Health, 0);
    unlocks::apply_unlocks(&mut ledger, engine.rules(), levels);
    assert!(ledger.synergies.contains("sound-mind"));
}

#[test]
fn grant_perk_ignores_unknown_ids() {
    let rules = Rulebook::standard();
    let mut ledger = BranchLedger::new();
    assert!(!unlocks::grant_perk(&mut ledger, &rules, "no-such-perk"));
    assert!(unlocks::grant_perk(&mut ledger, &rules, "momentum"));
    assert!(!unlocks::grant_perk(&mut ledger, &rules, "momentum"));
    assert_eq!(ledger.perk_tiers.get("momentum"), Some(&1));
}

// ============================================================
// Decay
// ============================================================

fn health_decay(per_day: u64, floor: u64) -> DecayConfig {
    DecayConfig {
        rules: vec![DecayRule { branch: BranchId::Health, per_day, floor }],
    }
}

#[test]
fn decay_first_run_counts_zero_days() {
    let mut ledger = BranchLedger::new();
    ledger.set_xp(BranchId::Health, 100);

    let report = ledger.apply_decay(day(19), &health_decay(5, 0));

    assert!(!report.changed);
    assert_eq!(report.days_elapsed, 0);
    assert_eq!(ledger.xp(BranchId::Health), 100);
    assert_eq!(ledger.last_decay, Some(day(19)));
}

#[test]
fn decay_is_idempotent_within_a_day() {
    let mut ledger = BranchLedger::new();
    ledger.set_xp(BranchId::Health, 100);
    ledger.last_decay = Some(day(17));
    let config = health_decay(5, 0);

    let first = ledger.apply_decay(day(19), &config);
    assert!(first.changed);
    assert_eq!(first.days_elapsed, 2);
    assert_eq!(ledger.xp(BranchId::Health), 90);

    let second = ledger.apply_decay(day(19), &config);
    assert!(!second.changed);
    assert_eq!(ledger.xp(BranchId::Health), 90);
}

#[test]
fn decay_stops_at_floor() {
    let mut ledger = BranchLedger::new();
    ledger.set_xp(BranchId::Health, 30);
    ledger.last_decay = Some(day(1));

    ledger.apply_decay(day(11), &health_decay(5, 20));
    assert_eq!(ledger.xp(BranchId::Health), 20);

    // already below the floor: untouched
    let mut low = BranchLedger::new();
    low.set_xp(BranchId::Health, 10);
    low.last_decay = Some(day(1));
    low.apply_decay(day(11), &health_decay(5, 20));
    assert_eq!(low.xp(BranchId::Health), 10);
}

#[test]
fn decay_with_backwards_clock_counts_zero_days() {
    let mut ledger = BranchLedger::new();
    ledger.set_xp(BranchId::Health, 100);
    ledger.last_decay = Some(day(20));

    let report = ledger.apply_decay(day(18), &health_decay(5, 0));

    assert!(!report.changed);
    assert_eq!(report.days_elapsed, 0);
    assert_eq!(ledger.last_decay, Some(day(18)));
}

#[test]
fn award_decays_before_growth() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    state.ledger.set_xp(BranchId::Health, 50);
    state.ledger.last_decay = Some(day(17));

    let task = TaskRecord::new("run", 10).award("health", 10.0);
    let (outcome, _) = award(&engine, &mut state, &task, &at(19, 7));

    // default rule: health -5/day over 2 days, then +10
    assert!(outcome.decay.changed);
    assert_eq!(state.ledger.xp(BranchId::Health), 50);
    assert!(outcome.reverted.is_empty());
}

// ============================================================
// Completion counters and the dominant branch
// ============================================================

#[test]
fn three_way_split_counts_no_branch() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let task = TaskRecord::new("mix", 10)
        .award("wisdom", 10.0)
        .award("health", 10.0)
        .award("craft", 10.0);

    award(&engine, &mut state, &task, &at(19, 12));

    assert_eq!(state.counters.lifetime_total, 1);
    assert!(state.counters.lifetime_by_branch.is_empty());
    assert_eq!(state.counters.today_total(day(19)), 1);
}

#[test]
fn counters_roll_over_at_midnight() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 23));
    award(&engine, &mut state, &wisdom_task("b", 10.0), &at(20, 0));

    assert_eq!(state.counters.today_total(day(20)), 1);
    assert_eq!(state.counters.today(day(20), BranchId::Wisdom), 1);
    assert_eq!(state.counters.lifetime(BranchId::Wisdom), 2);
}

// ============================================================
// Achievements
// ============================================================

#[test]
fn first_completion_unlocks_first_steps_once() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();

    let (outcome, global) = award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 12));
    assert!(outcome.achievements.iter().any(|u| u.id == "first-steps"));
    // task base 10 + first-steps reward 10
    assert_eq!(global, 20);
    // the reward is not a completion
    assert_eq!(state.counters.lifetime_total, 1);

    let (again, _) = award(&engine, &mut state, &wisdom_task("b", 10.0), &at(19, 13));
    assert!(!again.achievements.iter().any(|u| u.id == "first-steps"));
    let count = state.achievements.unlocked.iter().filter(|u| u.id == "first-steps").count();
    assert_eq!(count, 1);
}

#[test]
fn evaluating_twice_unlocks_nothing_new() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 12));

    let mut total = 0u64;
    let unlocked = engine.evaluate_achievements(&mut state, &at(19, 12), &mut |d: u64| total += d, 0);
    assert!(unlocked.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn depth_guard_suppresses_evaluation() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    let options = AwardOptions {
        depth: MAX_AWARD_DEPTH,
        ..AwardOptions::default()
    };

    let outcome = engine.award_for_task(&mut state, &wisdom_task("a", 10.0), &at(19, 12), &mut |_d: u64| {}, options);

    assert!(outcome.achievements.is_empty());
    assert!(state.achievements.unlocked.is_empty());
}

#[test]
fn suppressed_award_skips_achievements() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    let options = AwardOptions::default().without_achievements();

    engine.award_for_task(&mut state, &wisdom_task("a", 10.0), &at(19, 12), &mut |_d: u64| {}, options);

    assert!(state.achievements.unlocked.is_empty());
    assert_eq!(state.counters.lifetime_total, 1);
}

#[test]
fn branch_combo_unlocks_from_todays_counters() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    award(&engine, &mut state, &wisdom_task("a", 10.0), &at(19, 9));
    assert!(!state.achievements.has(Scope::Daily, "combo-wisdom"));

    let (outcome, _) = award(&engine, &mut state, &wisdom_task("b", 10.0), &at(19, 10));
    assert!(outcome.achievements.iter().any(|u| u.id == "combo-wisdom"));
    assert!(state.achievements.has(Scope::Daily, "combo-wisdom"));
    assert!(!state.achievements.has(Scope::Daily, "combo-health"));
}

#[test]
fn daily_window_resets_on_new_day() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    for i in 0..3 {
        award(&engine, &mut state, &wisdom_task(&format!("a{}", i), 10.0), &at(19, 9 + i));
    }
    assert!(state.achievements.has(Scope::Daily, "daily-three"));

    award(&engine, &mut state, &wisdom_task("b0", 10.0), &at(20, 9));
    assert!(!state.achievements.has(Scope::Daily, "daily-three"));
    assert_eq!(state.achievements.last_daily_key, Some(day(20)));

    award(&engine, &mut state, &wisdom_task("b1", 10.0), &at(20, 10));
    award(&engine, &mut state, &wisdom_task("b2", 10.0), &at(20, 11));
    assert!(state.achievements.has(Scope::Daily, "daily-three"));
    let count = state.achievements.ephemeral_daily.iter().filter(|u| u.id == "daily-three").count();
    assert_eq!(count, 1);
}

#[test]
fn reset_windows_only_clears_on_key_change() {
    let mut achievements = AchievementState::default();
    let first = achievements.reset_windows(day(19), day(19).week());
    assert!(first.daily && first.weekly);

    let same = achievements.reset_windows(day(19), day(19).week());
    assert_eq!(same, WindowReset::default());

    // Tuesday, same ISO week
    let next = achievements.reset_windows(day(20), day(20).week());
    assert!(next.daily);
    assert!(!next.weekly);

    // Monday of the following week
    let week = achievements.reset_windows(day(26), day(26).week());
    assert!(week.daily && week.weekly);
}

#[test]
fn weekly_global_xp_accumulates_across_days() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    award(&engine, &mut state, &TaskRecord::new("big-a", 300), &at(19, 9));
    assert!(!state.achievements.has(Scope::Weekly, "weekly-grind"));

    award(&engine, &mut state, &TaskRecord::new("big-b", 300), &at(21, 9));
    assert!(state.achievements.has(Scope::Weekly, "weekly-grind"));
}

#[test]
fn streak_tier_unlocks_after_consecutive_days() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    for d in 19..=21 {
        award(&engine, &mut state, &wisdom_task(&format!("d{}", d), 10.0), &at(d, 12));
    }
    assert!(state.achievements.has(Scope::Life, "streak-3"));
    assert!(!state.achievements.has(Scope::Life, "streak-7"));
}

#[test]
fn night_owl_grants_its_perk() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    award(&engine, &mut state, &wisdom_task("late", 10.0), &at(19, 2));

    assert!(state.achievements.has(Scope::Life, "night-owl"));
    assert!(state.ledger.owns("night-shift"));
    assert!(!state.achievements.has(Scope::Life, "early-bird"));
}

#[test]
fn level_achievement_reads_tick_level() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    let tick = Tick::on(day(19), 12, 5);
    award(&engine, &mut state, &wisdom_task("a", 10.0), &tick);

    assert!(state.achievements.has(Scope::Life, "level-5"));
    assert!(!state.achievements.has(Scope::Life, "level-10"));
}

#[test]
fn branch_threshold_reward_lands_on_its_branch() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    state.counters.lifetime_by_branch.insert(BranchId::Craft, 9);
    state.counters.lifetime_total = 9;

    let task = TaskRecord::new("c", 10).award("craft", 10.0);
    let (outcome, _) = award(&engine, &mut state, &task, &at(19, 12));

    assert!(outcome.achievements.iter().any(|u| u.id == "craft-adept"));
    // 10 from the task, 25 from the adept reward
    assert_eq!(state.ledger.xp(BranchId::Craft), 35);
}

#[test]
fn hour_mask_is_half_open_and_wraps() {
    assert_eq!(hour_mask(0, 4), 0b1111);
    assert_eq!(hour_mask(5, 5), 0);
    let wrap = hour_mask(22, 2);
    for h in [22, 23, 0, 1] {
        assert_ne!(wrap & (1 << h), 0, "hour {}", h);
    }
    assert_eq!(wrap & (1 << 2), 0);
    assert_eq!(wrap.count_ones(), 4);
}

#[test]
fn streak_counts_from_yesterday_until_today_qualifies() {
    let mut log = ActivityLog::default();
    for d in [16, 17, 18] {
        log.record(&at(d, 12), true, 10, 10);
    }
    assert_eq!(log.streak(day(19), 1, 60), 3);

    log.record(&at(19, 12), true, 10, 10);
    assert_eq!(log.streak(day(19), 1, 60), 4);

    // a gap breaks it
    assert_eq!(log.streak(day(21), 1, 60), 0);
    // lookback bound
    assert_eq!(log.streak(day(19), 1, 2), 2);
}

#[test]
fn activity_prune_drops_old_days() {
    let mut log = ActivityLog::default();
    log.record(&at(1, 12), true, 10, 0);
    log.record(&at(19, 12), true, 10, 0);

    log.prune(day(19), 10);

    assert!(log.day(day(1)).is_none());
    assert!(log.day(day(19)).is_some());
}

#[test]
fn weekly_summary_saturates_instead_of_overflowing() {
    let mut log = ActivityLog::default();
    for d in [20, 21] {
        log.days.insert(
            day(d),
            DayTally {
                completions: u32::MAX,
                global_xp: u64::MAX,
                branch_xp: u64::MAX,
                hours: 1,
            },
        );
    }

    let summary = Summary::build(&CompletionCounters::default(), &log, &at(21, 12), 1, 30);
    assert_eq!(summary.done_this_week, u32::MAX);
    assert_eq!(summary.week_global_xp, u64::MAX);
    assert_eq!(summary.week_branch_xp, u64::MAX);
}

// ============================================================
// Milestone escrow
// ============================================================

fn milestone(id: &str, weight: f64) -> Subtask {
    Subtask {
        id: id.to_string(),
        is_milestone: true,
        milestone_weight: weight,
        ..Subtask::default()
    }
}

fn escrow_task() -> TaskRecord {
    let mut task = TaskRecord::new("book", 100).award("craft", 100.0);
    task.escrow.mode = EscrowMode::Milestone;
    task.subtasks = vec![milestone("draft", 40.0), milestone("edit", 60.0)];
    task
}

#[test]
fn milestones_pay_in_installments_then_bonus() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let mut task = escrow_task();
    assert!(due_payouts(&task).is_empty());

    task.subtasks[0].done = true;
    let mut global = 0u64;
    let first = engine.settle(&mut state, &mut task, &at(19, 9), &mut |d: u64| global += d);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].payout.key, "book:milestone:draft");
    assert_eq!(first[0].payout.base_global, 40);
    assert_eq!(state.ledger.xp(BranchId::Craft), 40);
    assert!(task.subtasks[0].paid);
    // installments are not completions
    assert_eq!(state.counters.lifetime_total, 0);

    task.subtasks[1].done = true;
    let second = engine.settle(&mut state, &mut task, &at(19, 10), &mut |d: u64| global += d);
    let kinds: Vec<PayoutKind> = second.iter().map(|s| s.payout.kind).collect();
    assert_eq!(kinds, vec![PayoutKind::Milestone, PayoutKind::Final]);
    assert_eq!(second[0].payout.base_global, 60);
    assert_eq!(second[1].payout.base_global, 15);
    assert_eq!(second[1].payout.bonus, 15);
    assert_eq!(global, 115);
    assert_eq!(state.ledger.xp(BranchId::Craft), 115);
    assert!(task.escrow.paid);
    assert_eq!(state.counters.lifetime_total, 1);

    assert!(due_payouts(&task).is_empty());
}

#[test]
fn planner_does_not_mutate_task() {
    let mut task = escrow_task();
    task.subtasks[0].done = true;
    let before = task.clone();

    let first = due_payouts(&task);
    let second = due_payouts(&task);

    assert_eq!(task, before);
    assert_eq!(first, second);
}

#[test]
fn end_mode_pays_once_when_done() {
    let mut task = TaskRecord::new("report", 50).award("wisdom", 30.0);
    task.escrow.mode = EscrowMode::End;
    assert!(due_payouts(&task).is_empty());

    task.done = true;
    let due = due_payouts(&task);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].kind, PayoutKind::Final);
    assert_eq!(due[0].portion, 1.0);
    assert_eq!(due[0].base_global, 50);
    assert_eq!(due[0].branch_awards, BTreeMap::from([(BranchId::Wisdom, 30)]));

    assert!(mark_paid(&mut task, &due[0]));
    assert!(due_payouts(&task).is_empty());
}

#[test]
fn milestone_mode_without_checkpoints_acts_like_end() {
    let mut task = TaskRecord::new("plain", 20).done();
    task.escrow.mode = EscrowMode::Milestone;

    let due = due_payouts(&task);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].portion, 1.0);
    assert!(!due[0].allow_zero_base);
}

#[test]
fn final_payout_appears_at_most_once() {
    let mut task = escrow_task();
    task.subtasks[0].milestone_weight = 80.0;
    task.subtasks[1].milestone_weight = 80.0;
    for sub in &mut task.subtasks {
        sub.done = true;
    }

    let due = due_payouts(&task);
    assert_eq!(due.iter().filter(|p| p.kind == PayoutKind::Final).count(), 1);
    for payout in &due {
        assert!(payout.portion > 0.0 && payout.portion <= 1.0);
    }
}

#[test]
fn unusable_weights_are_skipped() {
    let mut task = escrow_task();
    task.subtasks = vec![milestone("zero", 0.0), milestone("neg", -10.0), milestone("huge", 250.0)];
    for sub in &mut task.subtasks {
        sub.done = true;
    }

    let due = due_payouts(&task);
    let milestones: Vec<&MilestonePayout> = due.iter().filter(|p| p.kind == PayoutKind::Milestone).collect();
    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].portion, 1.0);
}

#[test]
fn unnamed_milestones_are_keyed_by_position() {
    let mut task = escrow_task();
    task.subtasks[1].id.clear();
    task.subtasks[1].done = true;

    let due = due_payouts(&task);
    assert_eq!(due[0].key, "book:milestone:#1");
    assert!(mark_paid(&mut task, &due[0]));
    assert!(task.subtasks[1].paid);
}

#[test]
fn subtask_base_feeds_the_bonus() {
    let mut task = escrow_task();
    task.subtasks[0].done = true;
    task.subtasks[0].base_xp = Some(400);
    task.subtasks[1].done = true;

    let due = due_payouts(&task);
    let last = due.last().unwrap();
    assert_eq!(last.kind, PayoutKind::Final);
    // min(0.5 × 100, 0.15 × (400 + 60))
    assert_eq!(last.bonus, 50);
}

#[test]
fn early_finish_settles_remaining_checkpoints_once() {
    let engine = quiet_engine();
    let mut state = ProgressionState::new();
    let mut task = escrow_task();
    task.subtasks[0].done = true;
    task.done = true;

    let mut global = 0u64;
    let first = engine.settle(&mut state, &mut task, &at(19, 9), &mut |d: u64| global += d);
    let kinds: Vec<PayoutKind> = first.iter().map(|s| s.payout.kind).collect();
    assert_eq!(kinds, vec![PayoutKind::Milestone, PayoutKind::Final]);
    // 40 + remaining 60 + bonus min(50, 0.15 × 40)
    assert_eq!(global, 106);
    assert!(task.escrow.paid);

    // the open checkpoint's share went out with the final payout
    task.subtasks[1].done = true;
    assert!(due_payouts(&task).is_empty());
    let second = engine.settle(&mut state, &mut task, &at(19, 10), &mut |d: u64| global += d);
    assert!(second.is_empty());
    assert_eq!(global, 106);
    assert_eq!(state.ledger.xp(BranchId::Craft), 106);
    assert!(!task.subtasks[1].paid);
}

#[test]
fn zero_base_fully_weighted_task_has_no_final_payout() {
    let mut task = escrow_task();
    task.base_xp = 0;
    for sub in &mut task.subtasks {
        sub.done = true;
    }

    let due = due_payouts(&task);
    assert_eq!(due.len(), 2);
    assert!(due.iter().all(|p| p.kind == PayoutKind::Milestone));
    assert_eq!(due[0].branch_awards, BTreeMap::from([(BranchId::Craft, 40)]));
    assert_eq!(due[1].branch_awards, BTreeMap::from([(BranchId::Craft, 60)]));
}

// ============================================================
// Config and snapshots
// ============================================================

#[test]
fn config_missing_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::load(&tmp.path().join("nope.toml"));
    assert_eq!(config.levels.level_step, 100);
    assert_eq!(config.decay.rules.len(), 2);
}

#[test]
fn config_partial_file_keeps_other_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("questlog.toml");
    fs::write(&path, "[levels]\nlevel_step = 50\n").unwrap();

    let config = EngineConfig::load(&path);
    assert_eq!(config.levels.level_step, 50);
    assert_eq!(config.streak.lookback_days, 60);
    assert_eq!(config.activity.retention_days, 120);
}

#[test]
fn config_invalid_file_falls_back() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("questlog.toml");
    fs::write(&path, "levels = [[[").unwrap();

    let config = EngineConfig::load(&path);
    assert_eq!(config.levels.level_step, 100);
    assert!(EngineConfig::parse("levels = [[[").is_err());
}

#[test]
fn config_default_renders_and_parses_back() {
    let rendered = EngineConfig::default().to_toml();
    let parsed = EngineConfig::parse(&rendered).unwrap();
    assert_eq!(parsed.levels.level_step, 100);
    assert_eq!(parsed.decay_rule(BranchId::Health).map(|r| r.per_day), Some(5));
    assert!(parsed.decay_rule(BranchId::Craft).is_none());
}

#[test]
fn level_curve() {
    let levels = EngineConfig::default().levels;
    assert_eq!(levels.level_for(0), 1);
    assert_eq!(levels.level_for(99), 1);
    assert_eq!(levels.level_for(100), 2);
    assert_eq!(levels.level_for(400), 3);
    assert_eq!(levels.level_for(1600), 5);
}

#[test]
fn state_survives_json_snapshot() {
    let engine = ProgressionEngine::default();
    let mut state = ProgressionState::new();
    for i in 0..3 {
        award(&engine, &mut state, &wisdom_task(&format!("a{}", i), 10.0), &at(19, 9 + i));
    }

    let json = serde_json::to_string(&state).unwrap();
    let back: ProgressionState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ledger.xp, state.ledger.xp);
    assert_eq!(back.ledger.last_decay, Some(day(19)));
    assert_eq!(back.counters, state.counters);
    assert_eq!(back.activity, state.activity);
    assert_eq!(back.achievements, state.achievements);
    let ids = |s: &ProgressionState| -> Vec<String> {
        s.ledger.daily_cache.items.iter().map(|e| e.id.clone()).collect()
    };
    assert_eq!(ids(&back), ids(&state));
}

#[test]
fn empty_snapshot_hydrates_zero_filled() {
    let state: ProgressionState = serde_json::from_str("{}").unwrap();
    assert_eq!(state.ledger.snapshot().map(|(_, xp)| xp), [0; 6]);
    assert_eq!(state.ledger.xp.len(), 6);
}
