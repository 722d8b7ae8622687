//! Completion counters, per-day activity tallies and the statistics summary
//!
//! Counters are keyed off the dominant branch of each completed task. The
//! activity log keeps a bounded window of per-day tallies for streaks,
//! weekly totals and hour-of-day checks. `Summary` is the single read-only
//! view achievement predicates are matched against.

use questlog_core::{BranchId, DateKey, Tick, WeekKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Today's and lifetime completion counts, overall and per dominant branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionCounters {
    #[serde(default)]
    pub day: Option<DateKey>,
    #[serde(default)]
    pub today_total: u32,
    #[serde(default)]
    pub today_by_branch: BTreeMap<BranchId, u32>,
    #[serde(default)]
    pub lifetime_total: u64,
    #[serde(default)]
    pub lifetime_by_branch: BTreeMap<BranchId, u64>,
}

impl CompletionCounters {
    /// Reset the "today" half when the calendar day changes.
    pub fn roll(&mut self, today: DateKey) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.today_total = 0;
            self.today_by_branch.clear();
        }
    }

    pub fn record(&mut self, today: DateKey, dominant: Option<BranchId>) {
        self.roll(today);
        self.today_total += 1;
        self.lifetime_total += 1;
        if let Some(branch) = dominant {
            *self.today_by_branch.entry(branch).or_insert(0) += 1;
            *self.lifetime_by_branch.entry(branch).or_insert(0) += 1;
        }
    }

    /// Today's count for `branch`; zero if the counters belong to another day.
    pub fn today(&self, today: DateKey, branch: BranchId) -> u32 {
        if self.day != Some(today) {
            return 0;
        }
        self.today_by_branch.get(&branch).copied().unwrap_or(0)
    }

    pub fn today_total(&self, today: DateKey) -> u32 {
        if self.day == Some(today) {
            self.today_total
        } else {
            0
        }
    }

    pub fn lifetime(&self, branch: BranchId) -> u64 {
        self.lifetime_by_branch.get(&branch).copied().unwrap_or(0)
    }
}

/// One calendar day of activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTally {
    #[serde(default)]
    pub completions: u32,
    #[serde(default)]
    pub global_xp: u64,
    #[serde(default)]
    pub branch_xp: u64,
    /// Bit `h` set if a completion happened during hour `h`.
    #[serde(default)]
    pub hours: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    #[serde(default)]
    pub days: BTreeMap<DateKey, DayTally>,
    /// Hours of day that ever saw a completion.
    #[serde(default)]
    pub lifetime_hours: u32,
}

impl ActivityLog {
    /// Add one award to the tally for `tick`'s day. `counted` is false for
    /// awards that are not task completions (milestone installments,
    /// achievement rewards); their XP still counts toward the totals.
    pub fn record(&mut self, tick: &Tick, counted: bool, global_xp: u64, branch_xp: u64) {
        let tally = self.days.entry(tick.today()).or_default();
        tally.global_xp = tally.global_xp.saturating_add(global_xp);
        tally.branch_xp = tally.branch_xp.saturating_add(branch_xp);
        if counted {
            let bit = 1u32 << tick.hour().min(23);
            tally.completions = tally.completions.saturating_add(1);
            tally.hours |= bit;
            self.lifetime_hours |= bit;
        }
    }

    /// Drop tallies older than `retention_days` before `today`.
    pub fn prune(&mut self, today: DateKey, retention_days: u32) {
        let cutoff = today.minus_days(retention_days as i64);
        self.days.retain(|day, _| *day >= cutoff);
    }

    pub fn day(&self, day: DateKey) -> Option<&DayTally> {
        self.days.get(&day)
    }

    fn week_days(&self, week: WeekKey) -> impl Iterator<Item = &DayTally> {
        self.days
            .iter()
            .filter(move |(day, _)| day.week() == week)
            .map(|(_, tally)| tally)
    }

    /// Consecutive trailing days with at least `min` completions, looking
    /// back at most `lookback` days. A today that has not met the bar yet
    /// does not break the streak; counting then starts from yesterday.
    pub fn streak(&self, today: DateKey, min: u32, lookback: u32) -> u32 {
        let min = min.max(1);
        let met = |day: DateKey| self.day(day).map(|t| t.completions >= min).unwrap_or(false);

        let start = if met(today) { 0 } else { 1 };
        let mut streak = 0;
        for offset in start..lookback as i64 {
            if !met(today.minus_days(offset)) {
                break;
            }
            streak += 1;
        }
        streak
    }
}

/// Half-open hour window `[start, end)`, wrapping past midnight when
/// `start > end`. `start == end` is empty.
pub fn hour_mask(start: u32, end: u32) -> u32 {
    let (start, end) = (start.min(24), end.min(24));
    let mut mask = 0u32;
    let mut h = start;
    while h != end {
        if h == 24 {
            h = 0;
            if end == 0 {
                break;
            }
            continue;
        }
        mask |= 1 << h;
        h += 1;
    }
    mask
}

/// Everything achievement predicates may look at, computed once per
/// evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub level: u32,
    pub done_today: u32,
    pub done_this_week: u32,
    pub done_lifetime: u64,
    pub branch_today: BTreeMap<BranchId, u32>,
    pub branch_lifetime: BTreeMap<BranchId, u64>,
    pub hours_today: u32,
    pub hours_week: u32,
    pub hours_lifetime: u32,
    pub week_global_xp: u64,
    pub week_branch_xp: u64,
    pub streak: u32,
}

impl Summary {
    pub fn build(
        counters: &CompletionCounters,
        activity: &ActivityLog,
        tick: &Tick,
        streak_min: u32,
        streak_lookback: u32,
    ) -> Self {
        let today = tick.today();
        let week = tick.week();
        let today_tally = activity.day(today).cloned().unwrap_or_default();

        let (done_this_week, hours_week, week_global_xp, week_branch_xp) = activity
            .week_days(week)
            .fold((0u32, 0u32, 0u64, 0u64), |(n, h, g, b), t| {
                (
                    n.saturating_add(t.completions),
                    h | t.hours,
                    g.saturating_add(t.global_xp),
                    b.saturating_add(t.branch_xp),
                )
            });

        let branch_today = BranchId::ALL
            .iter()
            .map(|b| (*b, counters.today(today, *b)))
            .filter(|(_, n)| *n > 0)
            .collect();

        Self {
            level: tick.level,
            done_today: counters.today_total(today),
            done_this_week,
            done_lifetime: counters.lifetime_total,
            branch_today,
            branch_lifetime: counters.lifetime_by_branch.clone(),
            hours_today: today_tally.hours,
            hours_week,
            hours_lifetime: activity.lifetime_hours,
            week_global_xp,
            week_branch_xp,
            streak: activity.streak(today, streak_min, streak_lookback),
        }
    }

    pub fn branch_today(&self, branch: BranchId) -> u32 {
        self.branch_today.get(&branch).copied().unwrap_or(0)
    }

    pub fn branch_lifetime(&self, branch: BranchId) -> u64 {
        self.branch_lifetime.get(&branch).copied().unwrap_or(0)
    }
}
