//! Milestone escrow planner
//!
//! Works out which installments of a task's reward are due right now. The
//! planner reads the task and nothing else; marking installments paid is
//! the caller's job (`mark_paid`, then persist the task).

use crate::award::{AwardOptions, AwardOutcome, GlobalXpSink};
use crate::engine::ProgressionEngine;
use crate::state::ProgressionState;
use questlog_core::{AwardMap, BranchId, EscrowMode, RawAwards, TaskRecord, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Share of the parent's base reward the finishing bonus may reach.
const BONUS_PARENT_CAP: f64 = 0.5;
/// Share of completed subtask rewards paid as finishing bonus.
const BONUS_SUBTASK_RATE: f64 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutKind {
    Milestone,
    Final,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilestonePayout {
    pub key: String,
    pub kind: PayoutKind,
    /// Fraction of the task's declared reward, in `(0, 1]`.
    pub portion: f64,
    pub base_global: u64,
    pub branch_awards: BTreeMap<BranchId, u64>,
    /// Subtask this installment belongs to (milestone kind only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask: Option<String>,
    /// Finishing bonus folded into a final payout.
    #[serde(default)]
    pub bonus: u64,
    /// Scaled installments skip the minimum-of-one global floor.
    #[serde(default)]
    pub allow_zero_base: bool,
}

impl MilestonePayout {
    fn new(key: String, kind: PayoutKind, portion: f64, base: f64, awards: &AwardMap) -> Self {
        Self {
            key,
            kind,
            portion,
            base_global: (base * portion).round().max(0.0) as u64,
            branch_awards: awards.scaled(portion),
            subtask: None,
            bonus: 0,
            allow_zero_base: true,
        }
    }

    /// The task record handed to the award orchestrator for this installment.
    pub fn to_task(&self, parent: &TaskRecord) -> TaskRecord {
        TaskRecord {
            id: self.key.clone(),
            base_xp: self.base_global.min(i64::MAX as u64) as i64,
            xp_awards: RawAwards::from_branches(&self.branch_awards),
            done: true,
            allow_zero_base: self.allow_zero_base || parent.allow_zero_base,
            ..TaskRecord::default()
        }
    }

    pub fn award_options(&self) -> AwardOptions {
        match self.kind {
            PayoutKind::Milestone => AwardOptions::installment(),
            PayoutKind::Final => AwardOptions::default(),
        }
    }
}

fn subtask_key(task_id: &str, index: usize, id: &str) -> String {
    if id.is_empty() {
        format!("{}:milestone:#{}", task_id, index)
    } else {
        format!("{}:milestone:{}", task_id, id)
    }
}

fn final_key(task: &TaskRecord) -> String {
    format!("{}:final", task.id)
}

/// Portion for a checkpoint weight given in percent; `None` if unusable.
fn weight_portion(weight: f64) -> Option<f64> {
    (weight.is_finite() && weight > 0.0).then(|| (weight / 100.0).min(1.0))
}

/// Installments currently due for `task`.
pub fn due_payouts(task: &TaskRecord) -> Vec<MilestonePayout> {
    let awards = task.xp_awards.normalize();
    let base = task.base_xp.max(0) as f64;
    let has_milestones = task.milestones().next().is_some();

    if task.escrow.mode != EscrowMode::Milestone || !has_milestones {
        if task.done && !task.escrow.paid {
            let mut payout = MilestonePayout::new(final_key(task), PayoutKind::Final, 1.0, base, &awards);
            payout.allow_zero_base = task.allow_zero_base;
            return vec![payout];
        }
        return Vec::new();
    }

    // the final payout already carried every unpaid checkpoint's share
    if task.escrow.paid {
        return Vec::new();
    }

    let mut due = Vec::new();
    let mut allocated = 0.0;
    let mut all_resolved = true;
    let mut completed_subtask_base = 0.0;

    for (index, sub) in task.subtasks.iter().enumerate() {
        let portion = sub.is_milestone.then(|| weight_portion(sub.milestone_weight)).flatten();

        if sub.done {
            let own_base = sub
                .base_xp
                .map(|b| b.max(0) as f64)
                .or_else(|| portion.map(|p| (base * p).round()))
                .unwrap_or(0.0);
            completed_subtask_base += own_base;
        }

        if !sub.is_milestone {
            continue;
        }
        if !sub.done {
            all_resolved = false;
            continue;
        }
        let Some(portion) = portion else {
            continue;
        };
        allocated += portion;
        if !sub.paid {
            let mut payout = MilestonePayout::new(
                subtask_key(&task.id, index, &sub.id),
                PayoutKind::Milestone,
                portion,
                base,
                &awards,
            );
            payout.subtask = Some(sub.id.clone());
            due.push(payout);
        }
    }

    if all_resolved || task.done {
        let remainder = (1.0 - allocated).max(0.0);
        let bonus = if base > 0.0 {
            (BONUS_PARENT_CAP * base).min(BONUS_SUBTASK_RATE * completed_subtask_base).round()
        } else {
            0.0
        };
        let bonus_portion = if base > 0.0 { bonus / base } else { 0.0 };
        let portion = (remainder + bonus_portion).min(1.0);
        if portion > 0.0 {
            let mut payout = MilestonePayout::new(final_key(task), PayoutKind::Final, portion, base, &awards);
            payout.bonus = bonus as u64;
            due.push(payout);
        }
    }

    due
}

/// Record a delivered installment on the task. Returns false if the payout
/// does not belong to this task's current shape.
pub fn mark_paid(task: &mut TaskRecord, payout: &MilestonePayout) -> bool {
    match payout.kind {
        PayoutKind::Final => {
            task.escrow.paid = true;
            true
        }
        PayoutKind::Milestone => {
            let task_id = task.id.clone();
            let target = task
                .subtasks
                .iter_mut()
                .enumerate()
                .find(|(i, s)| s.is_milestone && subtask_key(&task_id, *i, &s.id) == payout.key);
            match target {
                Some((_, sub)) => {
                    sub.paid = true;
                    true
                }
                None => false,
            }
        }
    }
}

/// One delivered installment and what it did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub payout: MilestonePayout,
    pub outcome: AwardOutcome,
}

impl ProgressionEngine {
    /// Plan, award and mark every installment currently due on `task`.
    /// The caller persists both the state and the updated task.
    pub fn settle(
        &self,
        state: &mut ProgressionState,
        task: &mut TaskRecord,
        tick: &Tick,
        sink: &mut dyn GlobalXpSink,
    ) -> Vec<Settlement> {
        let mut settled = Vec::new();
        for payout in due_payouts(task) {
            let installment = payout.to_task(task);
            let outcome = self.award_for_task(state, &installment, tick, sink, payout.award_options());
            mark_paid(task, &payout);
            info!("Paid {} ({:.0}% of {})", payout.key, payout.portion * 100.0, task.id);
            settled.push(Settlement { payout, outcome });
        }
        settled
    }
}
