//! Core types for Questlog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the six fixed skill branches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchId {
    Health,
    Wisdom,
    Craft,
    Social,
    Wealth,
    Spirit,
}

/// Alternate spellings accepted in task award maps. Canonical names are
/// matched before this table is consulted.
const BRANCH_ALIASES: &[(&str, BranchId)] = &[
    ("body", BranchId::Health),
    ("fitness", BranchId::Health),
    ("str", BranchId::Health),
    ("strength", BranchId::Health),
    ("vit", BranchId::Health),
    ("mind", BranchId::Wisdom),
    ("int", BranchId::Wisdom),
    ("intellect", BranchId::Wisdom),
    ("learning", BranchId::Wisdom),
    ("knowledge", BranchId::Wisdom),
    ("work", BranchId::Craft),
    ("skill", BranchId::Craft),
    ("career", BranchId::Craft),
    ("dex", BranchId::Craft),
    ("creativity", BranchId::Craft),
    ("cha", BranchId::Social),
    ("charisma", BranchId::Social),
    ("people", BranchId::Social),
    ("friends", BranchId::Social),
    ("relationships", BranchId::Social),
    ("money", BranchId::Wealth),
    ("finance", BranchId::Wealth),
    ("gold", BranchId::Wealth),
    ("luck", BranchId::Wealth),
    ("soul", BranchId::Spirit),
    ("mindfulness", BranchId::Spirit),
    ("calm", BranchId::Spirit),
    ("faith", BranchId::Spirit),
];

impl BranchId {
    pub const ALL: [BranchId; 6] = [
        BranchId::Health,
        BranchId::Wisdom,
        BranchId::Craft,
        BranchId::Social,
        BranchId::Wealth,
        BranchId::Spirit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BranchId::Health => "health",
            BranchId::Wisdom => "wisdom",
            BranchId::Craft => "craft",
            BranchId::Social => "social",
            BranchId::Wealth => "wealth",
            BranchId::Spirit => "spirit",
        }
    }

    /// Case-insensitive lookup over canonical names and the alias table.
    pub fn resolve(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == key)
            .or_else(|| {
                BRANCH_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, b)| *b)
            })
    }
}

impl std::fmt::Display for BranchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BranchId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::resolve(s).ok_or_else(|| crate::Error::UnknownBranch(s.to_string()))
    }
}

/// A normalized branch award map: canonical branches only, every amount
/// finite and strictly positive.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AwardMap(BTreeMap<BranchId, f64>);

impl AwardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw `(key, amount)` pairs into canonical branches. Unknown keys
    /// and non-positive or non-finite amounts are dropped; aliases of the
    /// same branch are summed.
    pub fn normalize<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut out = BTreeMap::new();
        for (key, amount) in raw {
            if !amount.is_finite() || amount <= 0.0 {
                continue;
            }
            if let Some(branch) = BranchId::resolve(key) {
                *out.entry(branch).or_insert(0.0) += amount;
            }
        }
        Self(out)
    }

    /// Insert directly from canonical branches; same drop rules as `normalize`.
    pub fn from_branches<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (BranchId, f64)>,
    {
        let mut out = BTreeMap::new();
        for (branch, amount) in entries {
            if amount.is_finite() && amount > 0.0 {
                *out.entry(branch).or_insert(0.0) += amount;
            }
        }
        Self(out)
    }

    pub fn get(&self, branch: BranchId) -> Option<f64> {
        self.0.get(&branch).copied()
    }

    pub fn contains(&self, branch: BranchId) -> bool {
        self.0.contains_key(&branch)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BranchId, f64)> + '_ {
        self.0.iter().map(|(b, v)| (*b, *v))
    }

    pub fn branches(&self) -> impl Iterator<Item = BranchId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// The branch holding at least half of the total. On an exact 50/50
    /// split the earlier branch in canonical order wins.
    pub fn dominant(&self) -> Option<BranchId> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        self.0
            .iter()
            .filter(|(_, v)| **v / total >= 0.5)
            .fold(None, |best: Option<(BranchId, f64)>, (b, v)| match best {
                Some((_, bv)) if bv >= *v => best,
                _ => Some((*b, *v)),
            })
            .map(|(b, _)| b)
    }

    /// Scale every entry by `portion` and round each independently.
    /// Entries that round to zero are omitted.
    pub fn scaled(&self, portion: f64) -> BTreeMap<BranchId, u64> {
        self.0
            .iter()
            .filter_map(|(b, v)| {
                let amount = (v * portion).round();
                (amount >= 1.0).then_some((*b, amount as u64))
            })
            .collect()
    }
}

/// Reward attached to an achievement: a global amount plus per-branch amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub global: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branches: BTreeMap<BranchId, u64>,
}

impl Reward {
    pub fn global(amount: u64) -> Self {
        Self {
            global: amount,
            branches: BTreeMap::new(),
        }
    }

    pub fn with_branch(mut self, branch: BranchId, amount: u64) -> Self {
        self.branches.insert(branch, amount);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.global == 0 && self.branches.values().all(|v| *v == 0)
    }
}
