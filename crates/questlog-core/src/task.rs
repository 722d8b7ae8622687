//! Task records as handed over by the task store
//!
//! Only the fields the progression engine reads are modelled. Decoding is
//! lenient: a record with a malformed award map or a non-numeric base reward
//! still decodes, with the bad parts coerced to safe defaults.

use crate::lenient;
use crate::types::{AwardMap, BranchId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// The un-normalized branch award map exactly as the task declares it.
/// Non-object input decodes as empty; non-numeric values are dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAwards(Vec<(String, f64)>);

impl RawAwards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.0.push((key.into(), amount));
        self
    }

    pub fn from_branches(map: &BTreeMap<BranchId, u64>) -> Self {
        Self(
            map.iter()
                .map(|(b, v)| (b.as_str().to_string(), *v as f64))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn normalize(&self) -> AwardMap {
        AwardMap::normalize(self.0.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl<'de> Deserialize<'de> for RawAwards {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(map) = value else {
            return Ok(Self::default());
        };
        Ok(Self(
            map.into_iter()
                .filter_map(|(k, v)| lenient::number(&v).map(|n| (k, n)))
                .collect(),
        ))
    }
}

impl Serialize for RawAwards {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// How a task releases its reward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowMode {
    #[default]
    None,
    End,
    Milestone,
}

impl<'de> Deserialize<'de> for EscrowMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str().map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "milestone" || s == "milestones" => EscrowMode::Milestone,
            Some(s) if s == "end" => EscrowMode::End,
            _ => EscrowMode::None,
        })
    }
}

/// Escrow settings of a task. A bare mode string is accepted as shorthand;
/// anything else that is not an object decodes as the default.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Escrow {
    pub mode: EscrowMode,
    pub paid: bool,
}

impl<'de> Deserialize<'de> for Escrow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Fields {
            #[serde(default)]
            mode: EscrowMode,
            #[serde(default, deserialize_with = "lenient::flag")]
            paid: bool,
        }

        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Object(_) => serde_json::from_value::<Fields>(value)
                .map(|f| Self {
                    mode: f.mode,
                    paid: f.paid,
                })
                .unwrap_or_default(),
            Value::String(_) => Self {
                mode: EscrowMode::deserialize(value).unwrap_or_default(),
                paid: false,
            },
            _ => Self::default(),
        })
    }
}

/// A sub-checkpoint of a long-running task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_milestone: bool,
    /// Percentage of the parent's base reward this checkpoint releases.
    #[serde(default, deserialize_with = "lenient::float")]
    pub milestone_weight: f64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub done: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub paid: bool,
    #[serde(
        default,
        deserialize_with = "lenient::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_xp: Option<i64>,
}

/// A completed (or in-progress) task as seen by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub base_xp: i64,
    #[serde(default)]
    pub xp_awards: RawAwards,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub done: bool,
    #[serde(default)]
    pub escrow: Escrow,
    #[serde(default, deserialize_with = "lenient::list")]
    pub subtasks: Vec<Subtask>,
    /// Skip the minimum-of-one floor on the global reward. Set on scaled
    /// installments, which may legitimately round to zero.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub allow_zero_base: bool,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, base_xp: i64) -> Self {
        Self {
            id: id.into(),
            base_xp,
            ..Self::default()
        }
    }

    pub fn award(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.xp_awards = self.xp_awards.with(key, amount);
        self
    }

    pub fn done(mut self) -> Self {
        self.done = true;
        self
    }

    /// Global reward after the safety floor.
    pub fn global_reward(&self) -> u64 {
        let base = self.base_xp.max(0) as u64;
        if self.allow_zero_base {
            base
        } else {
            base.max(1)
        }
    }

    pub fn milestones(&self) -> impl Iterator<Item = &Subtask> {
        self.subtasks.iter().filter(|s| s.is_milestone)
    }
}
