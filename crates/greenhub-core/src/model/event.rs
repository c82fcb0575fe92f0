//! Completion events: the things that earn points.
//!
//! Every event row carries a `points_processed` flag. The award transaction
//! flips it from 0 to 1 in the same transaction that writes the ledger, which
//! is the only guard against a second award for the same event.

use super::{ParseEnumError, PointSource, normalize};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Task categories offered by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Exercise,
    Nutrition,
    Sustainability,
}

impl TaskCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::Nutrition => "nutrition",
            Self::Sustainability => "sustainability",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "exercise" => Ok(Self::Exercise),
            "nutrition" => Ok(Self::Nutrition),
            "sustainability" => Ok(Self::Sustainability),
            _ => Err(ParseEnumError {
                expected: "category",
                got: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub task_id: String,
    pub user_id: String,
    pub title: String,
    pub category: TaskCategory,
    /// ISO-8601 calendar date.
    pub due_date: String,
    pub points_reward: u32,
    pub is_completed: bool,
    pub points_processed: bool,
    pub created_at_us: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainabilityAction {
    pub action_id: String,
    pub user_id: String,
    /// Free-form type such as `recycle` or `bike`.
    pub action_type: String,
    /// Measured quantity (kg, km, trips...).
    pub value: f64,
    pub points_earned: u32,
    pub points_processed: bool,
    pub created_at_us: i64,
}

/// An operator-granted award outside of tasks and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bonus {
    pub bonus_id: String,
    pub user_id: String,
    pub amount: u32,
    pub reason: String,
    pub points_processed: bool,
    pub created_at_us: i64,
}

/// Identifies the completion event whose processed flag guards an award.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    Task(String),
    Action(String),
    Bonus(String),
}

impl EventKey {
    /// The event of kind `source` with id `id`.
    #[must_use]
    pub const fn from_source(source: PointSource, id: String) -> Self {
        match source {
            PointSource::Task => Self::Task(id),
            PointSource::SustainabilityAction => Self::Action(id),
            PointSource::Bonus => Self::Bonus(id),
        }
    }

    /// Ledger source recorded for awards from this event.
    #[must_use]
    pub const fn source(&self) -> PointSource {
        match self {
            Self::Task(_) => PointSource::Task,
            Self::Action(_) => PointSource::SustainabilityAction,
            Self::Bonus(_) => PointSource::Bonus,
        }
    }

    /// Opaque identifier stored on the ledger entry for audit.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        match self {
            Self::Task(id) | Self::Action(id) | Self::Bonus(id) => id,
        }
    }

    /// `(table, id column)` holding this event's processed flag.
    pub(crate) const fn table(&self) -> (&'static str, &'static str) {
        match self {
            Self::Task(_) => ("tasks", "task_id"),
            Self::Action(_) => ("sustainability_actions", "action_id"),
            Self::Bonus(_) => ("bonuses", "bonus_id"),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source(), self.reference_id())
    }
}

#[cfg(test)]
mod tests {
    use super::{EventKey, TaskCategory};
    use crate::model::PointSource;
    use std::str::FromStr;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(TaskCategory::from_str(" Exercise "), Ok(TaskCategory::Exercise));
        assert_eq!(
            TaskCategory::from_str("SUSTAINABILITY"),
            Ok(TaskCategory::Sustainability)
        );
        let err = TaskCategory::from_str("yoga").expect_err("unknown category");
        assert_eq!(err.to_string(), "invalid category: 'yoga'");
    }

    #[test]
    fn event_key_maps_to_source_and_reference() {
        let key = EventKey::Action("a-1".into());
        assert_eq!(key.source(), PointSource::SustainabilityAction);
        assert_eq!(key.reference_id(), "a-1");
        assert_eq!(key.to_string(), "sustainability_action:a-1");
        assert_eq!(EventKey::Bonus("b".into()).table().0, "bonuses");
        assert_eq!(
            EventKey::from_source(PointSource::Task, "t-1".into()),
            EventKey::Task("t-1".into())
        );
    }
}
